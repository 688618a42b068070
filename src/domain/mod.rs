//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{Delivery, DeliveryCallback, FetchDescriptor, FetchState, ItemKey, SlotId};
pub use errors::{FetchError, FetchResult, TransferErrorKind};
pub use ports::{Decoder, SlotCurrency, Transport};
