//! Domain entities.

mod delivery;
mod descriptor;
mod fetch_state;
mod ids;

pub use delivery::{Delivery, DeliveryCallback};
pub use descriptor::{FetchDescriptor, TransferRequest};
pub use fetch_state::FetchState;
pub use ids::{ItemKey, SlotId, TaskId};
