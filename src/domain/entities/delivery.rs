//! Outbound result message.

use crate::domain::entities::{ItemKey, SlotId};
use crate::domain::errors::FetchError;

/// A fetch result addressed to a slot.
///
/// May arrive after the slot was reassigned; the receiver must confirm the
/// slot still expects `key` before rendering.
#[derive(Debug, Clone)]
pub struct Delivery<V> {
    /// Slot the request was made for.
    pub slot: SlotId,
    /// Item the result belongs to.
    pub key: ItemKey,
    /// Decoded value or failure.
    pub result: Result<V, FetchError>,
}

impl<V> Delivery<V> {
    /// Creates a delivery.
    #[must_use]
    pub const fn new(slot: SlotId, key: ItemKey, result: Result<V, FetchError>) -> Self {
        Self { slot, key, result }
    }

    /// Returns true if the fetch was cancelled rather than failed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.result.as_ref().is_err_and(FetchError::is_cancelled)
    }
}

/// Callback invoked at most once per request.
pub type DeliveryCallback<V> = Box<dyn FnOnce(Delivery<V>) + Send + 'static>;
