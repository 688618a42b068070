//! Port for the slot-currency check.

use crate::domain::entities::{ItemKey, SlotId};

/// Answers whether a slot still displays a given item.
///
/// Consulted right before a successful result is delivered, so it must be
/// cheap and non-blocking.
#[cfg_attr(test, mockall::automock)]
pub trait SlotCurrency: Send + Sync {
    /// Returns true if `slot` currently expects `key`.
    fn expects(&self, slot: SlotId, key: ItemKey) -> bool;
}
