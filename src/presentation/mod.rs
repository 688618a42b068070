//! Presentation layer binding recycled slots to the fetch coordinator.

/// Scripted scrolling driver.
pub mod scroll;
/// Slot table and lifecycle binder.
pub mod slots;

pub use scroll::{ScrollReport, ScrollSimulation};
pub use slots::{Applied, SlotBinder, SlotTable};
