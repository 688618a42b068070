//! Slotfetch - concurrent fetch, decode and cache for recycled display slots.
//!
//! Items are fetched on background tasks, decoded off the async runtime and
//! memoized by key. Each slot has at most one active fetch; reusing a slot
//! cancels its previous fetch, and a result is only delivered to a slot that
//! still shows the item it was fetched for.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the fetch task, registry and coordinator.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer binding slots to the coordinator.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "slotfetch";
