//! Scripted scrolling over a grid of recycled slots.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::RequestStatus;
use crate::domain::entities::{Delivery, SlotId};
use crate::infrastructure::manifest::PhotoReference;

use super::slots::{Applied, SlotBinder};

/// Tally of what happened to deliveries on the presentation context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollReport {
    /// Requests answered from cache.
    pub cache_hits: usize,
    /// Requests that started a fetch.
    pub fetches: usize,
    /// Deliveries rendered into their slot.
    pub rendered: usize,
    /// Deliveries dropped because the slot moved on.
    pub stale: usize,
    /// Failed fetches for items still on screen.
    pub failed: usize,
    /// Cancelled fetches.
    pub cancelled: usize,
}

impl ScrollReport {
    fn record(&mut self, applied: &Applied) {
        match applied {
            Applied::Rendered => self.rendered += 1,
            Applied::Stale => self.stale += 1,
            Applied::Failed(_) => self.failed += 1,
            Applied::Cancelled => self.cancelled += 1,
        }
    }
}

impl std::fmt::Display for ScrollReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} fetches, {} cache hits; rendered {}, failed {}, cancelled {}, stale {}",
            self.fetches, self.cache_hits, self.rendered, self.failed, self.cancelled, self.stale
        )
    }
}

/// Drives a [`SlotBinder`] through a sequence of pages.
///
/// Page `p` shows items `p * slot_count ..` in slots `0..slot_count`; slots
/// past the end of the manifest are hidden.
pub struct ScrollSimulation<V> {
    binder: SlotBinder<V>,
    events: mpsc::UnboundedReceiver<Delivery<V>>,
    slot_count: usize,
    scroll_delay: Duration,
    report: ScrollReport,
}

impl<V> std::fmt::Debug for ScrollSimulation<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollSimulation")
            .field("slot_count", &self.slot_count)
            .field("scroll_delay", &self.scroll_delay)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl<V> ScrollSimulation<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a simulation reading deliveries from `events`.
    #[must_use]
    pub fn new(
        binder: SlotBinder<V>,
        events: mpsc::UnboundedReceiver<Delivery<V>>,
        slot_count: usize,
        scroll_delay: Duration,
    ) -> Self {
        Self {
            binder,
            events,
            slot_count: slot_count.max(1),
            scroll_delay,
            report: ScrollReport::default(),
        }
    }

    /// Shows each page in turn, then waits up to `settle_timeout` for
    /// in-flight fetches.
    pub async fn run(
        mut self,
        photos: &[PhotoReference],
        pages: &[usize],
        settle_timeout: Duration,
    ) -> ScrollReport {
        for &page in pages {
            info!(page, "Scrolling to page");
            self.show_page(photos, page);
            self.drain_for(self.scroll_delay).await;
        }
        self.settle(settle_timeout).await;
        self.report
    }

    fn show_page(&mut self, photos: &[PhotoReference], page: usize) {
        let first = page.saturating_mul(self.slot_count);

        for (index, slot) in (0..self.slot_count).zip((0u64..).map(SlotId)) {
            match photos.get(first.saturating_add(index)) {
                Some(photo) => {
                    self.binder.on_slot_will_be_reused(slot);
                    match self
                        .binder
                        .on_slot_became_visible(slot, photo.key(), photo.descriptor())
                    {
                        RequestStatus::Cached => self.report.cache_hits += 1,
                        RequestStatus::Fetching(_) => self.report.fetches += 1,
                    }
                }
                None => self.binder.on_slot_hidden(slot),
            }
        }
    }

    fn apply(&mut self, delivery: &Delivery<V>) {
        let applied = self.binder.apply(delivery);
        match &applied {
            Applied::Failed(e) => {
                warn!(slot = %delivery.slot, key = %delivery.key, error = %e, "Failed to load item");
            }
            other => debug!(slot = %delivery.slot, key = %delivery.key, outcome = ?other, "Delivery applied"),
        }
        self.report.record(&applied);
    }

    async fn drain_for(&mut self, duration: Duration) {
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);

        loop {
            let delivery = tokio::select! {
                () = &mut deadline => break,
                Some(delivery) = self.events.recv() => delivery,
            };
            self.apply(&delivery);
        }
    }

    async fn settle(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;

        loop {
            while let Ok(delivery) = self.events.try_recv() {
                self.apply(&delivery);
            }
            if self.binder.pending_count() == 0 {
                // Deliveries are sent before the registry entry is released.
                while let Ok(delivery) = self.events.try_recv() {
                    self.apply(&delivery);
                }
                return;
            }
            if Instant::now() >= deadline {
                warn!(
                    pending = self.binder.pending_count(),
                    "Gave up waiting for in-flight fetches"
                );
                self.binder.coordinator().cancel_all();
                return;
            }
            if let Ok(Some(delivery)) =
                tokio::time::timeout(Duration::from_millis(50), self.events.recv()).await
            {
                self.apply(&delivery);
            }
        }
    }
}
