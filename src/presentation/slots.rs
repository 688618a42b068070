//! Slot lifecycle binding.
//!
//! [`SlotTable`] records which item each slot currently shows and answers
//! the currency check. [`SlotBinder`] turns slot lifecycle events into
//! coordinator calls and forwards every delivery to the presentation
//! context through a channel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;

use crate::application::{FetchCoordinator, RequestStatus};
use crate::domain::entities::{Delivery, FetchDescriptor, ItemKey, SlotId};
use crate::domain::errors::FetchError;
use crate::domain::ports::SlotCurrency;

/// Slot -> expected item map.
#[derive(Debug, Default)]
pub struct SlotTable {
    assignments: RwLock<HashMap<SlotId, ItemKey>>,
}

impl SlotTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points `slot` at `key`, returning the previous item.
    pub fn assign(&self, slot: SlotId, key: ItemKey) -> Option<ItemKey> {
        self.assignments.write().insert(slot, key)
    }

    /// Detaches `slot` from its item.
    pub fn release(&self, slot: SlotId) -> Option<ItemKey> {
        self.assignments.write().remove(&slot)
    }

    /// Item `slot` currently expects.
    pub fn expected(&self, slot: SlotId) -> Option<ItemKey> {
        self.assignments.read().get(&slot).copied()
    }

    /// Number of slots showing an item.
    pub fn len(&self) -> usize {
        self.assignments.read().len()
    }

    /// Returns true if no slot shows an item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SlotCurrency for SlotTable {
    fn expects(&self, slot: SlotId, key: ItemKey) -> bool {
        self.expected(slot) == Some(key)
    }
}

/// What the presentation context did with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Slot still shows the item; the value should be rendered.
    Rendered,
    /// Slot moved on before the delivery arrived.
    Stale,
    /// Fetch failed for the item the slot still shows.
    Failed(FetchError),
    /// Fetch was cancelled; nothing to show.
    Cancelled,
}

/// Connects slot lifecycle events to a [`FetchCoordinator`].
pub struct SlotBinder<V> {
    coordinator: Arc<FetchCoordinator<V>>,
    slots: Arc<SlotTable>,
    event_tx: mpsc::UnboundedSender<Delivery<V>>,
}

impl<V> std::fmt::Debug for SlotBinder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotBinder")
            .field("coordinator", &self.coordinator)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl<V> SlotBinder<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a binder.
    ///
    /// `slots` must be the same table the coordinator uses for its currency
    /// check.
    #[must_use]
    pub fn new(
        coordinator: Arc<FetchCoordinator<V>>,
        slots: Arc<SlotTable>,
        event_tx: mpsc::UnboundedSender<Delivery<V>>,
    ) -> Self {
        Self {
            coordinator,
            slots,
            event_tx,
        }
    }

    /// A slot scrolled into view showing `key`.
    pub fn on_slot_became_visible(
        &self,
        slot: SlotId,
        key: ItemKey,
        descriptor: FetchDescriptor,
    ) -> RequestStatus {
        self.slots.assign(slot, key);

        let tx = self.event_tx.clone();
        self.coordinator.request(
            key,
            descriptor,
            slot,
            Box::new(move |delivery| {
                if tx.send(delivery).is_err() {
                    trace!("Presentation channel closed, dropping delivery");
                }
            }),
        )
    }

    /// A slot is about to show a different item.
    pub fn on_slot_will_be_reused(&self, slot: SlotId) {
        self.release(slot);
    }

    /// A slot left the visible area.
    pub fn on_slot_hidden(&self, slot: SlotId) {
        self.release(slot);
    }

    fn release(&self, slot: SlotId) {
        self.slots.release(slot);
        self.coordinator.cancel_for_slot(slot);
    }

    /// Decides what to do with a delivery on the presentation context.
    ///
    /// Repeats the currency check, since the slot may have been reassigned
    /// while the delivery was queued.
    #[must_use]
    pub fn apply(&self, delivery: &Delivery<V>) -> Applied {
        match &delivery.result {
            Err(FetchError::Cancelled) => Applied::Cancelled,
            _ if !self.slots.expects(delivery.slot, delivery.key) => Applied::Stale,
            Ok(_) => Applied::Rendered,
            Err(e) => Applied::Failed(e.clone()),
        }
    }

    /// Number of slots with an in-flight fetch.
    pub fn pending_count(&self) -> usize {
        self.coordinator.pending_count()
    }

    /// The coordinator driving this binder.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<FetchCoordinator<V>> {
        &self.coordinator
    }

    /// The slot table.
    #[must_use]
    pub const fn slots(&self) -> &Arc<SlotTable> {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::FetchPipeline;
    use crate::domain::ports::mocks::MockTransport;
    use crate::infrastructure::decode::RawBytesDecoder;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn binder(
        transport: MockTransport,
    ) -> (SlotBinder<Bytes>, mpsc::UnboundedReceiver<Delivery<Bytes>>) {
        let slots = Arc::new(SlotTable::new());
        let pipeline =
            FetchPipeline::new(Arc::new(transport), Arc::new(RawBytesDecoder), 4, true);
        let coordinator = Arc::new(FetchCoordinator::new(pipeline, slots.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        (SlotBinder::new(coordinator, slots, tx), rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Delivery<Bytes>>) -> Delivery<Bytes> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no delivery within timeout")
            .expect("channel closed")
    }

    #[test]
    fn test_slot_table_currency() {
        let table = SlotTable::new();
        table.assign(SlotId(1), ItemKey(10));

        assert!(table.expects(SlotId(1), ItemKey(10)));
        assert!(!table.expects(SlotId(1), ItemKey(11)));
        assert!(!table.expects(SlotId(2), ItemKey(10)));

        assert_eq!(table.assign(SlotId(1), ItemKey(11)), Some(ItemKey(10)));
        assert_eq!(table.release(SlotId(1)), Some(ItemKey(11)));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_visible_slot_renders() {
        let (binder, mut rx) =
            binder(MockTransport::new().with_response("https://example.com/1.jpg", "one"));

        binder.on_slot_became_visible(
            SlotId(0),
            ItemKey(1),
            FetchDescriptor::new("https://example.com/1.jpg"),
        );

        let delivery = next(&mut rx).await;
        assert_eq!(binder.apply(&delivery), Applied::Rendered);
    }

    #[tokio::test]
    async fn test_hidden_slot_is_cancelled() {
        let gate = Arc::new(Semaphore::new(0));
        let (binder, mut rx) = binder(
            MockTransport::new()
                .with_response("https://example.com/1.jpg", "one")
                .with_gate(gate.clone()),
        );

        binder.on_slot_became_visible(
            SlotId(0),
            ItemKey(1),
            FetchDescriptor::new("https://example.com/1.jpg"),
        );
        binder.on_slot_hidden(SlotId(0));
        gate.add_permits(1);

        let delivery = next(&mut rx).await;
        assert_eq!(binder.apply(&delivery), Applied::Cancelled);
        assert!(binder.slots().is_empty());
    }

    #[tokio::test]
    async fn test_queued_delivery_for_reassigned_slot_is_stale() {
        let (binder, mut rx) =
            binder(MockTransport::new().with_response("https://example.com/1.jpg", "one"));

        binder.on_slot_became_visible(
            SlotId(0),
            ItemKey(1),
            FetchDescriptor::new("https://example.com/1.jpg"),
        );
        let delivery = next(&mut rx).await;

        // Reassigned after the coordinator's check, before the presentation context ran.
        binder.slots().assign(SlotId(0), ItemKey(2));

        assert_eq!(binder.apply(&delivery), Applied::Stale);
    }

    #[tokio::test]
    async fn test_failure_for_current_item_is_reported() {
        let (binder, mut rx) = binder(MockTransport::new());

        binder.on_slot_became_visible(
            SlotId(0),
            ItemKey(1),
            FetchDescriptor::new("https://example.com/missing.jpg"),
        );

        let delivery = next(&mut rx).await;
        assert!(matches!(
            binder.apply(&delivery),
            Applied::Failed(FetchError::Transfer { .. })
        ));
    }

    #[tokio::test]
    async fn test_revisit_is_served_from_cache() {
        let (binder, mut rx) =
            binder(MockTransport::new().with_response("https://example.com/1.jpg", "one"));
        let descriptor = FetchDescriptor::new("https://example.com/1.jpg");

        binder.on_slot_became_visible(SlotId(0), ItemKey(1), descriptor.clone());
        let _ = next(&mut rx).await;
        binder.on_slot_will_be_reused(SlotId(0));

        let status = binder.on_slot_became_visible(SlotId(3), ItemKey(1), descriptor);

        assert_eq!(status, RequestStatus::Cached);
        assert_eq!(binder.apply(&next(&mut rx).await), Applied::Rendered);
    }
}
