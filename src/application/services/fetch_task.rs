//! A single cancellable retrieval + decode.
//!
//! State lives in one atomic so that cancellation and natural completion
//! race through compare-and-set: whichever transition lands first wins, and
//! a task that reached `Cancelled` never reports a result.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::domain::entities::{FetchDescriptor, FetchState, ItemKey, TaskId, TransferRequest};
use crate::domain::errors::{FetchError, TransferErrorKind};
use crate::domain::ports::{Decoder, Transport};
use crate::infrastructure::config::FetchConfig;

/// How a task ended.
#[derive(Debug)]
pub enum TaskOutcome<V> {
    /// Payload fetched and decoded.
    Completed(V),
    /// Request, transfer or decode failed.
    Failed(FetchError),
    /// Cancelled; no result is delivered.
    Cancelled,
}

/// Transport, decoder and throttle shared by every task.
pub struct FetchPipeline<V> {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn Decoder<V>>,
    permits: Arc<Semaphore>,
    force_https: bool,
}

impl<V> std::fmt::Debug for FetchPipeline<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("available_permits", &self.permits.available_permits())
            .field("force_https", &self.force_https)
            .finish_non_exhaustive()
    }
}

impl<V: Send + 'static> FetchPipeline<V> {
    /// Creates a pipeline allowing `max_concurrent_transfers` transfers at once.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn Decoder<V>>,
        max_concurrent_transfers: usize,
        force_https: bool,
    ) -> Self {
        Self {
            transport,
            decoder,
            permits: Arc::new(Semaphore::new(max_concurrent_transfers.max(1))),
            force_https,
        }
    }

    /// Creates a pipeline from fetch settings.
    #[must_use]
    pub fn from_config(
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn Decoder<V>>,
        config: &FetchConfig,
    ) -> Self {
        Self::new(
            transport,
            decoder,
            config.max_concurrent_transfers,
            config.force_https,
        )
    }

    /// Transfers and decodes one payload.
    async fn run(&self, request: TransferRequest) -> Result<V, FetchError> {
        let permit = self.permits.acquire().await.map_err(|e| {
            FetchError::transfer(TransferErrorKind::Connect, format!("Pipeline closed: {e}"))
        })?;
        let payload = self.transport.transfer(request).await?;
        drop(permit);

        let decoder = Arc::clone(&self.decoder);
        tokio::task::spawn_blocking(move || decoder.decode(&payload))
            .await
            .map_err(|e| FetchError::decode(format!("Decode task panicked: {e}")))?
    }
}

/// One in-flight retrieval for one item.
#[derive(Debug)]
pub struct FetchTask {
    id: TaskId,
    key: ItemKey,
    descriptor: FetchDescriptor,
    state: AtomicU8,
    started: AtomicBool,
    cancel_token: CancellationToken,
}

impl FetchTask {
    /// Creates a pending task.
    #[must_use]
    pub fn new(key: ItemKey, descriptor: FetchDescriptor) -> Self {
        Self {
            id: TaskId::new(),
            key,
            descriptor,
            state: AtomicU8::new(FetchState::Pending.as_u8()),
            started: AtomicBool::new(false),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Task identity.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Item being fetched.
    #[must_use]
    pub const fn key(&self) -> ItemKey {
        self.key
    }

    /// Where the payload is fetched from.
    #[must_use]
    pub const fn descriptor(&self) -> &FetchDescriptor {
        &self.descriptor
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FetchState {
        FetchState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: FetchState, to: FetchState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Starts the transfer on the Tokio runtime.
    ///
    /// `on_terminal` runs exactly once for the first call: synchronously if
    /// the descriptor is invalid or the task was already cancelled, otherwise
    /// from the spawned transfer. Later calls do nothing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<V, F>(self: &Arc<Self>, pipeline: &Arc<FetchPipeline<V>>, on_terminal: F)
    where
        V: Send + 'static,
        F: FnOnce(TaskOutcome<V>) + Send + 'static,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!(task = %self.id, key = %self.key, "Fetch task started twice");
            return;
        }

        let request = match self.descriptor.to_request(pipeline.force_https) {
            Ok(request) => request,
            Err(e) => {
                if self.transition(FetchState::Pending, FetchState::Failed) {
                    warn!(task = %self.id, key = %self.key, error = %e, "Fetch never started");
                    on_terminal(TaskOutcome::Failed(e));
                } else {
                    on_terminal(TaskOutcome::Cancelled);
                }
                return;
            }
        };

        if !self.transition(FetchState::Pending, FetchState::Running) {
            trace!(task = %self.id, key = %self.key, "Task cancelled before start");
            on_terminal(TaskOutcome::Cancelled);
            return;
        }

        debug!(task = %self.id, key = %self.key, url = %request.url, "Starting fetch");

        let task = Arc::clone(self);
        let pipeline = Arc::clone(pipeline);
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = task.cancel_token.cancelled() => None,
                result = pipeline.run(request) => Some(result),
            };
            let outcome = task.settle(result);
            on_terminal(outcome);
        });
    }

    fn settle<V>(&self, result: Option<Result<V, FetchError>>) -> TaskOutcome<V> {
        match result {
            Some(Ok(value)) if self.transition(FetchState::Running, FetchState::Completed) => {
                debug!(task = %self.id, key = %self.key, "Fetch completed");
                TaskOutcome::Completed(value)
            }
            Some(Err(e)) if self.transition(FetchState::Running, FetchState::Failed) => {
                warn!(task = %self.id, key = %self.key, error = %e, "Fetch failed");
                TaskOutcome::Failed(e)
            }
            _ => {
                trace!(task = %self.id, key = %self.key, "Fetch result discarded after cancel");
                TaskOutcome::Cancelled
            }
        }
    }

    /// Cancels the task if it has not reached a terminal state.
    ///
    /// Returns true if this call performed the cancellation. The transfer is
    /// aborted asynchronously; no result is delivered afterwards.
    pub fn cancel(&self) -> bool {
        let previous = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                FetchState::from_u8(raw)
                    .is_active()
                    .then_some(FetchState::Cancelled.as_u8())
            });

        match previous {
            Ok(raw) => {
                self.cancel_token.cancel();
                debug!(
                    task = %self.id,
                    key = %self.key,
                    from = %FetchState::from_u8(raw),
                    "Cancelled fetch task"
                );
                true
            }
            Err(_) => false,
        }
    }
}
