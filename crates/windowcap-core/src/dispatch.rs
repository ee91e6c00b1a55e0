//! The single capture context
//!
//! Many platform capture APIs must be called from one thread. The
//! [`Dispatcher`] owns that thread (named `capture-context`) and an ordered
//! queue feeding it; every capture runs there, strictly one at a time, no
//! matter how many sessions are waiting.
//!
//! Submission never blocks: [`Dispatcher::submit`] assigns a
//! [`CorrelationId`], parks a reply sender in the pending map under that id
//! and returns a [`PendingReply`] the caller awaits. The worker completes the
//! entry by id when the job finishes. A caller that goes away simply drops
//! its `PendingReply`; the eventual result is discarded.
//!
//! Enumeration and close may skip the queue when the backend certifies them
//! thread-safe (see [`BackendCapabilities`]); they then run on the tokio
//! blocking pool.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::sync::Arc;
//!
//! use windowcap_core::{
//!     CaptureEngine, Dispatcher, Invocation, ToolPayload, capture::create_mock_backend,
//! };
//!
//! let engine = Arc::new(CaptureEngine::new(create_mock_backend()));
//! let dispatcher = Dispatcher::start(engine).unwrap();
//!
//! let outcome = dispatcher.dispatch(Invocation::CountMonitors).await;
//! assert!(matches!(outcome, Ok(ToolPayload::Count(2))));
//! dispatcher.shutdown();
//! # }
//! ```

use std::{
    collections::HashMap,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Instant,
};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::{
    capture::{BackendCapabilities, constants::CAPTURE_CONTEXT_THREAD},
    engine::CaptureEngine,
    error::{CaptureError, CaptureResult},
    registry::{Invocation, Operation, ToolOutcome},
};

/// Identifies one in-flight invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Job {
    id:         CorrelationId,
    invocation: Invocation,
    queued_at:  Instant,
}

type PendingMap = Arc<Mutex<HashMap<CorrelationId, oneshot::Sender<ToolOutcome>>>>;

/// Handle to a submitted invocation.
#[derive(Debug)]
pub struct PendingReply {
    id: CorrelationId,
    rx: oneshot::Receiver<ToolOutcome>,
}

impl PendingReply {
    pub fn correlation_id(&self) -> CorrelationId {
        self.id
    }

    /// Waits for the outcome.
    ///
    /// Resolves to [`CaptureError::ContextUnavailable`] if the capture
    /// context stopped without answering.
    pub async fn wait(self) -> ToolOutcome {
        self.rx.await.unwrap_or_else(|_| {
            Err(CaptureError::ContextUnavailable {
                reason: format!("no reply for invocation {}", self.id),
            })
        })
    }
}

/// Routes invocations to the engine through the capture context.
pub struct Dispatcher {
    engine:       Arc<CaptureEngine>,
    capabilities: BackendCapabilities,
    queue:        Mutex<Option<mpsc::UnboundedSender<Job>>>,
    pending:      PendingMap,
    next_id:      AtomicU64,
    worker:       Mutex<Option<thread::JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawns the capture context thread.
    ///
    /// # Errors
    ///
    /// [`CaptureError::ContextUnavailable`] if the thread cannot be spawned.
    pub fn start(engine: Arc<CaptureEngine>) -> CaptureResult<Arc<Self>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::default();
        let capabilities = engine.backend().capabilities;

        let worker = {
            let engine = engine.clone();
            let pending = pending.clone();
            thread::Builder::new()
                .name(CAPTURE_CONTEXT_THREAD.to_string())
                .spawn(move || run_worker(engine, rx, pending))
                .map_err(|e| CaptureError::ContextUnavailable {
                    reason: format!("failed to spawn {CAPTURE_CONTEXT_THREAD}: {e}"),
                })?
        };

        tracing::info!(
            backend = engine.backend().name,
            thread_safe_enumeration = capabilities.thread_safe_enumeration,
            thread_safe_close = capabilities.thread_safe_close,
            "capture context started"
        );

        Ok(Arc::new(Self {
            engine,
            capabilities,
            queue: Mutex::new(Some(tx)),
            pending,
            next_id: AtomicU64::new(1),
            worker: Mutex::new(Some(worker)),
        }))
    }

    pub fn engine(&self) -> &Arc<CaptureEngine> {
        &self.engine
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    /// Number of queued invocations still waiting for their reply.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    /// Submits an invocation without waiting for it.
    pub fn submit(&self, invocation: Invocation) -> PendingReply {
        let id = CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        let operation = invocation.operation();

        if self.may_bypass(operation) {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                let engine = self.engine.clone();
                tracing::trace!(correlation_id = %id, %operation, "running off-queue");
                runtime.spawn_blocking(move || {
                    let _ = tx.send(execute_guarded(&engine, &invocation));
                });
                return PendingReply { id, rx };
            }
        }

        self.pending.lock().insert(id, tx);
        let job = Job {
            id,
            invocation,
            queued_at: Instant::now(),
        };
        let queued = match self.queue.lock().as_ref() {
            Some(queue) => queue.send(job).is_ok(),
            None => false,
        };

        if queued {
            tracing::debug!(event = "core.dispatch.submitted", correlation_id = %id, %operation);
        } else if let Some(tx) = self.pending.lock().remove(&id) {
            let _ = tx.send(Err(CaptureError::ContextUnavailable {
                reason: "dispatcher has shut down".to_string(),
            }));
        }

        PendingReply { id, rx }
    }

    /// Submits an invocation and waits for its outcome.
    pub async fn dispatch(&self, invocation: Invocation) -> ToolOutcome {
        self.submit(invocation).wait().await
    }

    /// Closes the queue and waits for the capture context to finish the job
    /// it is running. Queued jobs still run; later submissions fail.
    pub fn shutdown(&self) {
        drop(self.queue.lock().take());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!("capture context terminated abnormally");
            }
            tracing::info!("capture context stopped");
        }
    }

    fn may_bypass(&self, operation: Operation) -> bool {
        if operation.is_enumeration() {
            self.capabilities.thread_safe_enumeration
        } else if operation == Operation::CloseWindow {
            self.capabilities.thread_safe_close
        } else {
            false
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capabilities", &self.capabilities)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

fn run_worker(
    engine: Arc<CaptureEngine>,
    mut rx: mpsc::UnboundedReceiver<Job>,
    pending: PendingMap,
) {
    while let Some(job) = rx.blocking_recv() {
        let operation = job.invocation.operation();
        let waited = job.queued_at.elapsed();
        let started = Instant::now();

        let outcome = execute_guarded(&engine, &job.invocation);

        tracing::debug!(
            event = "core.dispatch.completed",
            correlation_id = %job.id,
            %operation,
            ok = outcome.is_ok(),
            queued_ms = waited.as_millis() as u64,
            elapsed_ms = started.elapsed().as_millis() as u64,
        );

        let reply = pending.lock().remove(&job.id);
        match reply {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    tracing::debug!(correlation_id = %job.id, "caller went away; result discarded");
                }
            }
            None => tracing::warn!(correlation_id = %job.id, "no pending reply for job"),
        }
    }

    let orphans: Vec<_> = pending.lock().drain().collect();
    for (id, tx) in orphans {
        tracing::debug!(correlation_id = %id, "failing pending reply");
        let _ = tx.send(Err(CaptureError::ContextUnavailable {
            reason: "capture context exited".to_string(),
        }));
    }
}

/// Runs one invocation, turning a backend panic into a capture failure.
fn execute_guarded(engine: &CaptureEngine, invocation: &Invocation) -> ToolOutcome {
    catch_unwind(AssertUnwindSafe(|| engine.execute(invocation))).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(operation = %invocation.operation(), %reason, "backend panicked");
        Err(CaptureError::CaptureFailed {
            target: invocation.operation().to_string(),
            reason: format!("backend panicked: {reason}"),
        })
    })
}
