//! A single long-lived OS thread that owns all calls into a platform library.
//!
//! Work is shipped to the thread as boxed closures and the caller waits for
//! the answer with a bound. When the bound is exceeded the caller gets
//! [`CaptureError::CaptureTimeout`]; the closure keeps running and its late
//! result is dropped. Later calls queue behind it and time out in turn until
//! the platform recovers.

use std::{
    panic::AssertUnwindSafe,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use crate::error::{CaptureError, CaptureResult};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug)]
pub struct PlatformThread {
    tasks:   mpsc::Sender<Task>,
    timeout: Duration,
    name:    &'static str,
}

impl PlatformThread {
    /// Spawns the thread.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::ContextUnavailable`] if the OS refuses to
    /// create the thread.
    pub fn spawn(name: &'static str, timeout: Duration) -> CaptureResult<Self> {
        let (tasks, inbox) = mpsc::channel::<Task>();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(task) = inbox.recv() {
                    if std::panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        tracing::error!(thread = name, "platform call panicked");
                    }
                }
                tracing::debug!(thread = name, "platform thread exiting");
            })
            .map_err(|e| CaptureError::ContextUnavailable {
                reason: format!("failed to spawn {name} thread: {e}"),
            })?;

        Ok(Self {
            tasks,
            timeout,
            name,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `f` on the platform thread and waits at most the configured
    /// timeout for its result.
    pub fn run<T, F>(&self, what: &str, f: F) -> CaptureResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> CaptureResult<T> + Send + 'static,
    {
        let (reply, answer) = mpsc::sync_channel(1);
        let task: Task = Box::new(move || {
            // Receiver is gone when the caller already timed out.
            let _ = reply.send(f());
        });

        self.tasks
            .send(task)
            .map_err(|_| CaptureError::ContextUnavailable {
                reason: format!("{} thread has stopped", self.name),
            })?;

        match answer.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                let duration_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(operation = what, duration_ms, "platform call timed out");
                Err(CaptureError::CaptureTimeout { duration_ms })
            }
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::CaptureFailed {
                target: what.to_string(),
                reason: "platform call panicked".to_string(),
            }),
        }
    }
}
