//! Single-resolution result future returned by the engine.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::error::{MalibuError, Result};
use crate::response::Wave;
use crate::validation::{StatusCodeValidator, Validating};

#[derive(Debug, Default)]
enum TaskState {
    #[default]
    Idle,
    Running(AbortHandle),
    Cancelled,
    Done,
}

/// Cancellation state shared by every ride of one execution.
#[derive(Debug, Clone, Default)]
pub struct TaskSlot(Arc<Mutex<TaskState>>);

impl TaskSlot {
    /// Attach a running transport task. A slot that was already cancelled
    /// aborts the task immediately; a resolved one ignores it.
    pub(crate) fn attach(&self, handle: AbortHandle) {
        let mut state = self.0.lock();
        match *state {
            TaskState::Idle => *state = TaskState::Running(handle),
            TaskState::Cancelled => handle.abort(),
            TaskState::Running(_) | TaskState::Done => {}
        }
    }

    fn cancel(&self) {
        let mut state = self.0.lock();
        match std::mem::take(&mut *state) {
            TaskState::Running(handle) => {
                handle.abort();
                *state = TaskState::Cancelled;
            }
            TaskState::Idle | TaskState::Cancelled => *state = TaskState::Cancelled,
            TaskState::Done => *state = TaskState::Done,
        }
    }

    fn is_cancelled(&self) -> bool {
        matches!(*self.0.lock(), TaskState::Cancelled)
    }
}

/// Pending result of [`Networking::execute`](crate::Networking::execute).
///
/// Resolves exactly once with a [`Wave`] or a [`MalibuError`]. Awaiting a
/// ride that was cancelled yields [`MalibuError::Cancelled`].
///
/// ```no_run
/// # async fn run(networking: malibu::Networking) -> malibu::Result<()> {
/// let items = networking
///     .execute(malibu::Request::get("/items"))
///     .validate_status()
///     .await?;
/// println!("{}", items.to_text()?);
/// # Ok(())
/// # }
/// ```
#[must_use = "rides do nothing observable unless awaited or cancelled"]
pub struct Ride {
    receiver: oneshot::Receiver<Result<Wave>>,
    task: TaskSlot,
}

impl fmt::Debug for Ride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ride").field("task", &self.task).finish_non_exhaustive()
    }
}

impl Ride {
    pub(crate) fn channel() -> (RideSender, Ride) {
        Self::channel_in(TaskSlot::default())
    }

    /// Channel sharing `task` with an existing ride.
    pub(crate) fn channel_in(task: TaskSlot) -> (RideSender, Ride) {
        let (sender, receiver) = oneshot::channel();
        (
            RideSender {
                sender,
                task: task.clone(),
            },
            Ride { receiver, task },
        )
    }

    /// Ride already failed with `error`.
    pub fn rejected(error: MalibuError) -> Ride {
        let (sender, ride) = Self::channel();
        sender.reject(error);
        ride
    }

    pub(crate) fn task(&self) -> &TaskSlot {
        &self.task
    }

    /// Cancel the attached transport task, if any. Has no effect once the
    /// ride has resolved.
    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// Whether the ride was cancelled before resolving.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    // --- adaptors ---

    /// Await the wave and run `validator` on it.
    ///
    /// # Errors
    /// The ride's own error, or the validator's.
    pub async fn validate<V: Validating>(self, validator: &V) -> Result<Wave> {
        let wave = self.await?;
        validator.validate(&wave)?;
        Ok(wave)
    }

    /// Await the wave and require a `2xx` status.
    ///
    /// # Errors
    /// The ride's own error or `MalibuError::UnacceptableStatusCode`.
    pub async fn validate_status(self) -> Result<Wave> {
        self.validate(&StatusCodeValidator::success()).await
    }

    /// Await the wave and parse its body as JSON.
    ///
    /// # Errors
    /// The ride's own error or the errors of [`Wave::to_json`].
    pub async fn json(self) -> Result<Value> {
        self.await?.to_json()
    }
}

impl Future for Ride {
    type Output = Result<Wave>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(MalibuError::Cancelled)))
    }
}

/// Resolving side of a [`Ride`]; consumed by the first resolution.
pub struct RideSender {
    sender: oneshot::Sender<Result<Wave>>,
    task: TaskSlot,
}

impl fmt::Debug for RideSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RideSender").field("task", &self.task).finish_non_exhaustive()
    }
}

impl RideSender {
    pub(crate) fn task(&self) -> &TaskSlot {
        &self.task
    }

    pub(crate) fn resolve(self, wave: Wave) {
        self.finish(Ok(wave));
    }

    pub(crate) fn reject(self, error: MalibuError) {
        self.finish(Err(error));
    }

    fn finish(self, result: Result<Wave>) {
        let mut state = self.task.0.lock();
        if matches!(*state, TaskState::Cancelled) {
            return;
        }
        *state = TaskState::Done;
        if self.sender.send(result).is_err() {
            tracing::trace!("Ride dropped before resolution");
        }
    }
}
