//! Execution strategies.
//!
//! Every strategy ends in [`TaskCompletion::process`], which decides what
//! counts as a usable HTTP result for live, mocked and background runs alike.

mod mock;
mod session;

use bytes::Bytes;
use tokio::task::AbortHandle;

use crate::error::MalibuError;
use crate::mock::Mock;
use crate::request::TransportRequest;
use crate::response::{HttpResponse, Wave};
use crate::ride::RideSender;

pub(crate) use mock::MockDataTask;
pub(crate) use session::SessionDataTask;

/// Completion handle given to a strategy; resolves its ride once.
#[derive(Debug)]
pub struct TaskCompletion {
    request: TransportRequest,
    sender: RideSender,
}

impl TaskCompletion {
    pub(crate) fn new(request: TransportRequest, sender: RideSender) -> Self {
        Self { request, sender }
    }

    /// The request the strategy should send.
    #[must_use]
    pub fn request(&self) -> &TransportRequest {
        &self.request
    }

    /// Attach the task doing the transfer so that cancelling the ride
    /// aborts it.
    pub fn attach(&self, handle: AbortHandle) {
        self.sender.task().attach(handle);
    }

    /// Resolve the ride from the raw transfer outcome.
    ///
    /// An error wins; otherwise a missing response resolves with
    /// `MalibuError::NoResponseReceived` and missing data with
    /// `MalibuError::NoDataInResponse`.
    pub fn process(
        self,
        data: Option<Bytes>,
        response: Option<HttpResponse>,
        error: Option<MalibuError>,
    ) {
        if let Some(error) = error {
            self.sender.reject(error);
            return;
        }
        let Some(response) = response else {
            self.sender.reject(MalibuError::NoResponseReceived);
            return;
        };
        let Some(data) = data else {
            self.sender.reject(MalibuError::NoDataInResponse);
            return;
        };
        self.sender.resolve(Wave::new(data, self.request, response));
    }
}

/// Caller-supplied strategy used in `Background` mode.
///
/// Implementations must eventually call [`TaskCompletion::process`] (or drop
/// the completion, which resolves the ride as cancelled). Closures taking
/// `(&reqwest::Client, TaskCompletion)` implement this trait.
pub trait BackgroundTask: Send {
    fn run(self: Box<Self>, session: &reqwest::Client, completion: TaskCompletion);
}

impl<F> BackgroundTask for F
where
    F: FnOnce(&reqwest::Client, TaskCompletion) + Send,
{
    fn run(self: Box<Self>, session: &reqwest::Client, completion: TaskCompletion) {
        (*self)(session, completion);
    }
}

/// Strategy selected for one execution.
pub enum Task {
    Session,
    Mock(Mock),
    Background(Box<dyn BackgroundTask>),
}

impl Task {
    pub(crate) fn run(self, session: &reqwest::Client, completion: TaskCompletion) {
        match self {
            Task::Session => SessionDataTask::new(session.clone()).run(completion),
            Task::Mock(mock) => MockDataTask::new(mock).run(completion),
            Task::Background(task) => task.run(session, completion),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Task::Session => "session",
            Task::Mock(_) => "mock",
            Task::Background(_) => "background",
        }
    }
}
