use super::TaskCompletion;
use crate::mock::Mock;

/// Replays a [`Mock`] synchronously; no transport task is attached, so
/// cancelling the ride has no effect.
pub struct MockDataTask {
    mock: Mock,
}

impl MockDataTask {
    pub(crate) fn new(mock: Mock) -> Self {
        Self { mock }
    }

    pub(crate) fn run(self, completion: TaskCompletion) {
        tracing::debug!(key = %self.mock.key(), "Replaying mock");
        let Mock {
            response,
            data,
            error,
            ..
        } = self.mock;
        completion.process(data, response, error);
    }
}
