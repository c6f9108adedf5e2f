use super::TaskCompletion;
use crate::error::MalibuError;
use crate::response::HttpResponse;

/// Live transfer through the engine's `reqwest` client.
pub struct SessionDataTask {
    session: reqwest::Client,
}

impl SessionDataTask {
    pub(crate) fn new(session: reqwest::Client) -> Self {
        Self { session }
    }

    /// Spawn the transfer on the current tokio runtime and attach it to the
    /// ride.
    pub(crate) fn run(self, completion: TaskCompletion) {
        let request = match completion.request().to_reqwest(&self.session) {
            Ok(request) => request,
            Err(e) => {
                completion.process(None, None, Some(e.into()));
                return;
            }
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            completion.process(
                None,
                None,
                Some(MalibuError::Configuration(
                    "live requests require a tokio runtime".to_owned(),
                )),
            );
            return;
        };

        let session = self.session;
        let slot = completion.sender.task().clone();
        let handle = runtime.spawn(async move {
            tracing::debug!(method = %request.method(), url = %request.url(), "Sending request");
            match session.execute(request).await {
                Ok(response) => {
                    let metadata = HttpResponse::from_reqwest(&response);
                    match response.bytes().await {
                        Ok(data) => completion.process(Some(data), Some(metadata), None),
                        Err(e) => completion.process(None, Some(metadata), Some(e.into())),
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Transport error");
                    completion.process(None, None, Some(e.into()));
                }
            }
        });
        slot.attach(handle.abort_handle());
    }
}
