//! The execution engine.
//!
//! [`Networking::execute`] turns a [`Request`] into a transport request,
//! picks a strategy from the current [`Mode`] and returns a [`Ride`]. Every
//! strategy's raw outcome passes through a tap that persists the response
//! `ETag` and runs the logging hooks before the caller's ride resolves.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::{NetworkingConfig, SessionConfiguration};
use crate::encoding::{ParameterEncoders, ParameterEncoding};
use crate::error::{MalibuError, Result};
use crate::header;
use crate::logging::Logger;
use crate::mock::{Mock, MockRegistry};
use crate::request::{ContentType, Headers, Request, TransportRequest};
use crate::ride::{Ride, RideSender};
use crate::storage::{ETagStore, FileStorage, KeyValueStore, MemoryStorage};
use crate::task::{BackgroundTask, Task, TaskCompletion};

const AUTHORIZATION: &str = "Authorization";
const ACCEPT_LANGUAGE: &str = "Accept-Language";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Execution strategy selector, read on every dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Live requests.
    #[default]
    Regular,
    /// Caller-supplied strategy passed to
    /// [`Networking::execute_with_background`].
    Background,
    /// Registered mocks where available, live requests otherwise.
    Partial,
    /// Registered mocks only; requests without one fail with
    /// `MalibuError::NoMockProvided`.
    Fake,
}

/// Replaces a descriptor before it is built. Also applied to the descriptor
/// of a mock picked for replay.
pub type BeforeEach = Arc<dyn Fn(Request) -> Request + Send + Sync>;

/// Adjusts the headers of a built transport request before it is sent.
pub type PreProcessRequest = Arc<dyn Fn(&mut TransportRequest) + Send + Sync>;

/// Supplies extra headers for every request; they override engine headers.
pub type AdditionalHeaders = Arc<dyn Fn() -> Headers + Send + Sync>;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// HTTP execution engine; build one with [`Networking::builder`].
pub struct Networking {
    base_url: String,
    session: reqwest::Client,
    custom_headers: RwLock<Headers>,
    accept_language: String,
    mocks: MockRegistry,
    etags: ETagStore,
    mode: RwLock<Mode>,
    encoders: ParameterEncoders,
    logger: Logger,
    before_each: Option<BeforeEach>,
    pre_process: Option<PreProcessRequest>,
    additional_headers: Option<AdditionalHeaders>,
}

impl fmt::Debug for Networking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Networking")
            .field("base_url", &self.base_url)
            .field("mode", &self.mode())
            .field("mocks", &self.mocks.len())
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

impl Networking {
    /// Start configuring an engine.
    #[must_use]
    pub fn builder() -> NetworkingBuilder {
        NetworkingBuilder::default()
    }

    /// Engine for `config`, with a file-backed `ETag` store in
    /// `config.storage_dir` or the platform data directory.
    ///
    /// A storage directory that cannot be opened falls back to memory.
    ///
    /// # Errors
    /// Returns `MalibuError::Transport` if the HTTP client cannot be built.
    pub fn from_config(config: NetworkingConfig) -> Result<Self> {
        let timeout = config.timeout();
        let storage = open_storage(config.storage_dir);
        let mut builder = Networking::builder()
            .session(config.session.into())
            .timeout(timeout)
            .mode(config.mode)
            .logger(Logger::new(config.log_level))
            .etag_storage(storage);
        if let Some(base_url) = config.base_url {
            builder = builder.base_url(base_url);
        }
        builder.build()
    }

    // --- state ---

    /// Prefix prepended to every request resource.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// HTTP client used by live requests.
    #[must_use]
    pub fn session(&self) -> &reqwest::Client {
        &self.session
    }

    /// Current execution mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        *self.mode.read()
    }

    /// Switch the execution mode; applies to the next dispatch.
    pub fn set_mode(&self, mode: Mode) {
        *self.mode.write() = mode;
    }

    /// `ETag` store consulted before and updated after each request.
    #[must_use]
    pub fn etag_store(&self) -> &ETagStore {
        &self.etags
    }

    /// Registered mocks.
    #[must_use]
    pub fn mocks(&self) -> &MockRegistry {
        &self.mocks
    }

    /// Logging hooks of this engine.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Register `mock`, replacing any mock for the same key.
    pub fn register_mock(&self, mock: Mock) {
        self.mocks.register(mock);
    }

    // --- authentication ---

    /// Send `Basic` credentials with every request.
    pub fn authenticate_basic(&self, username: &str, password: &str) {
        self.set_custom_header(AUTHORIZATION, header::basic_authentication(username, password));
    }

    /// Send a `Bearer` token with every request.
    pub fn authenticate_bearer(&self, token: &str) {
        self.set_custom_header(AUTHORIZATION, header::bearer_authentication(token));
    }

    /// Use `value` verbatim as the `Authorization` header.
    pub fn authenticate_header(&self, value: impl Into<String>) {
        self.set_custom_header(AUTHORIZATION, value.into());
    }

    /// Send `name: value` with every request.
    pub fn set_custom_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.custom_headers.write().insert(name.into(), value.into());
    }

    /// Headers added to every request: custom headers, `Accept-Language`,
    /// then the additional-headers hook. Later entries win.
    #[must_use]
    pub fn request_headers(&self) -> Headers {
        let mut headers = self.custom_headers.read().clone();
        if !self.accept_language.is_empty() {
            headers.insert(ACCEPT_LANGUAGE.to_owned(), self.accept_language.clone());
        }
        if let Some(hook) = &self.additional_headers {
            headers.extend(hook());
        }
        headers
    }

    // --- execution ---

    /// Execute `request` with the strategy selected by the current mode.
    ///
    /// In [`Mode::Background`] this fails with
    /// `MalibuError::InvalidParameter`; use
    /// [`execute_with_background`](Self::execute_with_background) instead.
    pub fn execute(&self, request: Request) -> Ride {
        self.dispatch(request, None)
    }

    /// Like [`execute`](Self::execute), running `task` when the mode is
    /// [`Mode::Background`].
    pub fn execute_with_background<T>(&self, request: Request, task: T) -> Ride
    where
        T: BackgroundTask + 'static,
    {
        self.dispatch(request, Some(Box::new(task)))
    }

    fn dispatch(&self, request: Request, background: Option<Box<dyn BackgroundTask>>) -> Ride {
        let mock_key = request.key();
        let request = self.prepare(request);
        let mut transport = match request.to_transport_request(
            &self.base_url,
            &self.request_headers(),
            &self.encoders,
            &self.etags,
        ) {
            Ok(transport) => transport,
            Err(e) => return Ride::rejected(e),
        };

        if let Some(hook) = &self.pre_process {
            hook(&mut transport);
        }

        let mode = self.mode();
        let task = match self.select_task(mode, &mock_key, background) {
            Ok(task) => task,
            Err(e) => return Ride::rejected(e),
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return Ride::rejected(MalibuError::Configuration(
                "execution requires a tokio runtime".to_owned(),
            ));
        };

        tracing::debug!(
            mode = ?mode,
            strategy = task.name(),
            key = %request.key(),
            "Dispatching request"
        );

        let (sender, inner) = Ride::channel();
        let (outer_sender, outer) = Ride::channel_in(inner.task().clone());
        let tap = Tap {
            etag_key: request.etag_key(&self.base_url),
            request,
            etags: self.etags.clone(),
            logger: self.logger.clone(),
        };
        runtime.spawn(tap.run(inner, outer_sender));

        task.run(&self.session, TaskCompletion::new(transport, sender));
        outer
    }

    fn prepare(&self, request: Request) -> Request {
        if let Some(hook) = &self.before_each {
            hook(request)
        } else {
            request
        }
    }

    fn select_task(
        &self,
        mode: Mode,
        mock_key: &str,
        background: Option<Box<dyn BackgroundTask>>,
    ) -> Result<Task> {
        match mode {
            Mode::Regular => Ok(Task::Session),
            Mode::Background => background.map(Task::Background).ok_or_else(|| {
                MalibuError::InvalidParameter("background mode requires a background task".to_owned())
            }),
            Mode::Partial => Ok(self.prepare_mock(mock_key).map_or(Task::Session, Task::Mock)),
            Mode::Fake => self
                .prepare_mock(mock_key)
                .map(Task::Mock)
                .ok_or(MalibuError::NoMockProvided),
        }
    }

    /// Mock registered for the caller's descriptor, with `before_each`
    /// applied to its own descriptor.
    fn prepare_mock(&self, mock_key: &str) -> Option<Mock> {
        let mut mock = self.mocks.get(mock_key)?;
        mock.request = self.prepare(mock.request);
        Some(mock)
    }
}

/// Persists the `ETag` and logs, then forwards the outcome to the caller's
/// ride.
struct Tap {
    request: Request,
    etag_key: String,
    etags: ETagStore,
    logger: Logger,
}

impl Tap {
    async fn run(self, inner: Ride, outer: RideSender) {
        match inner.await {
            Ok(wave) => {
                if let Some(etag) = wave.response().etag() {
                    self.etags.add(etag, &self.etag_key);
                }
                self.logger
                    .log_success(&self.request, wave.request(), wave.response());
                outer.resolve(wave);
            }
            Err(MalibuError::Cancelled) => {
                tracing::debug!(key = %self.request.key(), "Ride cancelled");
            }
            Err(e) => {
                self.logger.log_error(&e);
                outer.reject(e);
            }
        }
    }
}

fn open_storage(dir: Option<PathBuf>) -> Arc<dyn KeyValueStore> {
    let Some(dir) = dir.or_else(|| dirs::data_dir().map(|data| data.join("malibu"))) else {
        return Arc::new(MemoryStorage::new());
    };
    match FileStorage::open(&dir) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "ETag storage unavailable, using memory");
            Arc::new(MemoryStorage::new())
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`Networking`].
pub struct NetworkingBuilder {
    base_url: String,
    session: SessionConfiguration,
    timeout: Duration,
    mode: Mode,
    languages: Option<Vec<String>>,
    encoders: ParameterEncoders,
    storage: Option<Arc<dyn KeyValueStore>>,
    logger: Logger,
    before_each: Option<BeforeEach>,
    pre_process: Option<PreProcessRequest>,
    additional_headers: Option<AdditionalHeaders>,
}

impl Default for NetworkingBuilder {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            session: SessionConfiguration::default(),
            timeout: DEFAULT_TIMEOUT,
            mode: Mode::default(),
            languages: None,
            encoders: ParameterEncoders::new(),
            storage: None,
            logger: Logger::default(),
            before_each: None,
            pre_process: None,
            additional_headers: None,
        }
    }
}

impl NetworkingBuilder {
    /// Prefix prepended to every request resource.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// How the HTTP client is built; `Default` when not set.
    #[must_use]
    pub fn session(mut self, session: SessionConfiguration) -> Self {
        self.session = session;
        self
    }

    /// Request timeout for `Default` and `Ephemeral` sessions.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Initial execution mode; `Regular` when not set.
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Languages for `Accept-Language`; taken from the environment when not
    /// set. An empty list omits the header.
    #[must_use]
    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    /// Override the body encoder of `content_type`.
    #[must_use]
    pub fn encoder(mut self, content_type: ContentType, encoder: Arc<dyn ParameterEncoding>) -> Self {
        self.encoders.register(content_type, encoder);
        self
    }

    /// Backing store of the `ETag` store; in memory when not set.
    #[must_use]
    pub fn etag_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Logging hooks; silent when not set.
    #[must_use]
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Transform every descriptor before it is built.
    #[must_use]
    pub fn before_each(mut self, hook: impl Fn(Request) -> Request + Send + Sync + 'static) -> Self {
        self.before_each = Some(Arc::new(hook));
        self
    }

    /// Mutate every built transport request before it is sent.
    #[must_use]
    pub fn pre_process_request(
        mut self,
        hook: impl Fn(&mut TransportRequest) + Send + Sync + 'static,
    ) -> Self {
        self.pre_process = Some(Arc::new(hook));
        self
    }

    /// Supply extra headers for every request.
    #[must_use]
    pub fn additional_headers(mut self, hook: impl Fn() -> Headers + Send + Sync + 'static) -> Self {
        self.additional_headers = Some(Arc::new(hook));
        self
    }

    /// # Errors
    /// Returns `MalibuError::Transport` if the HTTP client cannot be built.
    pub fn build(self) -> Result<Networking> {
        let session = self.session.build_client(self.timeout)?;
        let languages = self.languages.unwrap_or_else(header::preferred_languages);
        let etags = self
            .storage
            .map_or_else(ETagStore::default, ETagStore::new);

        Ok(Networking {
            base_url: self.base_url,
            session,
            custom_headers: RwLock::new(Headers::new()),
            accept_language: header::accept_language(&languages),
            mocks: MockRegistry::new(),
            etags,
            mode: RwLock::new(self.mode),
            encoders: self.encoders,
            logger: self.logger,
            before_each: self.before_each,
            pre_process: self.pre_process,
            additional_headers: self.additional_headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn networking() -> Networking {
        Networking::builder()
            .base_url("http://127.0.0.1:9")
            .languages(["en-US", "de"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_request_headers_order() {
        let engine = Networking::builder()
            .languages(["en"])
            .additional_headers(|| {
                let mut headers = Headers::new();
                headers.insert("Authorization".into(), "from-hook".into());
                headers.insert("X-Extra".into(), "1".into());
                headers
            })
            .build()
            .unwrap();
        engine.authenticate_bearer("abc");
        engine.set_custom_header("X-Custom", "c");

        let headers = engine.request_headers();
        assert_eq!(headers["Authorization"], "from-hook");
        assert_eq!(headers["X-Extra"], "1");
        assert_eq!(headers["X-Custom"], "c");
        assert_eq!(headers["Accept-Language"], "en;q=1.0");
    }

    #[test]
    fn test_authentication_helpers() {
        let engine = networking();
        engine.authenticate_basic("user", "pass");
        assert_eq!(engine.request_headers()["Authorization"], "Basic dXNlcjpwYXNz");

        engine.authenticate_bearer("t");
        assert_eq!(engine.request_headers()["Authorization"], "Bearer t");

        engine.authenticate_header("Token raw");
        assert_eq!(engine.request_headers()["Authorization"], "Token raw");
    }

    #[test]
    fn test_empty_languages_omit_header() {
        let engine = Networking::builder()
            .languages(Vec::<String>::new())
            .build()
            .unwrap();
        assert!(!engine.request_headers().contains_key("Accept-Language"));
    }

    #[test]
    fn test_mode_is_mutable_through_shared_reference() {
        let engine = networking();
        assert_eq!(engine.mode(), Mode::Regular);
        engine.set_mode(Mode::Fake);
        assert_eq!(engine.mode(), Mode::Fake);
    }

    #[tokio::test]
    async fn test_fake_without_mock() {
        let engine = networking();
        engine.set_mode(Mode::Fake);
        let err = engine.execute(Request::get("/none")).await.unwrap_err();
        assert!(matches!(err, MalibuError::NoMockProvided));
    }

    #[tokio::test]
    async fn test_background_mode_without_task() {
        let engine = networking();
        engine.set_mode(Mode::Background);
        let err = engine.execute(Request::get("/none")).await.unwrap_err();
        assert!(matches!(err, MalibuError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_build_failure_resolves_immediately() {
        let engine = Networking::builder().build().unwrap();
        let err = engine.execute(Request::get("relative/path")).await.unwrap_err();
        assert!(matches!(err, MalibuError::InvalidRequestUrl(_)));
    }

    #[tokio::test]
    async fn test_fake_mock_saves_etag() {
        let engine = networking();
        engine.set_mode(Mode::Fake);

        let request = Request::get("/users").parameter("page", json!(1));
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::ETAG, http::HeaderValue::from_static("\"v1\""));
        let response = crate::response::HttpResponse::new(
            http::StatusCode::OK,
            url::Url::parse("mock://JSON").unwrap(),
            headers,
        );
        engine.register_mock(Mock::new(
            request.clone(),
            Some(response),
            Some(bytes::Bytes::from_static(br#"{"users":[]}"#)),
            None,
        ));

        let wave = engine.execute(request.clone()).await.unwrap();
        assert_eq!(wave.to_json().unwrap(), json!({"users": []}));
        assert_eq!(
            engine.etag_store().get(&request.etag_key(engine.base_url())).as_deref(),
            Some("\"v1\"")
        );
    }

    #[tokio::test]
    async fn test_mock_lookup_uses_caller_descriptor() {
        let engine = Networking::builder()
            .base_url("http://127.0.0.1:9")
            .mode(Mode::Fake)
            .before_each(|request| Request {
                message: crate::request::Message {
                    resource: format!("/v2{}", request.message.resource),
                    ..request.message
                },
                ..request
            })
            .build()
            .unwrap();
        engine.register_mock(Mock::from_json(Request::get("/v2/orders"), &json!([2])));
        let err = engine.execute(Request::get("/orders")).await.unwrap_err();
        assert!(matches!(err, MalibuError::NoMockProvided));

        engine.register_mock(Mock::from_json(Request::get("/items"), &json!([1])));
        let wave = engine.execute(Request::get("/items")).await.unwrap();
        assert_eq!(wave.request().url().as_str(), "http://127.0.0.1:9/v2/items");
        assert_eq!(wave.to_json_array().unwrap(), vec![json!(1)]);
    }

    #[tokio::test]
    async fn test_fake_mode_without_base_url() {
        let engine = Networking::builder().mode(Mode::Fake).build().unwrap();
        engine.register_mock(Mock::from_json(Request::get("/users"), &json!([])));

        let wave = engine.execute(Request::get("/users")).await.unwrap();
        assert_eq!(wave.request().url().as_str(), "mock://localhost/users");
        assert_eq!(wave.to_json().unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_pre_process_mutates_headers() {
        let engine = Networking::builder()
            .base_url("http://127.0.0.1:9")
            .mode(Mode::Fake)
            .pre_process_request(|request| {
                request
                    .headers_mut()
                    .insert("x-pre", http::HeaderValue::from_static("yes"));
            })
            .build()
            .unwrap();
        engine.register_mock(Mock::from_json(Request::get("/a"), &json!({})));

        let wave = engine.execute(Request::get("/a")).await.unwrap();
        assert_eq!(wave.request().header("x-pre"), Some("yes"));
    }

    #[tokio::test]
    async fn test_mock_error_is_forwarded() {
        let engine = networking();
        engine.set_mode(Mode::Partial);
        engine.register_mock(Mock::new(
            Request::get("/broken"),
            None,
            None,
            Some(MalibuError::UnacceptableStatusCode(503)),
        ));

        let err = engine.execute(Request::get("/broken")).await.unwrap_err();
        assert!(matches!(err, MalibuError::UnacceptableStatusCode(503)));
    }

    #[tokio::test]
    async fn test_background_task_runs_in_background_mode() {
        let engine = networking();
        engine.set_mode(Mode::Background);

        let ride = engine.execute_with_background(
            Request::get("/bg"),
            |_: &reqwest::Client, completion: TaskCompletion| {
                let response = crate::response::HttpResponse::ok_json(completion.request().url().clone());
                completion.process(Some(bytes::Bytes::from_static(b"{}")), Some(response), None);
            },
        );
        let wave = ride.await.unwrap();
        assert_eq!(wave.request().url().as_str(), "http://127.0.0.1:9/bg");
    }

    #[test]
    fn test_from_config_uses_storage_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = NetworkingConfig {
            base_url: Some("http://api.local".into()),
            mode: Mode::Partial,
            storage_dir: Some(dir.path().to_path_buf()),
            ..NetworkingConfig::default()
        };
        let engine = Networking::from_config(config).unwrap();
        assert_eq!(engine.base_url(), "http://api.local");
        assert_eq!(engine.mode(), Mode::Partial);

        engine.etag_store().add("\"x\"", "k");
        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").as_deref(), Some("\"x\""));
    }

    #[test]
    fn test_no_runtime_rejects() {
        let engine = networking();
        engine.set_mode(Mode::Fake);
        engine.register_mock(Mock::from_json(Request::get("/a"), &json!({})));
        let result = tokio_test::block_on(engine.execute(Request::get("/a")));
        assert!(matches!(result, Err(MalibuError::Configuration(_))));
    }
}
