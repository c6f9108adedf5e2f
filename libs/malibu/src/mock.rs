//! Canned outcomes replayed instead of live requests in `Partial` and `Fake`
//! modes.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use url::Url;

use crate::error::MalibuError;
use crate::request::Request;
use crate::response::HttpResponse;

/// URL reported by responses of mocks built from in-memory JSON.
pub const MOCK_JSON_URL: &str = "mock://JSON";

/// A recorded outcome for one request descriptor.
///
/// When `error` is set it is replayed as-is; otherwise a missing `response`
/// or `data` resolves the ride like a live request missing them would.
#[derive(Debug, Clone)]
pub struct Mock {
    pub request: Request,
    pub response: Option<HttpResponse>,
    pub data: Option<Bytes>,
    pub error: Option<MalibuError>,
}

impl Mock {
    /// Mock from explicit parts; an `error` takes precedence on replay.
    #[must_use]
    pub fn new(
        request: Request,
        response: Option<HttpResponse>,
        data: Option<Bytes>,
        error: Option<MalibuError>,
    ) -> Self {
        Self {
            request,
            response,
            data,
            error,
        }
    }

    /// Mock answering with the bytes of the fixture at `path` and a `200`
    /// JSON response whose URL is the fixture's `file://` URL.
    ///
    /// An unreadable fixture leaves `data` empty, so the ride resolves with
    /// `MalibuError::NoDataInResponse`.
    #[must_use]
    pub fn from_fixture(request: Request, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let data = match fs::read(path) {
            Ok(raw) => Some(Bytes::from(raw)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Mock fixture not readable");
                None
            }
        };
        let response = std::path::absolute(path)
            .ok()
            .and_then(|absolute| Url::from_file_path(absolute).ok())
            .map(HttpResponse::ok_json);

        Self::new(request, response, data, None)
    }

    /// Mock answering with `value` serialized as JSON. A value that fails to
    /// serialize produces a mock that fails with
    /// `MalibuError::NoResponseReceived`.
    #[must_use]
    pub fn from_json<T: Serialize + ?Sized>(request: Request, value: &T) -> Self {
        let data = serde_json::to_vec(value).ok();
        let url = Url::parse(MOCK_JSON_URL).ok();

        match (data, url) {
            (Some(data), Some(url)) => Self::new(
                request,
                Some(HttpResponse::ok_json(url)),
                Some(Bytes::from(data)),
                None,
            ),
            _ => Self::new(request, None, None, Some(MalibuError::NoResponseReceived)),
        }
    }

    /// Registry key of this mock's request.
    #[must_use]
    pub fn key(&self) -> String {
        self.request.key()
    }
}

/// Mocks keyed by [`Request::key`]. Registering a second mock for the same
/// key replaces the first.
#[derive(Debug, Default)]
pub struct MockRegistry {
    mocks: RwLock<HashMap<String, Mock>>,
}

impl MockRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mock` under its key, replacing any previous one.
    pub fn register(&self, mock: Mock) {
        let key = mock.key();
        tracing::debug!(key = %key, "Registered mock");
        self.mocks.write().insert(key, mock);
    }

    /// Copy of the mock registered under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Mock> {
        self.mocks.read().get(key).cloned()
    }

    /// Number of registered mocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mocks.read().len()
    }

    /// Whether no mock is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mocks.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde::ser::Error as _;
    use serde_json::json;

    use super::*;
    use crate::response::MOCK_JSON_CONTENT_TYPE;

    #[test]
    fn test_from_json() {
        let mock = Mock::from_json(Request::get("/users"), &json!({"id": 1}));
        assert!(mock.error.is_none());
        let response = mock.response.unwrap();
        assert_eq!(response.url().as_str(), MOCK_JSON_URL);
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.content_type(), Some(MOCK_JSON_CONTENT_TYPE));
        assert_eq!(mock.data.unwrap(), Bytes::from_static(b"{\"id\":1}"));
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("unsupported"))
        }
    }

    #[test]
    fn test_from_json_failure_bakes_error() {
        let mock = Mock::from_json(Request::get("/users"), &Unserializable);
        assert!(mock.response.is_none());
        assert!(mock.data.is_none());
        assert!(matches!(mock.error, Some(MalibuError::NoResponseReceived)));
    }

    #[test]
    fn test_from_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, br#"[{"id":1}]"#).unwrap();

        let mock = Mock::from_fixture(Request::get("/users"), &path);
        assert_eq!(mock.data.as_deref(), Some(&br#"[{"id":1}]"#[..]));
        let response = mock.response.unwrap();
        assert_eq!(response.url().scheme(), "file");
        assert!(response.url().path().ends_with("users.json"));
    }

    #[test]
    fn test_from_missing_fixture() {
        let mock = Mock::from_fixture(Request::get("/users"), "/definitely/not/here.json");
        assert!(mock.data.is_none());
        assert!(mock.response.is_some());
    }

    #[test]
    fn test_registry_replaces() {
        let registry = MockRegistry::new();
        assert!(registry.is_empty());

        registry.register(Mock::from_json(Request::get("/a"), &json!({"v": 1})));
        registry.register(Mock::from_json(Request::get("/a"), &json!({"v": 2})));
        registry.register(Mock::from_json(Request::post("/a"), &json!({})));

        assert_eq!(registry.len(), 2);
        let mock = registry.get("GET /a").unwrap();
        assert_eq!(mock.data.unwrap(), Bytes::from_static(b"{\"v\":2}"));
        assert!(registry.get("DELETE /a").is_none());
    }
}
