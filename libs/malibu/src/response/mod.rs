//! Response metadata and the successful result of a request.

mod wave;

use http::header::{CONTENT_TYPE, ETAG};
use http::{HeaderMap, HeaderValue, StatusCode};
use url::Url;

pub use wave::Wave;

/// Content type of responses built for mocks.
pub const MOCK_JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Status, final URL and headers of a received response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: StatusCode,
    url: Url,
    headers: HeaderMap,
}

impl HttpResponse {
    /// Metadata from its parts.
    #[must_use]
    pub fn new(status: StatusCode, url: Url, headers: HeaderMap) -> Self {
        Self {
            status,
            url,
            headers,
        }
    }

    /// `200 OK` JSON response at `url`, as replayed by fixture-backed mocks.
    #[must_use]
    pub fn ok_json(url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(MOCK_JSON_CONTENT_TYPE));
        Self::new(StatusCode::OK, url, headers)
    }

    pub(crate) fn from_reqwest(response: &reqwest::Response) -> Self {
        Self::new(
            response.status(),
            response.url().clone(),
            response.headers().clone(),
        )
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status code as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Final response URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header `name` as text, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `ETag` header.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}
