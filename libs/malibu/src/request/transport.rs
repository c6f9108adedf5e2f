use bytes::Bytes;
use http::header::{CACHE_CONTROL, PRAGMA};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

/// Caching hint carried by a request.
///
/// The transport keeps no local cache, so non-default policies are sent as
/// `Cache-Control`/`Pragma` request headers unless the caller set them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    UseProtocolCachePolicy,
    ReloadIgnoringLocalCacheData,
    ReturnCacheDataElseLoad,
    ReturnCacheDataDontLoad,
}

impl CachePolicy {
    fn hint_headers(self) -> Vec<(HeaderName, &'static str)> {
        match self {
            CachePolicy::UseProtocolCachePolicy => Vec::new(),
            CachePolicy::ReloadIgnoringLocalCacheData => {
                vec![(CACHE_CONTROL, "no-cache"), (PRAGMA, "no-cache")]
            }
            CachePolicy::ReturnCacheDataElseLoad => vec![(CACHE_CONTROL, "max-stale")],
            CachePolicy::ReturnCacheDataDontLoad => vec![(CACHE_CONTROL, "only-if-cached")],
        }
    }
}

/// Wire-ready request produced from a [`Request`](crate::Request) descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub(crate) method: http::Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Bytes>,
    pub(crate) cache_policy: CachePolicy,
}

impl TransportRequest {
    /// Request with no headers or body.
    #[must_use]
    pub fn new(method: http::Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            cache_policy: CachePolicy::default(),
        }
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &http::Method {
        &self.method
    }

    /// Full request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable headers; the only part of a built request hooks may change.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Encoded body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Cache policy sent as header hints.
    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    /// Build the `reqwest` request sent by the live strategy.
    ///
    /// # Errors
    /// Returns the `reqwest` builder error.
    pub fn to_reqwest(&self, client: &reqwest::Client) -> Result<reqwest::Request, reqwest::Error> {
        let mut headers = self.headers.clone();
        for (name, value) in self.cache_policy.hint_headers() {
            if !headers.contains_key(&name) {
                headers.insert(name, HeaderValue::from_static(value));
            }
        }

        let mut builder = client
            .request(self.method.clone(), self.url.clone())
            .headers(headers);
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        builder.build()
    }
}
