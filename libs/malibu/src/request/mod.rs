//! Request descriptors and their conversion into wire-ready requests.

mod content_type;
mod method;
mod transport;

use std::collections::BTreeMap;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, IF_NONE_MATCH};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::encoding::{ParameterEncoders, QueryBuilder};
use crate::error::{MalibuError, Result};
use crate::storage::ETagStore;

/// Base of resources given as an absolute path to an engine without a base
/// URL.
pub const RELATIVE_BASE: &str = "mock://localhost";

pub use content_type::ContentType;
pub use method::Method;
pub use transport::{CachePolicy, TransportRequest};

/// Request parameters: a JSON object of scalars, nested objects and arrays.
pub type Parameters = serde_json::Map<String, Value>;

/// Plain string headers as supplied by callers.
pub type Headers = BTreeMap<String, String>;

/// Whether a request takes part in conditional (`If-None-Match`) caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtagPolicy {
    Enabled,
    Disabled,
}

/// Resource, parameters and headers of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub resource: String,
    pub parameters: Parameters,
    pub headers: Headers,
}

impl Message {
    /// Message for `resource` with no parameters or headers.
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }
}

/// Declarative description of one HTTP request.
///
/// The per-verb constructors pick the usual defaults: `GET` sends its
/// parameters in the query and participates in `ETag` caching, `POST`, `PUT`
/// and `PATCH` send a JSON body, `DELETE` and `HEAD` use the query.
///
/// ```
/// use malibu::{ContentType, Request};
/// use serde_json::json;
///
/// let request = Request::post("/items")
///     .content_type(ContentType::FormUrlEncoded)
///     .parameter("name", json!("a"))
///     .header("X-Trace", "1");
///
/// assert_eq!(request.key(), "POST /items");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub message: Message,
    pub content_type: ContentType,
    pub etag_policy: EtagPolicy,
    pub cache_policy: CachePolicy,
}

impl Request {
    /// Descriptor with explicit content type and `ETag` policy.
    #[must_use]
    pub fn new(
        method: Method,
        resource: impl Into<String>,
        content_type: ContentType,
        etag_policy: EtagPolicy,
    ) -> Self {
        Self {
            method,
            message: Message::new(resource),
            content_type,
            etag_policy,
            cache_policy: CachePolicy::default(),
        }
    }

    /// `GET` with query parameters and `ETag` caching.
    #[must_use]
    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(Method::Get, resource, ContentType::Query, EtagPolicy::Enabled)
    }

    /// `POST` with a JSON body.
    #[must_use]
    pub fn post(resource: impl Into<String>) -> Self {
        Self::new(Method::Post, resource, ContentType::Json, EtagPolicy::Disabled)
    }

    /// `PUT` with a JSON body.
    #[must_use]
    pub fn put(resource: impl Into<String>) -> Self {
        Self::new(Method::Put, resource, ContentType::Json, EtagPolicy::Disabled)
    }

    /// `PATCH` with a JSON body.
    #[must_use]
    pub fn patch(resource: impl Into<String>) -> Self {
        Self::new(Method::Patch, resource, ContentType::Json, EtagPolicy::Disabled)
    }

    /// `DELETE` with query parameters.
    #[must_use]
    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(Method::Delete, resource, ContentType::Query, EtagPolicy::Disabled)
    }

    /// `HEAD` with query parameters.
    #[must_use]
    pub fn head(resource: impl Into<String>) -> Self {
        Self::new(Method::Head, resource, ContentType::Query, EtagPolicy::Disabled)
    }

    // --- builder-style setters ---

    /// Set one parameter.
    #[must_use]
    pub fn parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.message.parameters.insert(key.into(), value);
        self
    }

    /// Replace all parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.message.parameters = parameters;
        self
    }

    /// Set one request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.message.headers.insert(name.into(), value.into());
        self
    }

    /// Override the content type.
    #[must_use]
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Override the `ETag` policy.
    #[must_use]
    pub fn etag_policy(mut self, policy: EtagPolicy) -> Self {
        self.etag_policy = policy;
        self
    }

    /// Override the cache policy.
    #[must_use]
    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    // --- fingerprints ---

    /// Mock lookup key: `"<METHOD> <resource>"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.message.resource)
    }

    /// `ETag` lookup key: method, prefix, resource and the compact JSON of the
    /// parameters, concatenated.
    #[must_use]
    pub fn etag_key(&self, prefix: &str) -> String {
        let parameters = serde_json::to_string(&self.message.parameters).unwrap_or_default();
        format!("{}{prefix}{}{parameters}", self.method, self.message.resource)
    }

    /// Build the wire-ready request for `prefix` + resource. With an empty
    /// prefix, a resource starting with `/` resolves against
    /// [`RELATIVE_BASE`].
    ///
    /// `additional_headers` are applied before the descriptor's own headers,
    /// so the descriptor wins on collision.
    ///
    /// # Errors
    /// - `MalibuError::InvalidRequestUrl` if the URL does not parse
    /// - `MalibuError::InvalidParameter` if the body cannot be encoded or a
    ///   header name or value is not valid on the wire
    pub fn to_transport_request(
        &self,
        prefix: &str,
        additional_headers: &Headers,
        encoders: &ParameterEncoders,
        etags: &ETagStore,
    ) -> Result<TransportRequest> {
        let url = self.build_url(prefix)?;
        let mut request = TransportRequest::new(self.method.into(), url);
        request.cache_policy = self.cache_policy;

        if let Some(value) = self.content_type.header() {
            request.headers.insert(CONTENT_TYPE, header_value(&value)?);
        }

        if let Some(body) = encoders.encode(&self.content_type, &self.message.parameters)? {
            if self.content_type == ContentType::MultipartFormData {
                request.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            }
            request.body = Some(body);
        }

        apply_headers(&mut request.headers, additional_headers)?;
        apply_headers(&mut request.headers, &self.message.headers)?;

        if self.etag_policy == EtagPolicy::Enabled
            && let Some(etag) = etags.get(&self.etag_key(prefix))
        {
            request.headers.insert(IF_NONE_MATCH, header_value(&etag)?);
        }

        Ok(request)
    }

    fn build_url(&self, prefix: &str) -> Result<Url> {
        let raw = format!("{prefix}{}", self.message.resource);
        let mut url = parse_url(&raw)?;

        if self.content_type == ContentType::Query && !self.message.parameters.is_empty() {
            let encoded = QueryBuilder::build_query(&self.message.parameters);
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                _ => encoded,
            };
            url.set_query(Some(&query));
        }

        Ok(url)
    }
}

/// Parse `raw`; an absolute path such as `/users` resolves against
/// [`RELATIVE_BASE`].
fn parse_url(raw: &str) -> Result<Url> {
    let invalid = || MalibuError::InvalidRequestUrl(raw.to_owned());
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) if raw.starts_with('/') => {
            Url::parse(RELATIVE_BASE)
                .and_then(|base| base.join(raw))
                .map_err(|_| invalid())
        }
        Err(_) => Err(invalid()),
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| MalibuError::InvalidParameter(format!("invalid header value: {value}")))
}

fn apply_headers(target: &mut HeaderMap, headers: &Headers) -> Result<()> {
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| MalibuError::InvalidParameter(format!("invalid header name: {name}")))?;
        target.insert(name, header_value(value)?);
    }
    Ok(())
}
