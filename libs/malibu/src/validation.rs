//! Post-resolution validators applied by callers to a [`Wave`].

use std::collections::BTreeSet;

use mime::Mime;

use crate::error::{MalibuError, Result};
use crate::response::Wave;

/// Checks a resolved wave and fails with a typed error when it is not
/// acceptable.
pub trait Validating: Send + Sync {
    /// # Errors
    /// Validator-specific; see the implementors.
    fn validate(&self, wave: &Wave) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Accepts only the configured status codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodeValidator {
    status_codes: BTreeSet<u16>,
}

impl StatusCodeValidator {
    /// Accept exactly `status_codes`.
    #[must_use]
    pub fn new(status_codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            status_codes: status_codes.into_iter().collect(),
        }
    }

    /// The `200..300` success range.
    #[must_use]
    pub fn success() -> Self {
        Self::new(200..300)
    }
}

impl Default for StatusCodeValidator {
    fn default() -> Self {
        Self::success()
    }
}

impl Validating for StatusCodeValidator {
    fn validate(&self, wave: &Wave) -> Result<()> {
        let code = wave.response().status_code();
        if self.status_codes.contains(&code) {
            Ok(())
        } else {
            Err(MalibuError::UnacceptableStatusCode(code))
        }
    }
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// Accepts responses whose `Content-Type` matches one of the patterns.
///
/// Patterns may use `*` for the type or subtype (`application/*`, `*/*`).
/// Parameters such as `charset` are ignored on both sides.
#[derive(Debug, Clone)]
pub struct ContentTypeValidator {
    accepted: Vec<Mime>,
}

impl ContentTypeValidator {
    /// Patterns that are not valid MIME types are skipped.
    #[must_use]
    pub fn new<I, S>(content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let accepted = content_types
            .into_iter()
            .filter_map(|s| s.as_ref().trim().parse::<Mime>().ok())
            .collect();
        Self { accepted }
    }

    fn matches(pattern: &Mime, actual: &Mime) -> bool {
        let type_ok = pattern.type_() == mime::STAR || pattern.type_() == actual.type_();
        let subtype_ok = pattern.subtype() == mime::STAR || pattern.subtype() == actual.subtype();
        type_ok && subtype_ok
    }
}

impl Validating for ContentTypeValidator {
    fn validate(&self, wave: &Wave) -> Result<()> {
        let value = wave
            .response()
            .content_type()
            .ok_or(MalibuError::MissingContentType)?;
        let actual: Mime = value
            .trim()
            .parse()
            .map_err(|_| MalibuError::UnacceptableContentType(value.to_owned()))?;

        if self.accepted.iter().any(|pattern| Self::matches(pattern, &actual)) {
            Ok(())
        } else {
            Err(MalibuError::UnacceptableContentType(value.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http::{HeaderMap, HeaderValue, StatusCode};
    use url::Url;

    use super::*;
    use crate::request::TransportRequest;
    use crate::response::HttpResponse;

    fn wave(status: u16, content_type: Option<&'static str>) -> Wave {
        let url = Url::parse("http://h/").unwrap();
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        Wave::new(
            Bytes::new(),
            TransportRequest::new(http::Method::GET, url.clone()),
            HttpResponse::new(StatusCode::from_u16(status).unwrap(), url, headers),
        )
    }

    #[test]
    fn test_status_code_set() {
        let validator = StatusCodeValidator::new([200, 304]);
        assert!(validator.validate(&wave(304, None)).is_ok());
        let err = validator.validate(&wave(404, None)).unwrap_err();
        assert!(matches!(err, MalibuError::UnacceptableStatusCode(404)));
    }

    #[test]
    fn test_success_range() {
        let validator = StatusCodeValidator::success();
        assert!(validator.validate(&wave(200, None)).is_ok());
        assert!(validator.validate(&wave(299, None)).is_ok());
        assert!(validator.validate(&wave(300, None)).is_err());
        assert!(validator.validate(&wave(199, None)).is_err());
    }

    #[test]
    fn test_content_type_exact_and_wildcards() {
        let json = wave(200, Some("application/json; charset=utf-8"));

        assert!(ContentTypeValidator::new(["application/json"]).validate(&json).is_ok());
        assert!(ContentTypeValidator::new(["application/*"]).validate(&json).is_ok());
        assert!(ContentTypeValidator::new(["*/json"]).validate(&json).is_ok());
        assert!(ContentTypeValidator::new(["*/*"]).validate(&json).is_ok());
    }

    #[test]
    fn test_content_type_mismatch() {
        let err = ContentTypeValidator::new(["text/html", "image/*"])
            .validate(&wave(200, Some("application/json")))
            .unwrap_err();
        assert!(matches!(err, MalibuError::UnacceptableContentType(ref v) if v == "application/json"));
    }

    #[test]
    fn test_missing_content_type() {
        let err = ContentTypeValidator::new(["*/*"])
            .validate(&wave(200, None))
            .unwrap_err();
        assert!(matches!(err, MalibuError::MissingContentType));
    }
}
