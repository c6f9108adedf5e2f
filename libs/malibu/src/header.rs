//! Derived header values sent by every engine.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Maximum number of languages listed in `Accept-Language`.
const MAX_LANGUAGES: usize = 6;

/// Default `User-Agent` of engine sessions.
#[must_use]
pub fn user_agent() -> String {
    format!("malibu/{}", env!("CARGO_PKG_VERSION"))
}

/// `Accept-Language` value with descending quality, e.g.
/// `"en-US;q=1.0, fr;q=0.9"`. At most six languages are listed.
#[must_use]
pub fn accept_language<I, S>(languages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    languages
        .into_iter()
        .take(MAX_LANGUAGES)
        .enumerate()
        .map(|(index, language)| match index {
            0 => format!("{};q=1.0", language.as_ref()),
            _ => format!("{};q=0.{}", language.as_ref(), 10 - index),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Preferred languages from `LANGUAGE` (colon separated) or `LANG`,
/// falling back to `en`.
#[must_use]
pub fn preferred_languages() -> Vec<String> {
    let from_language = std::env::var("LANGUAGE")
        .ok()
        .map(|value| {
            value
                .split(':')
                .filter_map(normalize_locale)
                .collect::<Vec<_>>()
        })
        .filter(|languages| !languages.is_empty());

    from_language
        .or_else(|| {
            std::env::var("LANG")
                .ok()
                .and_then(|value| normalize_locale(&value))
                .map(|language| vec![language])
        })
        .unwrap_or_else(|| vec!["en".to_owned()])
}

/// `en_US.UTF-8` becomes `en-US`; `C` and `POSIX` carry no language.
fn normalize_locale(locale: &str) -> Option<String> {
    let tag = locale.split(['.', '@']).next().unwrap_or_default().trim();
    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        return None;
    }
    Some(tag.replace('_', "-"))
}

/// `Authorization` value for HTTP basic authentication.
#[must_use]
pub fn basic_authentication(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// `Authorization` value for a bearer token.
#[must_use]
pub fn bearer_authentication(token: &str) -> String {
    format!("Bearer {token}")
}
