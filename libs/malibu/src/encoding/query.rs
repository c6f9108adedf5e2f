//! Flattening of nested parameters into escaped query components.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

use crate::request::Parameters;

/// Bytes left untouched by [`QueryBuilder::escape`]: the unreserved set plus
/// `/` and `?`. Everything else, including `:#[]@!$&'()*+,;=`, is encoded.
const QUERY_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/')
    .remove(b'?');

/// One escaped `(key, value)` pair.
pub type Component = (String, String);

/// Builds query strings and form bodies out of nested parameters.
///
/// Nested maps expand to `key[nested]`, sequences to `key[]`:
///
/// ```
/// use malibu::QueryBuilder;
/// use serde_json::json;
///
/// let params = json!({"tags": ["x", "y"]});
/// let query = QueryBuilder::build_query(params.as_object().unwrap());
/// assert_eq!(query, "tags%5B%5D=x&tags%5B%5D=y");
/// ```
pub struct QueryBuilder;

impl QueryBuilder {
    /// Join all components as `key=value` pairs separated by `&`.
    #[must_use]
    pub fn build_query(parameters: &Parameters) -> String {
        Self::build_components(parameters)
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Flatten every top-level parameter into escaped components.
    #[must_use]
    pub fn build_components(parameters: &Parameters) -> Vec<Component> {
        let mut components = Vec::new();
        for (key, value) in parameters {
            Self::push_components(&mut components, key, value);
        }
        components
    }

    /// Flatten a single `key`/`value` pair, recursing into maps and sequences.
    #[must_use]
    pub fn components_for(key: &str, value: &Value) -> Vec<Component> {
        let mut components = Vec::new();
        Self::push_components(&mut components, key, value);
        components
    }

    fn push_components(components: &mut Vec<Component>, key: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (nested_key, nested) in map {
                    Self::push_components(components, &format!("{key}[{nested_key}]"), nested);
                }
            }
            Value::Array(items) => {
                let array_key = format!("{key}[]");
                for item in items {
                    Self::push_components(components, &array_key, item);
                }
            }
            leaf => components.push((Self::escape(key), Self::escape(&leaf_string(leaf)))),
        }
    }

    /// Percent-encode `string` for use as a query key or value.
    #[must_use]
    pub fn escape(string: &str) -> String {
        utf8_percent_encode(string, QUERY_ESCAPE_SET).to_string()
    }
}

fn leaf_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
