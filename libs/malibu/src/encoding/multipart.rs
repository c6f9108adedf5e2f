use std::sync::LazyLock;

use bytes::Bytes;

use super::{ParameterEncoding, QueryBuilder};
use crate::error::Result;
use crate::request::Parameters;

static BOUNDARY: LazyLock<String> =
    LazyLock::new(|| format!("Malibu{:08x}{:08x}", rand::random::<u32>(), rand::random::<u32>()));

/// Multipart boundary token, generated once per process.
#[must_use]
pub fn boundary() -> &'static str {
    &BOUNDARY
}

/// Encodes parameters as text-only `multipart/form-data` parts.
///
/// Part names and values are the escaped pairs from
/// [`QueryBuilder::build_components`]. File parts are not supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartFormEncoder;

impl MultipartFormEncoder {
    /// Text-only multipart body of `parameters` delimited by `boundary`.
    #[must_use]
    pub fn build_multipart_string(parameters: &Parameters, boundary: &str) -> String {
        let mut body: String = QueryBuilder::build_components(parameters)
            .into_iter()
            .map(|(key, value)| {
                format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{key}\"\r\n\r\n{value}\r\n")
            })
            .collect();
        body.push_str("--");
        body.push_str(boundary);
        body.push_str("--\r\n");
        body
    }
}

impl ParameterEncoding for MultipartFormEncoder {
    fn encode(&self, parameters: &Parameters) -> Result<Bytes> {
        Ok(Bytes::from(Self::build_multipart_string(parameters, boundary())))
    }
}
