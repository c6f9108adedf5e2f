//! Parameter encoders turning [`Parameters`] into request bodies.

mod multipart;
mod query;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{MalibuError, Result};
use crate::request::{ContentType, Parameters};

pub use multipart::{MultipartFormEncoder, boundary};
pub use query::{Component, QueryBuilder};

/// Encodes request parameters into body bytes for one content type.
pub trait ParameterEncoding: Send + Sync {
    /// # Errors
    /// Returns `MalibuError::InvalidParameter` when the parameters cannot be
    /// represented in this encoding.
    fn encode(&self, parameters: &Parameters) -> Result<Bytes>;
}

/// Serializes parameters as a JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl ParameterEncoding for JsonEncoder {
    fn encode(&self, parameters: &Parameters) -> Result<Bytes> {
        serde_json::to_vec(parameters)
            .map(Bytes::from)
            .map_err(|e| MalibuError::InvalidParameter(e.to_string()))
    }
}

/// Encodes parameters as `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormUrlEncoder;

impl ParameterEncoding for FormUrlEncoder {
    fn encode(&self, parameters: &Parameters) -> Result<Bytes> {
        Ok(Bytes::from(QueryBuilder::build_query(parameters)))
    }
}

/// Engine-level encoder overrides keyed by content type.
///
/// An override wins over the content type's own default encoder.
#[derive(Clone, Default)]
pub struct ParameterEncoders {
    overrides: HashMap<ContentType, Arc<dyn ParameterEncoding>>,
}

impl std::fmt::Debug for ParameterEncoders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterEncoders")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ParameterEncoders {
    /// Registry with no overrides; every content type uses its default encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `encoder` for `content_type` instead of its default.
    pub fn register(&mut self, content_type: ContentType, encoder: Arc<dyn ParameterEncoding>) {
        self.overrides.insert(content_type, encoder);
    }

    /// Encode `parameters` for `content_type`.
    ///
    /// Returns `Ok(None)` when neither an override nor a default encoder
    /// exists, which is always the case for [`ContentType::Query`].
    ///
    /// # Errors
    /// Propagates the encoder's `MalibuError::InvalidParameter`.
    pub fn encode(&self, content_type: &ContentType, parameters: &Parameters) -> Result<Option<Bytes>> {
        if *content_type == ContentType::Query {
            return Ok(None);
        }
        if let Some(encoder) = self.overrides.get(content_type) {
            return encoder.encode(parameters).map(Some);
        }
        match content_type.encoder() {
            Some(encoder) => encoder.encode(parameters).map(Some),
            None => Ok(None),
        }
    }
}
