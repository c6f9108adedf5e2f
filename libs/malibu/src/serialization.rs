//! Response body serializers.

use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;

use crate::error::{MalibuError, Result};
use crate::response::HttpResponse;

/// Turns a response body into a typed value.
pub trait Serializing {
    type Output;

    /// # Errors
    /// Serializer-specific; see the implementors.
    fn serialize(&self, data: &Bytes, response: &HttpResponse) -> Result<Self::Output>;
}

/// JSON value serializer. `204 No Content` yields `Value::Null` without
/// looking at the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializing for JsonSerializer {
    type Output = Value;

    fn serialize(&self, data: &Bytes, response: &HttpResponse) -> Result<Value> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        if data.is_empty() {
            return Err(MalibuError::NoDataInResponse);
        }
        Ok(serde_json::from_slice(data)?)
    }
}

/// UTF-8 text serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSerializer;

impl Serializing for StringSerializer {
    type Output = String;

    fn serialize(&self, data: &Bytes, response: &HttpResponse) -> Result<String> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(String::new());
        }
        if data.is_empty() {
            return Err(MalibuError::NoDataInResponse);
        }
        String::from_utf8(data.to_vec())
            .map_err(|_| MalibuError::StringSerializationFailed("utf-8".to_owned()))
    }
}

/// Raw body serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSerializer;

impl Serializing for DataSerializer {
    type Output = Bytes;

    fn serialize(&self, data: &Bytes, response: &HttpResponse) -> Result<Bytes> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Bytes::new());
        }
        if data.is_empty() {
            return Err(MalibuError::NoDataInResponse);
        }
        Ok(data.clone())
    }
}
