use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::HttpResponse;
use crate::error::{MalibuError, Result};
use crate::request::{Parameters, TransportRequest};
use crate::serialization::{DataSerializer, JsonSerializer, Serializing, StringSerializer};

/// Successful outcome of one request: body, the request sent and the
/// response metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    data: Bytes,
    request: TransportRequest,
    response: HttpResponse,
}

impl Wave {
    /// Wave from its parts.
    #[must_use]
    pub fn new(data: Bytes, request: TransportRequest, response: HttpResponse) -> Self {
        Self {
            data,
            request,
            response,
        }
    }

    /// Raw response body.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Transport request that was sent.
    #[must_use]
    pub fn request(&self) -> &TransportRequest {
        &self.request
    }

    /// Response metadata.
    #[must_use]
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    /// Parse the body as JSON; `204 No Content` yields `Value::Null`.
    ///
    /// # Errors
    /// `MalibuError::NoDataInResponse` for an empty body, otherwise the parse
    /// error as `MalibuError::Serialization`.
    pub fn to_json(&self) -> Result<Value> {
        JsonSerializer.serialize(&self.data, &self.response)
    }

    /// # Errors
    /// `MalibuError::JsonArraySerializationFailed` if the body is not an array.
    pub fn to_json_array(&self) -> Result<Vec<Value>> {
        match self.to_json()? {
            Value::Array(items) => Ok(items),
            _ => Err(MalibuError::JsonArraySerializationFailed),
        }
    }

    /// # Errors
    /// `MalibuError::JsonDictionarySerializationFailed` if the body is not an
    /// object.
    pub fn to_json_dictionary(&self) -> Result<Parameters> {
        match self.to_json()? {
            Value::Object(map) => Ok(map),
            _ => Err(MalibuError::JsonDictionarySerializationFailed),
        }
    }

    /// # Errors
    /// `MalibuError::StringSerializationFailed` if the body is not UTF-8.
    pub fn to_text(&self) -> Result<String> {
        StringSerializer.serialize(&self.data, &self.response)
    }

    /// # Errors
    /// `MalibuError::NoDataInResponse` for an empty non-204 body.
    pub fn to_bytes(&self) -> Result<Bytes> {
        DataSerializer.serialize(&self.data, &self.response)
    }

    /// Deserialize the JSON body into `T`.
    ///
    /// # Errors
    /// Same as [`Wave::to_json`], plus `MalibuError::Serialization` when the
    /// value does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json()?)?)
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, StatusCode};
    use serde::Deserialize;
    use serde_json::json;
    use url::Url;

    use super::*;

    fn wave(status: StatusCode, body: &'static [u8]) -> Wave {
        let url = Url::parse("http://h/a").unwrap();
        Wave::new(
            Bytes::from_static(body),
            TransportRequest::new(http::Method::GET, url.clone()),
            HttpResponse::new(status, url, HeaderMap::new()),
        )
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(wave(StatusCode::OK, b"x"), wave(StatusCode::OK, b"x"));
        assert_ne!(wave(StatusCode::OK, b"x"), wave(StatusCode::OK, b"y"));
        assert_ne!(wave(StatusCode::OK, b"x"), wave(StatusCode::CREATED, b"x"));
    }

    #[test]
    fn test_no_content_is_null() {
        assert_eq!(wave(StatusCode::NO_CONTENT, b"").to_json().unwrap(), Value::Null);
    }

    #[test]
    fn test_json_shapes() {
        let array = wave(StatusCode::OK, b"[1,2]");
        assert_eq!(array.to_json_array().unwrap(), vec![json!(1), json!(2)]);
        assert!(matches!(
            array.to_json_dictionary(),
            Err(MalibuError::JsonDictionarySerializationFailed)
        ));

        let object = wave(StatusCode::OK, br#"{"a":1}"#);
        assert_eq!(object.to_json_dictionary().unwrap()["a"], json!(1));
        assert!(matches!(
            object.to_json_array(),
            Err(MalibuError::JsonArraySerializationFailed)
        ));
    }

    #[test]
    fn test_decode() {
        #[derive(Deserialize)]
        struct Item {
            name: String,
        }

        let item: Item = wave(StatusCode::OK, br#"{"name":"a"}"#).decode().unwrap();
        assert_eq!(item.name, "a");
    }

    #[test]
    fn test_text() {
        assert_eq!(wave(StatusCode::OK, b"hi").to_text().unwrap(), "hi");
    }
}
