use crate::encoding::{
    FormUrlEncoder, JsonEncoder, MultipartFormEncoder, ParameterEncoding, boundary,
};

/// How a descriptor's parameters travel on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Parameters are appended to the URL query; no body is sent.
    Query,
    FormUrlEncoded,
    Json,
    MultipartFormData,
    /// Arbitrary `Content-Type` value with no default encoder.
    Custom(String),
}

impl ContentType {
    /// Value for the `Content-Type` header, if this content type sets one.
    #[must_use]
    pub fn header(&self) -> Option<String> {
        match self {
            ContentType::Query => None,
            ContentType::FormUrlEncoded => Some("application/x-www-form-urlencoded".to_owned()),
            ContentType::Json => Some("application/json".to_owned()),
            ContentType::MultipartFormData => {
                Some(format!("multipart/form-data; boundary={}", boundary()))
            }
            ContentType::Custom(value) => Some(value.clone()),
        }
    }

    /// Default body encoder for this content type.
    #[must_use]
    pub fn encoder(&self) -> Option<&'static dyn ParameterEncoding> {
        match self {
            ContentType::Json => Some(&JsonEncoder),
            ContentType::FormUrlEncoded => Some(&FormUrlEncoder),
            ContentType::MultipartFormData => Some(&MultipartFormEncoder),
            ContentType::Query | ContentType::Custom(_) => None,
        }
    }
}
