//! Malibu HTTP request pipeline
//!
//! Declarative request descriptors are built into wire-ready requests and
//! executed by a [`Networking`] engine through one of several strategies:
//!
//! - live requests through `reqwest`
//! - registered [`Mock`]s, either exclusively ([`Mode::Fake`]) or where
//!   available ([`Mode::Partial`])
//! - a caller-supplied [`BackgroundTask`]
//!
//! Responses carrying an `ETag` are remembered per request fingerprint and
//! replayed as `If-None-Match` on the next matching request.
//!
//! # Examples
//!
//! ## Live requests
//!
//! ```no_run
//! use malibu::{Networking, Request};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let networking = Networking::builder()
//!     .base_url("https://api.example.com")
//!     .build()?;
//! networking.authenticate_bearer("token");
//!
//! let users = networking
//!     .execute(Request::get("/users").parameter("page", json!(2)))
//!     .validate_status()
//!     .await?
//!     .to_json_array()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Mocks
//!
//! ```no_run
//! use malibu::{Mock, Mode, Networking, Request};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let networking = Networking::builder().mode(Mode::Fake).build()?;
//! networking.register_mock(Mock::from_json(Request::get("/users"), &json!([])));
//!
//! let wave = networking.execute(Request::get("/users")).await?;
//! assert_eq!(wave.to_json()?, json!([]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration from the environment
//!
//! ```no_run
//! use malibu::{Networking, NetworkingConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let networking = Networking::from_config(NetworkingConfig::from_env()?)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod encoding;
mod error;
pub mod header;
mod logging;
mod mock;
mod networking;
mod registry;
mod request;
mod response;
mod ride;
mod serialization;
mod storage;
mod task;
mod validation;

// Re-export public API
pub use config::{ENV_PREFIX, NetworkingConfig, SessionConfiguration, SessionKind};
pub use encoding::{
    Component, FormUrlEncoder, JsonEncoder, MultipartFormEncoder, ParameterEncoders,
    ParameterEncoding, QueryBuilder, boundary,
};
pub use error::{MalibuError, Result};
pub use logging::{
    ErrorLogger, ErrorLogging, LogLevel, Logger, RequestLogger, RequestLogging, ResponseLogger,
    ResponseLogging,
};
pub use mock::{MOCK_JSON_URL, Mock, MockRegistry};
pub use networking::{
    AdditionalHeaders, BeforeEach, Mode, Networking, NetworkingBuilder, PreProcessRequest,
};
pub use registry::NetworkingRegistry;
pub use request::{
    CachePolicy, ContentType, EtagPolicy, Headers, Message, Method, Parameters, RELATIVE_BASE,
    Request, TransportRequest,
};
pub use response::{HttpResponse, MOCK_JSON_CONTENT_TYPE, Wave};
pub use ride::Ride;
pub use serialization::{DataSerializer, JsonSerializer, Serializing, StringSerializer};
pub use storage::{ETagStore, FileStorage, KeyValueStore, MemoryStorage};
pub use task::{BackgroundTask, TaskCompletion};
pub use validation::{ContentTypeValidator, StatusCodeValidator, Validating};

// Re-export commonly used types from dependencies
pub use http::{HeaderMap, StatusCode};
