//! Engine configuration and HTTP session setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::header;
use crate::logging::LogLevel;
use crate::networking::Mode;

/// Prefix of the environment variables read by [`NetworkingConfig::from_env`].
pub const ENV_PREFIX: &str = "MALIBU_";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const BACKGROUND_KEEPALIVE: Duration = Duration::from_secs(60);

/// Serializable engine configuration.
///
/// Every field can be set from the environment, e.g. `MALIBU_BASE_URL`,
/// `MALIBU_MODE=fake`, `MALIBU_TIMEOUT_SECS=5`, `MALIBU_LOG_LEVEL=verbose`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkingConfig {
    pub base_url: Option<String>,
    pub mode: Mode,
    pub session: SessionKind,
    pub timeout_secs: u64,
    pub log_level: LogLevel,
    /// Directory of the file-backed `ETag` store; the platform data directory
    /// is used when unset.
    pub storage_dir: Option<PathBuf>,
}

impl Default for NetworkingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            mode: Mode::default(),
            session: SessionKind::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_level: LogLevel::default(),
            storage_dir: None,
        }
    }
}

impl NetworkingConfig {
    /// Defaults overlaid with `MALIBU_*` environment variables.
    ///
    /// # Errors
    /// Returns `MalibuError::Configuration` if a variable has the wrong type.
    pub fn from_env() -> Result<Self> {
        Self::extract(Self::defaults().merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Defaults overlaid with a YAML file, then with the environment.
    ///
    /// # Errors
    /// Returns `MalibuError::Configuration` if the file is malformed or a
    /// value has the wrong type.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::extract(
            Self::defaults()
                .merge(Yaml::file(path.as_ref()))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    fn extract(figment: Figment) -> Result<Self> {
        Ok(figment.extract()?)
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Session flavour selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Default,
    Ephemeral,
    Background,
}

/// How the live strategy's `reqwest::Client` is built.
#[derive(Debug, Clone, Default)]
pub enum SessionConfiguration {
    #[default]
    Default,
    /// No idle connections are kept between requests.
    Ephemeral,
    /// No overall timeout; TCP keep-alive enabled for long transfers.
    Background,
    /// Caller-built client, used as-is.
    Custom(reqwest::Client),
}

impl From<SessionKind> for SessionConfiguration {
    fn from(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Default => SessionConfiguration::Default,
            SessionKind::Ephemeral => SessionConfiguration::Ephemeral,
            SessionKind::Background => SessionConfiguration::Background,
        }
    }
}

impl SessionConfiguration {
    /// Build the client with the `malibu/<version>` user agent.
    ///
    /// # Errors
    /// Returns `MalibuError::Transport` if the TLS backend fails to
    /// initialize.
    pub fn build_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        let builder = reqwest::Client::builder().user_agent(header::user_agent());
        let builder = match self {
            SessionConfiguration::Custom(client) => return Ok(client.clone()),
            SessionConfiguration::Default => builder.timeout(timeout),
            SessionConfiguration::Ephemeral => builder.timeout(timeout).pool_max_idle_per_host(0),
            SessionConfiguration::Background => builder.tcp_keepalive(BACKGROUND_KEEPALIVE),
        };
        Ok(builder.build()?)
    }
}
