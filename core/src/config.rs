//! Session configuration.
//!
//! # Design
//! Every knob that only changes header values or timeouts lives here as a
//! plain field, so a session can be built from a JSON document as easily as
//! from code. Missing JSON fields take the defaults below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HttpClientError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (MSIE 9.0; Windows NT 6.1; Trident/5.0)";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN";
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Basic-auth credentials sent as `Authorization: BASIC ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Tunables for one `HttpClient` session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Seconds allowed for connecting and for every blocking read or write.
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    /// Send `Accept-encoding: gzip`.
    pub use_gzip: bool,
    /// Send `Connection: Keep-Alive` on POST requests.
    pub keep_alive: bool,
    /// When false, send `Cache-Control: no-cache`.
    pub use_cache: bool,
    /// Overrides the referer derived from the session host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    /// Redirect hops followed before giving up.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            use_gzip: true,
            keep_alive: true,
            use_cache: false,
            referer: None,
            credentials: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON document; absent fields keep their defaults and the
    /// timeout is raised to at least one second.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: ClientConfig =
            serde_json::from_str(raw).map_err(|e| HttpClientError::Config(e.to_string()))?;
        config.timeout_secs = config.timeout_secs.max(1);
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
