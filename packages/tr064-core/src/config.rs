//! Client configuration consumed by the connector and every device session.
//!
//! Loading (files, environment, flags) is left to the embedding binary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{DEFAULT_PORT, DEFAULT_TIMEOUT_MS};

/// Connection settings for one TR-064 device.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Tr064Config {
    /// Hostname or IP address of the device.
    pub host: String,

    /// Plain HTTP port of the TR-064 interface.
    pub port: u16,

    /// Login identity. When absent, the default user identity is used.
    pub username: Option<String>,

    /// Login secret. When present, the connector logs in after discovery.
    pub password: Option<String>,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for Tr064Config {
    fn default() -> Self {
        Self {
            host: "fritz.box".to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Tr064Config {
    /// Creates a configuration for the given address with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns `http://{host}:{port}` for description and SCPD fetches.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// Manual impl so the secret never reaches logs.
impl std::fmt::Debug for Tr064Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tr064Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
