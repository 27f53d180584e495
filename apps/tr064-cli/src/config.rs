//! CLI configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tr064_core::protocol_constants::{DEFAULT_PORT, DEFAULT_TIMEOUT_MS};
use tr064_core::{DescriptionVariant, Tr064Config};

/// CLI configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Device hostname or IP address.
    /// Override: `TR064_HOST`
    pub host: String,

    /// Plain HTTP port of the TR-064 interface.
    /// Override: `TR064_PORT`
    pub port: u16,

    /// Login identity; the device default user when absent.
    /// Override: `TR064_USERNAME`
    pub username: Option<String>,

    /// Login secret. Prefer the environment over the config file.
    /// Override: `TR064_PASSWORD`
    pub password: Option<String>,

    /// Per-request timeout in milliseconds.
    /// Override: `TR064_TIMEOUT_MS`
    pub timeout_ms: u64,

    /// Root description to bootstrap from.
    pub variant: DescriptionVariant,

    /// Switch to HTTPS after discovery.
    pub tls: bool,

    /// PEM file of the certificate authority to pin for HTTPS.
    /// Override: `TR064_CA_PEM`
    pub ca_pem_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host: "fritz.box".to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            variant: DescriptionVariant::default(),
            tls: false,
            ca_pem_path: None,
        }
    }
}

impl CliConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TR064_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("TR064_PORT") {
            if let Ok(port) = val.parse() {
                self.port = port;
            }
        }

        if let Ok(val) = std::env::var("TR064_USERNAME") {
            self.username = Some(val);
        }

        if let Ok(val) = std::env::var("TR064_PASSWORD") {
            self.password = Some(val);
        }

        if let Ok(val) = std::env::var("TR064_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.timeout_ms = timeout;
            }
        }

        if let Ok(val) = std::env::var("TR064_CA_PEM") {
            self.ca_pem_path = Some(PathBuf::from(val));
        }
    }

    /// Reads the pinned CA certificate, if configured.
    pub fn load_ca(&self) -> Result<Option<String>> {
        self.ca_pem_path
            .as_deref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read CA file: {}", path.display()))
            })
            .transpose()
    }

    /// Converts to tr064-core's config type.
    pub fn to_core_config(&self) -> Tr064Config {
        Tr064Config {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}
