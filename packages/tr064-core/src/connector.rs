//! Entry point: fetches a root description and builds a ready [`Device`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Tr064Config;
use crate::description::parse_root_description;
use crate::device::Device;
use crate::error::{Tr064Error, Tr064Result};
use crate::protocol_constants::{IGD_DESC_PATH, PMR_DESC_PATH, TR064_DESC_PATH};
use crate::transport::{HttpRequest, ReqwestTransport, Transport};

/// Which root description document to bootstrap from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionVariant {
    /// Full TR-064 device tree.
    #[default]
    Tr064,
    /// Internet Gateway Device subset.
    Igd,
    /// Personal message receiver subset.
    Pmr,
}

impl DescriptionVariant {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Tr064 => TR064_DESC_PATH,
            Self::Igd => IGD_DESC_PATH,
            Self::Pmr => PMR_DESC_PATH,
        }
    }
}

impl FromStr for DescriptionVariant {
    type Err = Tr064Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tr064" => Ok(Self::Tr064),
            "igd" => Ok(Self::Igd),
            "pmr" => Ok(Self::Pmr),
            _ => Err(Tr064Error::UnknownVariant(s.to_string())),
        }
    }
}

impl fmt::Display for DescriptionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tr064 => "tr064",
            Self::Igd => "igd",
            Self::Pmr => "pmr",
        })
    }
}

/// Path of `path` up to, not including, its last segment.
fn url_part_of(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Connects to one device address.
pub struct Connector {
    config: Tr064Config,
    transport: Arc<dyn Transport>,
}

impl Connector {
    /// Creates a connector backed by [`ReqwestTransport`].
    ///
    /// # Errors
    /// Returns `Transport` if the HTTP client cannot be built.
    pub fn new(config: Tr064Config) -> Tr064Result<Self> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    #[must_use]
    pub fn with_transport(config: Tr064Config, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &Tr064Config {
        &self.config
    }

    #[must_use]
    pub fn description_url(&self, variant: DescriptionVariant) -> String {
        format!("{}{}", self.config.base_url(), variant.path())
    }

    /// Fetches the root description for `variant` and discovers the device.
    ///
    /// When the configuration carries a password the device is logged in
    /// before it is returned.
    ///
    /// # Errors
    /// Transport, HTTP status and decode errors of the root description or of
    /// any SCPD.
    pub async fn init_device(&self, variant: DescriptionVariant) -> Tr064Result<Device> {
        let url = self.description_url(variant);
        log::info!("[Connector] Fetching {variant} description from {url}");

        let response = self
            .transport
            .execute(HttpRequest::get(&url, self.config.timeout()))
            .await?;
        if !response.is_ok() {
            return Err(Tr064Error::HttpStatus {
                status: response.status,
                status_text: response.status_text,
                service_type: None,
                action: None,
            });
        }

        let root = parse_root_description(&response.body)?;
        let url_part = url_part_of(variant.path()).to_string();
        let device =
            Device::discover(root, url_part, &self.config, Arc::clone(&self.transport)).await?;

        if let Some(password) = &self.config.password {
            match &self.config.username {
                Some(user) => device.login_as(user.as_str(), password.as_str()),
                None => device.login(password.as_str()),
            }
        }

        Ok(device)
    }
}
