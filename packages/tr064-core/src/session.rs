//! Per-device session shared by the device and all of its services.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::auth::{AttemptLog, AuthState};
use crate::config::Tr064Config;
use crate::envelope::AuthHeader;
use crate::transport::{TlsTrust, Transport};

/// State every service of one device reads and mutates.
///
/// Locks are never held across an `.await`; callers take a snapshot (header,
/// endpoint) and release before sending.
pub(crate) struct DeviceSession {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) timeout: Duration,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) auth: Mutex<AuthState>,
    pub(crate) attempts: AttemptLog,
    ssl_port: RwLock<Option<u16>>,
}

impl DeviceSession {
    pub(crate) fn new(config: &Tr064Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            timeout: config.timeout(),
            transport,
            auth: Mutex::new(AuthState::new()),
            attempts: AttemptLog::new(),
            ssl_port: RwLock::new(None),
        }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub(crate) fn auth_header(&self) -> Option<AuthHeader> {
        self.auth.lock().header()
    }

    pub(crate) fn ssl_port(&self) -> Option<u16> {
        *self.ssl_port.read()
    }

    pub(crate) fn set_ssl_port(&self, port: Option<u16>) {
        *self.ssl_port.write() = port;
    }

    /// URL and certificate trust for an action POST.
    ///
    /// Goes to `https://host:ssl_port` once encryption is active; a pinned CA
    /// is used when set, otherwise any certificate is accepted.
    pub(crate) fn control_endpoint(&self, control_url: &str) -> (String, Option<TlsTrust>) {
        match self.ssl_port() {
            Some(ssl_port) => {
                let trust = match self.auth.lock().ca_pem() {
                    Some(pem) => TlsTrust::PinnedCa(pem.to_string()),
                    None => TlsTrust::AcceptInvalidCerts,
                };
                (
                    format!("https://{}:{}{}", self.host, ssl_port, control_url),
                    Some(trust),
                )
            }
            None => (format!("{}{}", self.base_url(), control_url), None),
        }
    }
}
