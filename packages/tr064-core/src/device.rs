//! Device discovery and device-wide session operations.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::Tr064Config;
use crate::description::{DeviceNode, ServiceDescriptor};
use crate::error::{Tr064Error, Tr064Result};
use crate::protocol_constants::{DEVICE_CONFIG_SERVICE, DEVICE_INFO_SERVICE};
use crate::service::{ActionOutput, Service};
use crate::session::DeviceSession;
use crate::transport::Transport;

/// Immutable description of a discovered device.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMeta {
    pub host: String,
    pub port: u16,
    /// Path prefix of the root description, prepended to SCPD URLs.
    pub url_part: String,
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub model_name: String,
    pub udn: String,
    /// Service types in the order their SCPDs finished loading.
    pub services_info: Vec<String>,
}

/// A TR-064 device with its fully loaded service registry.
pub struct Device {
    meta: DeviceMeta,
    session: Arc<DeviceSession>,
    services: HashMap<String, Service>,
    transaction: Mutex<Option<String>>,
}

/// Flattens the service entries of `root` and all embedded devices.
///
/// Depth-first pre-order: a device's own services come before those of its
/// children, and siblings keep document order.
#[must_use]
pub fn collect_service_descriptors(root: &DeviceNode) -> Vec<ServiceDescriptor> {
    let mut out = Vec::new();
    collect_into(root, &mut out);
    out
}

fn collect_into(node: &DeviceNode, out: &mut Vec<ServiceDescriptor>) {
    out.extend(node.service_list.services.iter().cloned());
    for child in &node.device_list.devices {
        collect_into(child, out);
    }
}

impl Device {
    /// Loads every service of `root` concurrently and returns the ready device.
    ///
    /// The first failing SCPD load fails the whole discovery; the remaining
    /// loads are dropped.
    pub async fn discover(
        root: DeviceNode,
        url_part: String,
        config: &Tr064Config,
        transport: Arc<dyn Transport>,
    ) -> Tr064Result<Self> {
        let session = Arc::new(DeviceSession::new(config, transport));
        let descriptors = collect_service_descriptors(&root);
        log::info!(
            "[Device] Discovering {} services on {}:{}",
            descriptors.len(),
            config.host,
            config.port
        );

        let mut services = HashMap::with_capacity(descriptors.len());
        let mut services_info = Vec::with_capacity(descriptors.len());
        {
            let mut pending: FuturesUnordered<_> = descriptors
                .into_iter()
                .map(|descriptor| Service::load(Arc::clone(&session), descriptor, &url_part))
                .collect();

            while let Some(loaded) = pending.next().await {
                let service = loaded?;
                let service_type = service.service_type().to_string();
                services_info.push(service_type.clone());
                if services.insert(service_type.clone(), service).is_some() {
                    log::warn!(
                        "[Device] Duplicate service type {service_type}, keeping the later one"
                    );
                }
            }
        }

        log::info!(
            "[Device] {} ready with {} services",
            root.friendly_name,
            services.len()
        );

        Ok(Self {
            meta: DeviceMeta {
                host: config.host.clone(),
                port: config.port,
                url_part,
                device_type: root.device_type,
                friendly_name: root.friendly_name,
                manufacturer: root.manufacturer,
                model_name: root.model_name,
                udn: root.udn,
                services_info,
            },
            session,
            services,
            transaction: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    #[must_use]
    pub fn services_info(&self) -> &[String] {
        &self.meta.services_info
    }

    #[must_use]
    pub fn service(&self, service_type: &str) -> Option<&Service> {
        self.services.get(service_type)
    }

    /// All services, sorted by service type.
    #[must_use]
    pub fn services(&self) -> Vec<&Service> {
        let mut services: Vec<_> = self.services.values().collect();
        services.sort_by(|a, b| a.service_type().cmp(b.service_type()));
        services
    }

    /// Invokes `service_type#action`.
    ///
    /// # Errors
    /// `ServiceNotFound` if no such service was discovered; otherwise as
    /// [`Service::call`].
    pub async fn call(
        &self,
        service_type: &str,
        action: &str,
        args: &[(&str, &str)],
    ) -> Tr064Result<ActionOutput> {
        self.service(service_type)
            .ok_or_else(|| Tr064Error::ServiceNotFound(service_type.to_string()))?
            .call(action, args)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credentials
    // ─────────────────────────────────────────────────────────────────────────

    /// Logs in as the default user. Nothing is sent until the next call.
    pub fn login(&self, password: impl Into<String>) {
        self.set_credentials(None, password.into());
    }

    /// Logs in as `user`. Nothing is sent until the next call.
    pub fn login_as(&self, user: impl Into<String>, password: impl Into<String>) {
        self.set_credentials(Some(user.into()), password.into());
    }

    fn set_credentials(&self, user: Option<String>, password: String) {
        let mut auth = self.session.auth.lock();
        auth.login(user, password);
        log::info!(
            "[Auth] Credentials set for {}",
            auth.uid().unwrap_or_default()
        );
        drop(auth);
        self.session.attempts.clear();
    }

    /// Identity used for authenticated calls, if logged in.
    #[must_use]
    pub fn user(&self) -> Option<String> {
        self.session.auth.lock().uid().map(str::to_string)
    }

    pub fn logout(&self) {
        self.session.auth.lock().logout();
        log::info!("[Auth] Logged out");
    }

    /// Pins a PEM certificate authority for HTTPS calls. `None` accepts any
    /// certificate.
    pub fn set_ca(&self, pem: Option<String>) {
        self.session.auth.lock().set_ca_pem(pem);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Encryption
    // ─────────────────────────────────────────────────────────────────────────

    /// Switches subsequent action calls to HTTPS on the device's security port.
    ///
    /// # Errors
    /// - `Unsupported` if the device-info service is absent or the call fails
    /// - `BadPort` if the returned port is not a valid port number
    pub async fn start_encrypted_communication(&self) -> Tr064Result<u16> {
        const FEATURE: &str = "Encryption";

        let service = self
            .service(DEVICE_INFO_SERVICE)
            .ok_or(Tr064Error::Unsupported { feature: FEATURE })?;
        let out = service.call("GetSecurityPort", &[]).await.map_err(|e| {
            log::warn!("[Device] GetSecurityPort failed: {e}");
            Tr064Error::Unsupported { feature: FEATURE }
        })?;

        let raw = out.get("NewSecurityPort").cloned().unwrap_or_default();
        let port = raw
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| Tr064Error::BadPort(raw.clone()))?;

        self.session.set_ssl_port(Some(port));
        log::info!("[Device] Encrypted communication on port {port}");
        Ok(port)
    }

    /// Reverts to plain HTTP. The device is not contacted.
    pub fn stop_encrypted_communication(&self) {
        self.session.set_ssl_port(None);
        log::info!("[Device] Encrypted communication stopped");
    }

    #[must_use]
    pub fn ssl_port(&self) -> Option<u16> {
        self.session.ssl_port()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a configuration transaction and returns its session id.
    ///
    /// # Errors
    /// `Unsupported` if the device-config service is absent or refuses.
    pub async fn start_transaction(&self) -> Tr064Result<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        self.device_config_call("ConfigurationStarted", &[("NewSessionID", &session_id)])
            .await?;
        log::info!("[Device] Transaction {session_id} started");
        *self.transaction.lock() = Some(session_id.clone());
        Ok(session_id)
    }

    /// Commits the open configuration transaction.
    ///
    /// # Errors
    /// `Unsupported` if the device-config service is absent or refuses.
    pub async fn stop_transaction(&self) -> Tr064Result<()> {
        self.device_config_call("ConfigurationFinished", &[]).await?;
        if let Some(id) = self.transaction.lock().take() {
            log::info!("[Device] Transaction {id} finished");
        }
        Ok(())
    }

    async fn device_config_call(&self, action: &str, args: &[(&str, &str)]) -> Tr064Result<()> {
        const FEATURE: &str = "Transactions";

        let service = self
            .service(DEVICE_CONFIG_SERVICE)
            .ok_or(Tr064Error::Unsupported { feature: FEATURE })?;
        service.call(action, args).await.map_err(|e| {
            log::warn!("[Device] {action} failed: {e}");
            Tr064Error::Unsupported { feature: FEATURE }
        })?;
        Ok(())
    }

    #[must_use]
    pub fn is_transaction(&self) -> bool {
        self.transaction.lock().is_some()
    }

    #[must_use]
    pub fn transaction_id(&self) -> Option<String> {
        self.transaction.lock().clone()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("meta", &self.meta)
            .field("ssl_port", &self.ssl_port())
            .field("transaction", &self.is_transaction())
            .finish_non_exhaustive()
    }
}
