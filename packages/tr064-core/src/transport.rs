//! HTTP transport abstraction.
//!
//! The protocol layers only ever talk to a [`Transport`]: description and SCPD
//! fetches are plain GETs, action invocations are POSTs that may be elevated to
//! HTTPS. [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Certificate, Client};
use thiserror::Error;

use crate::error::ErrorCode;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while exchanging a request with the device.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request to the device failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device did not answer within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The pinned certificate authority could not be loaded.
    #[error("invalid CA certificate: {0}")]
    InvalidCertificate(String),

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::Timeout(_) => "http_timeout",
            Self::InvalidCertificate(_) => "invalid_certificate",
            Self::Connection(_) => "connection_failed",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method used by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Certificate trust for HTTPS requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsTrust {
    /// Trust only the given PEM-encoded certificate authority.
    PinnedCa(String),
    /// Accept any certificate (devices ship self-signed ones).
    AcceptInvalidCerts,
}

/// A single HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
    /// `Some` for HTTPS requests.
    pub tls: Option<TlsTrust>,
}

impl HttpRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout,
            tls: None,
        }
    }

    /// Creates a POST request carrying `body`.
    #[must_use]
    pub fn post(url: impl Into<String>, body: String, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
            timeout,
            tls: None,
        }
    }

    /// Adds a header. Headers are sent in insertion order.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Sets the certificate trust used for HTTPS.
    #[must_use]
    pub fn tls(mut self, trust: Option<TlsTrust>) -> Self {
        self.tls = trust;
        self
    }

    /// Returns the value of the first header with the given name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    /// Only 200 counts as success for TR-064.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Performs HTTP exchanges on behalf of the protocol layers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the status and raw body.
    ///
    /// Non-success statuses are NOT errors at this level; callers inspect the
    /// body for SOAP faults first.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// reqwest Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// [`Transport`] backed by `reqwest`.
///
/// Plain requests share one client. HTTPS requests use a second client built
/// for the requested [`TlsTrust`] and cached until the trust changes.
pub struct ReqwestTransport {
    plain: Client,
    tls: Mutex<Option<(TlsTrust, Client)>>,
}

impl ReqwestTransport {
    /// Creates a transport with default client settings.
    ///
    /// # Errors
    /// Returns `TransportError::Http` if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            plain: Client::builder().build()?,
            tls: Mutex::new(None),
        })
    }

    fn client_for(&self, trust: Option<&TlsTrust>) -> Result<Client, TransportError> {
        let Some(trust) = trust else {
            return Ok(self.plain.clone());
        };

        let mut cached = self.tls.lock();
        if let Some((cached_trust, client)) = cached.as_ref() {
            if cached_trust == trust {
                return Ok(client.clone());
            }
        }

        let builder = Client::builder();
        let builder = match trust {
            TlsTrust::PinnedCa(pem) => {
                let cert = Certificate::from_pem(pem.as_bytes())
                    .map_err(|e| TransportError::InvalidCertificate(e.to_string()))?;
                builder.add_root_certificate(cert)
            }
            TlsTrust::AcceptInvalidCerts => builder.danger_accept_invalid_certs(true),
        };
        let client = builder.build()?;
        log::debug!("[HTTP] Built TLS client ({})", trust_kind(trust));
        *cached = Some((trust.clone(), client.clone()));
        Ok(client)
    }
}

fn trust_kind(trust: &TlsTrust) -> &'static str {
    match trust {
        TlsTrust::PinnedCa(_) => "pinned CA",
        TlsTrust::AcceptInvalidCerts => "accept invalid certs",
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client_for(request.tls.as_ref())?;

        let mut builder = match request.method {
            HttpMethod::Get => client.get(&request.url),
            HttpMethod::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let timeout = request.timeout;
        let res = builder.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = res.status();
        let body = res.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_keeps_header_order() {
        let req = HttpRequest::post("http://h:1/c", "<x/>".into(), Duration::from_secs(1))
            .header("SoapAction", "urn:x#Y")
            .header("Content-Type", "text/xml");
        assert_eq!(req.headers[0].0, "SoapAction");
        assert_eq!(req.headers[1].0, "Content-Type");
        assert_eq!(req.header_value("soapaction"), Some("urn:x#Y"));
        assert!(req.tls.is_none());
    }

    #[test]
    fn only_200_is_ok() {
        let ok = HttpResponse {
            status: 200,
            status_text: "OK".into(),
            body: String::new(),
        };
        let created = HttpResponse {
            status: 201,
            ..ok.clone()
        };
        assert!(ok.is_ok());
        assert!(!created.is_ok());
    }
}
