//! Centralized error types for the TR-064 client.
//!
//! Every failure path ends in a [`Tr064Error`]. Errors raised while invoking an
//! action carry the originating service type and action name so callers can
//! attribute them without extra bookkeeping.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::transport::TransportError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

// ─────────────────────────────────────────────────────────────────────────────
// Decode Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while decoding description, SCPD or SOAP documents.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document is XML but does not have the expected shape.
    #[error("unexpected document structure: {0}")]
    Structure(#[from] quick_xml::DeError),

    /// A character or entity reference could not be resolved.
    #[error("invalid escape sequence: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// A required element is absent.
    #[error("missing <{0}> element")]
    MissingElement(&'static str),
}

impl ErrorCode for DecodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Xml(_) => "xml_malformed",
            Self::Structure(_) => "xml_structure",
            Self::Escape(_) => "xml_escape",
            Self::MissingElement(_) => "xml_missing_element",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Faults
// ─────────────────────────────────────────────────────────────────────────────

/// A SOAP fault returned by the device for one action call.
///
/// `tr064_code`/`tr064` hold the vendor `UPnPError` detail, `fault_code`/
/// `fault_string` the generic SOAP fault fields. `status` is only set when the
/// fault arrived with a non-200 HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFault {
    pub service_type: String,
    pub action: String,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub fault_code: Option<String>,
    pub fault_string: Option<String>,
    pub tr064_code: Option<u32>,
    pub tr064: Option<String>,
}

impl fmt::Display for ActionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.service_type, self.action)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {status})")?;
        }
        match (self.tr064_code, self.tr064.as_deref()) {
            (Some(code), Some(description)) => write!(f, ": {code} {description}"),
            (Some(code), None) => write!(f, ": {code}"),
            (None, Some(description)) => write!(f, ": {description}"),
            (None, None) => write!(
                f,
                ": {}",
                self.fault_string.as_deref().unwrap_or("unknown fault")
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Application-wide error type for the TR-064 client.
#[derive(Debug, Error)]
pub enum Tr064Error {
    /// Fetching a description or SCPD document failed at the transport level.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An action request failed at the transport level.
    #[error("{service_type}#{action}: transport error: {source}")]
    ActionTransport {
        service_type: String,
        action: String,
        #[source]
        source: TransportError,
    },

    /// Non-200 response without a decodable SOAP fault.
    #[error("HTTP error {status} {status_text}")]
    HttpStatus {
        status: u16,
        status_text: String,
        service_type: Option<String>,
        action: Option<String>,
    },

    /// A root or SCPD document failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An action response envelope failed to decode.
    #[error("{service_type}#{action}: decode error: {source}")]
    ActionDecode {
        service_type: String,
        action: String,
        #[source]
        source: DecodeError,
    },

    /// The device answered with a SOAP fault.
    #[error("SOAP fault: {0}")]
    Fault(Box<ActionFault>),

    /// A second challenge arrived for the same action without progress.
    #[error("Credentials incorrect ({service_type}#{action})")]
    CredentialsIncorrect {
        service_type: String,
        action: String,
    },

    /// A well-known capability is missing or its action failed.
    #[error("{feature} is not supported for this device")]
    Unsupported { feature: &'static str },

    /// The device returned a security port that is not a number.
    #[error("Got bad port from device. Port: {0}")]
    BadPort(String),

    /// Unknown root description variant (configuration error).
    #[error("unknown description variant: {0}")]
    UnknownVariant(String),

    /// No service with this type was discovered.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// The service does not declare this action.
    #[error("action not found: {service_type}#{action}")]
    ActionNotFound {
        service_type: String,
        action: String,
    },

    /// The service does not register this state variable as evented.
    #[error("state variable not subscribable: {0}")]
    UnknownStateVariable(String),

    /// An input argument is not declared by the action.
    #[error("{action} has no input argument {argument}")]
    InvalidArgument { action: String, argument: String },
}

impl Tr064Error {
    /// Returns the SOAP fault detail if this error is a fault.
    #[must_use]
    pub fn fault(&self) -> Option<&ActionFault> {
        match self {
            Self::Fault(fault) => Some(fault.as_ref()),
            _ => None,
        }
    }

    /// Returns true if the device rejected the configured credentials.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::CredentialsIncorrect { .. })
    }
}

impl ErrorCode for Tr064Error {
    fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) | Self::ActionTransport { .. } => "transport_error",
            Self::HttpStatus { .. } => "http_error_status",
            Self::Decode(_) | Self::ActionDecode { .. } => "decode_error",
            Self::Fault(_) => "soap_fault",
            Self::CredentialsIncorrect { .. } => "credentials_incorrect",
            Self::Unsupported { .. } => "not_supported",
            Self::BadPort(_) => "bad_port",
            Self::UnknownVariant(_) => "unknown_variant",
            Self::ServiceNotFound(_) => "service_not_found",
            Self::ActionNotFound { .. } => "action_not_found",
            Self::UnknownStateVariable(_) => "unknown_state_variable",
            Self::InvalidArgument { .. } => "invalid_argument",
        }
    }
}

impl From<ActionFault> for Tr064Error {
    fn from(fault: ActionFault) -> Self {
        Self::Fault(Box::new(fault))
    }
}

/// Convenient Result alias for client operations.
pub type Tr064Result<T> = Result<T, Tr064Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn fault() -> ActionFault {
        ActionFault {
            service_type: "urn:dslforum-org:service:DeviceInfo:1".into(),
            action: "GetInfo".into(),
            status: None,
            status_text: None,
            fault_code: Some("s:Client".into()),
            fault_string: Some("UPnPError".into()),
            tr064_code: Some(401),
            tr064: Some("Invalid Action".into()),
        }
    }

    #[test]
    fn fault_display_names_origin_and_vendor_error() {
        let msg = Tr064Error::from(fault()).to_string();
        assert!(msg.contains("urn:dslforum-org:service:DeviceInfo:1#GetInfo"));
        assert!(msg.contains("401 Invalid Action"));
    }

    #[test]
    fn fault_display_falls_back_to_fault_string() {
        let mut f = fault();
        f.tr064_code = None;
        f.tr064 = None;
        f.status = Some(500);
        assert_eq!(
            f.to_string(),
            "urn:dslforum-org:service:DeviceInfo:1#GetInfo (HTTP 500): UPnPError"
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(Tr064Error::BadPort("x".into()).code(), "bad_port");
        assert_eq!(
            Tr064Error::Unsupported {
                feature: "Encryption"
            }
            .code(),
            "not_supported"
        );
        assert_eq!(
            DecodeError::MissingElement("Envelope").code(),
            "xml_missing_element"
        );
    }

    #[test]
    fn unsupported_message_is_reworded() {
        let err = Tr064Error::Unsupported {
            feature: "Encryption",
        };
        assert_eq!(
            err.to_string(),
            "Encryption is not supported for this device"
        );
    }
}
