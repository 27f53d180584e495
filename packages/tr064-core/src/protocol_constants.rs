//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the TR-064 specification, the SOAP 1.1
//! envelope format and the vendor digest authentication scheme. Changing them
//! breaks interoperability with devices.

// ─────────────────────────────────────────────────────────────────────────────
// Description Documents
// ─────────────────────────────────────────────────────────────────────────────

/// Root description of the full TR-064 device tree.
pub const TR064_DESC_PATH: &str = "/tr64desc.xml";

/// Root description of the Internet Gateway Device subset.
pub const IGD_DESC_PATH: &str = "/igddesc.xml";

/// Root description of the personal message receiver subset.
pub const PMR_DESC_PATH: &str = "/pmr/PersonalMessageReceiver.xml";

// ─────────────────────────────────────────────────────────────────────────────
// HTTP/SOAP
// ─────────────────────────────────────────────────────────────────────────────

/// Default TR-064 control port (plain HTTP).
pub const DEFAULT_PORT: u16 = 49000;

/// Default timeout for a single HTTP exchange (milliseconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.1 encoding style.
pub const SOAP_ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Content type sent with every action request.
pub const SOAP_CONTENT_TYPE: &str = r#"text/xml; charset="utf-8""#;

// ─────────────────────────────────────────────────────────────────────────────
// Digest Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Namespace of the `InitChallenge`/`ClientAuth`/`Challenge` header elements.
pub const SOAP_AUTH_NS: &str = "http://soap-authentication.org/digest/2001/10/";

/// Realm assumed until the device announces its own.
pub const DEFAULT_REALM: &str = "F!Box SOAP-Auth";

/// Identity used when only a password is supplied.
pub const DEFAULT_USER: &str = "DefaultUser";

// ─────────────────────────────────────────────────────────────────────────────
// Well-known Services
// ─────────────────────────────────────────────────────────────────────────────

/// Service exposing `GetSecurityPort`.
pub const DEVICE_INFO_SERVICE: &str = "urn:dslforum-org:service:DeviceInfo:1";

/// Service exposing `ConfigurationStarted`/`ConfigurationFinished`.
pub const DEVICE_CONFIG_SERVICE: &str = "urn:dslforum-org:service:DeviceConfig:1";
