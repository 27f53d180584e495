//! TR-064 Core - client runtime for TR-064 (SOAP/UPnP) network appliances.
//!
//! Given a device address, this crate discovers the device's service tree,
//! derives a callable action surface from the SCPD documents the device
//! serves, and executes digest-authenticated SOAP calls over HTTP or HTTPS.
//!
//! # Architecture
//!
//! - [`connector`]: Root description bootstrap, the entry point
//! - [`device`]: Discovery fan-out/fan-in, login, encryption, transactions
//! - [`service`]: SCPD-derived actions and the invocation protocol
//! - [`auth`]: Digest computation and challenge state
//! - [`envelope`]: SOAP request building and response decoding
//! - [`description`]: Device description and SCPD decoding
//! - [`transport`]: HTTP abstraction with a `reqwest` implementation
//! - [`error`]: Centralized error types
//!
//! # Example
//!
//! ```no_run
//! use tr064_core::{Connector, DescriptionVariant, Tr064Config};
//!
//! # async fn run() -> tr064_core::Tr064Result<()> {
//! let mut config = Tr064Config::new("fritz.box", 49000);
//! config.password = Some("secret".into());
//!
//! let device = Connector::new(config)?
//!     .init_device(DescriptionVariant::Tr064)
//!     .await?;
//! let info = device
//!     .call("urn:dslforum-org:service:DeviceInfo:1", "GetInfo", &[])
//!     .await?;
//! println!("{:?}", info.get("NewModelName"));
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod connector;
pub mod description;
pub mod device;
pub mod envelope;
pub mod error;
pub mod protocol_constants;
pub mod service;
mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at the crate root
pub use auth::compute_digest;
pub use config::Tr064Config;
pub use connector::{Connector, DescriptionVariant};
pub use device::{collect_service_descriptors, Device, DeviceMeta};
pub use error::{ActionFault, ErrorCode, Tr064Error, Tr064Result};
pub use service::{Action, ActionInfo, ActionOutput, Service, StateVariable};
pub use transport::{
    HttpRequest, HttpResponse, ReqwestTransport, TlsTrust, Transport, TransportError,
};
