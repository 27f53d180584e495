//! Device description and SCPD decoding.
//!
//! Both documents are decoded with `quick-xml`'s serde support. Every list in
//! the documents (`deviceList`, `serviceList`, `actionList`, `argumentList`,
//! `serviceStateTable`) decodes into a `Vec`, so a single child and a repeated
//! child produce the same ordered shape and the rest of the crate never deals
//! with the difference.

use serde::Deserialize;

use crate::error::DecodeError;

// ─────────────────────────────────────────────────────────────────────────────
// Device Description
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RootDescription {
    device: DeviceNode,
}

/// One `<device>` node of a description document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceNode {
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(rename = "UDN", default)]
    pub udn: String,
    #[serde(default)]
    pub service_list: ServiceList,
    #[serde(default)]
    pub device_list: DeviceList,
}

/// `<serviceList>`: the services declared directly on a device node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceList {
    #[serde(rename = "service", default)]
    pub services: Vec<ServiceDescriptor>,
}

/// `<deviceList>`: embedded child devices.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceNode>,
}

/// One `<service>` entry of a description document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(rename = "serviceType")]
    pub service_type: String,
    #[serde(rename = "serviceId", default)]
    pub service_id: String,
    #[serde(rename = "controlURL")]
    pub control_url: String,
    #[serde(rename = "eventSubURL", default)]
    pub event_sub_url: String,
    #[serde(rename = "SCPDURL")]
    pub scpd_url: String,
}

/// Decodes a root description document and returns its top-level device.
pub fn parse_root_description(xml: &str) -> Result<DeviceNode, DecodeError> {
    let root: RootDescription = quick_xml::de::from_str(xml)?;
    Ok(root.device)
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Control Protocol Description
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded SCPD document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scpd {
    #[serde(default)]
    pub action_list: ActionList,
    #[serde(default)]
    pub service_state_table: ServiceStateTable,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionList {
    #[serde(rename = "action", default)]
    pub actions: Vec<ActionNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionNode {
    pub name: String,
    #[serde(rename = "argumentList", default)]
    pub argument_list: ArgumentList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArgumentList {
    #[serde(rename = "argument", default)]
    pub arguments: Vec<ArgumentNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArgumentNode {
    pub name: String,
    #[serde(default)]
    pub direction: String,
    #[serde(rename = "relatedStateVariable", default)]
    pub related_state_variable: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceStateTable {
    #[serde(rename = "stateVariable", default)]
    pub variables: Vec<StateVariableNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateVariableNode {
    #[serde(rename = "@sendEvents", default)]
    pub send_events: String,
    pub name: String,
    #[serde(rename = "dataType", default)]
    pub data_type: String,
    #[serde(rename = "defaultValue", default)]
    pub default_value: Option<String>,
}

impl StateVariableNode {
    /// True when the schema flags the variable as event-capable.
    #[must_use]
    pub fn is_evented(&self) -> bool {
        self.send_events.trim().eq_ignore_ascii_case("yes")
    }
}

/// Decodes an SCPD document.
pub fn parse_scpd(xml: &str) -> Result<Scpd, DecodeError> {
    Ok(quick_xml::de::from_str(xml)?)
}
