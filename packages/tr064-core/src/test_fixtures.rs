//! Shared test fixtures: a scripted transport and device documents.
//!
//! These are used by multiple test modules to avoid duplication.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::Tr064Config;
use crate::description::ServiceDescriptor;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

pub const BASE_URL: &str = "http://192.168.178.1:49000";

pub fn test_config() -> Tr064Config {
    Tr064Config::new("192.168.178.1", 49000)
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Replays queued responses per URL and records every request.
///
/// The last queued response for a URL is repeated for all further requests.
/// Requests to a URL without responses fail with a connection error.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.routes
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn reset_route(&self, url: &str) {
        self.routes.lock().remove(url);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().push(request);

        let mut routes = self.routes.lock();
        let queue = routes
            .get_mut(&url)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| TransportError::Connection(format!("no route to {url}")))?;
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap())
        } else {
            Ok(queue[0].clone())
        }
    }
}

pub fn ok(body: String) -> HttpResponse {
    status(200, "OK", body)
}

pub fn status(code: u16, text: &str, body: String) -> HttpResponse {
    HttpResponse {
        status: code,
        status_text: text.to_string(),
        body,
    }
}

/// Mock serving [`ROOT_DESCRIPTION`] and the SCPDs it references.
pub fn discovery_mock() -> Arc<MockTransport> {
    let mock = MockTransport::new();
    mock.respond(
        &format!("{BASE_URL}/tr64desc.xml"),
        ok(ROOT_DESCRIPTION.into()),
    );
    mock.respond(
        &format!("{BASE_URL}/deviceinfoSCPD.xml"),
        ok(DEVICE_INFO_SCPD.into()),
    );
    mock.respond(
        &format!("{BASE_URL}/deviceconfigSCPD.xml"),
        ok(DEVICE_CONFIG_SCPD.into()),
    );
    mock.respond(&format!("{BASE_URL}/hostsSCPD.xml"), ok(HOSTS_SCPD.into()));
    Arc::new(mock)
}

pub fn device_info_descriptor() -> ServiceDescriptor {
    ServiceDescriptor {
        service_type: "urn:dslforum-org:service:DeviceInfo:1".into(),
        service_id: "urn:DeviceInfo-com:serviceId:DeviceInfo1".into(),
        control_url: "/upnp/control/deviceinfo".into(),
        event_sub_url: "/upnp/control/deviceinfo".into(),
        scpd_url: "/deviceinfoSCPD.xml".into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Description Documents
// ─────────────────────────────────────────────────────────────────────────────

/// Root device with one service and one embedded device with two services.
pub const ROOT_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:dslforum-org:device-1-0">
  <specVersion>
    <major>1</major>
    <minor>0</minor>
  </specVersion>
  <device>
    <deviceType>urn:dslforum-org:device:InternetGatewayDevice:1</deviceType>
    <friendlyName>FRITZ!Box 7590</friendlyName>
    <manufacturer>AVM</manufacturer>
    <manufacturerURL>http://www.avm.de</manufacturerURL>
    <modelName>FRITZ!Box 7590</modelName>
    <UDN>uuid:75802409-bccb-40e7-8e6c-3431C4F24A39</UDN>
    <serviceList>
      <service>
        <serviceType>urn:dslforum-org:service:DeviceInfo:1</serviceType>
        <serviceId>urn:DeviceInfo-com:serviceId:DeviceInfo1</serviceId>
        <controlURL>/upnp/control/deviceinfo</controlURL>
        <eventSubURL>/upnp/control/deviceinfo</eventSubURL>
        <SCPDURL>/deviceinfoSCPD.xml</SCPDURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:dslforum-org:device:LANDevice:1</deviceType>
        <friendlyName>LANDevice - FRITZ!Box 7590</friendlyName>
        <manufacturer>AVM</manufacturer>
        <modelName>LANDevice - FRITZ!Box 7590</modelName>
        <UDN>uuid:76802409-bccb-40e7-8e6c-3431C4F24A39</UDN>
        <serviceList>
          <service>
            <serviceType>urn:dslforum-org:service:DeviceConfig:1</serviceType>
            <serviceId>urn:DeviceConfig-com:serviceId:DeviceConfig1</serviceId>
            <controlURL>/upnp/control/deviceconfig</controlURL>
            <eventSubURL>/upnp/control/deviceconfig</eventSubURL>
            <SCPDURL>/deviceconfigSCPD.xml</SCPDURL>
          </service>
          <service>
            <serviceType>urn:dslforum-org:service:Hosts:1</serviceType>
            <serviceId>urn:LanDeviceHosts-com:serviceId:Hosts1</serviceId>
            <controlURL>/upnp/control/hosts</controlURL>
            <eventSubURL>/upnp/control/hosts</eventSubURL>
            <SCPDURL>/hostsSCPD.xml</SCPDURL>
          </service>
        </serviceList>
      </device>
    </deviceList>
    <presentationURL>http://fritz.box</presentationURL>
  </device>
</root>"#;

/// Two embedded devices, the first with a grandchild.
pub const NESTED_LIST_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root>
  <device>
    <deviceType>urn:test:device:Root:1</deviceType>
    <serviceList>
      <service>
        <serviceType>urn:test:service:Root:1</serviceType>
        <controlURL>/upnp/control/root</controlURL>
        <SCPDURL>/rootSCPD.xml</SCPDURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:test:device:ChildA:1</deviceType>
        <serviceList>
          <service>
            <serviceType>urn:test:service:ChildA:1</serviceType>
            <controlURL>/upnp/control/childa</controlURL>
            <SCPDURL>/childaSCPD.xml</SCPDURL>
          </service>
        </serviceList>
        <deviceList>
          <device>
            <deviceType>urn:test:device:GrandChild:1</deviceType>
            <serviceList>
              <service>
                <serviceType>urn:test:service:GrandChild:1</serviceType>
                <controlURL>/upnp/control/grandchild</controlURL>
                <SCPDURL>/grandchildSCPD.xml</SCPDURL>
              </service>
            </serviceList>
          </device>
        </deviceList>
      </device>
      <device>
        <deviceType>urn:test:device:ChildB:1</deviceType>
        <serviceList>
          <service>
            <serviceType>urn:test:service:ChildB:1</serviceType>
            <controlURL>/upnp/control/childb</controlURL>
            <SCPDURL>/childbSCPD.xml</SCPDURL>
          </service>
        </serviceList>
      </device>
    </deviceList>
  </device>
</root>"#;

/// The same service type on the root device and on its embedded device.
pub const DUPLICATE_TYPE_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:dslforum-org:device-1-0">
  <device>
    <deviceType>urn:dslforum-org:device:InternetGatewayDevice:1</deviceType>
    <serviceList>
      <service>
        <serviceType>urn:dslforum-org:service:Hosts:1</serviceType>
        <controlURL>/upnp/control/hosts</controlURL>
        <SCPDURL>/hostsSCPD.xml</SCPDURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:dslforum-org:device:LANDevice:1</deviceType>
        <serviceList>
          <service>
            <serviceType>urn:dslforum-org:service:Hosts:1</serviceType>
            <controlURL>/upnp/control/lanhosts</controlURL>
            <SCPDURL>/lanhostsSCPD.xml</SCPDURL>
          </service>
        </serviceList>
      </device>
    </deviceList>
  </device>
</root>"#;

/// Message receiver subset; its SCPD lives under `/pmr`.
pub const PMR_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:dslforum-org:device-1-0">
  <device>
    <deviceType>urn:dslforum-org:device:PersonalMessageReceiver:1</deviceType>
    <friendlyName>FRITZ!Box 7590</friendlyName>
    <serviceList>
      <service>
        <serviceType>urn:dslforum-org:service:Hosts:1</serviceType>
        <serviceId>urn:LanDeviceHosts-com:serviceId:Hosts1</serviceId>
        <controlURL>/upnp/control/hosts</controlURL>
        <eventSubURL>/upnp/control/hosts</eventSubURL>
        <SCPDURL>/hostsSCPD.xml</SCPDURL>
      </service>
    </serviceList>
  </device>
</root>"#;

// ─────────────────────────────────────────────────────────────────────────────
// SCPD Documents
// ─────────────────────────────────────────────────────────────────────────────

pub const DEVICE_INFO_SCPD: &str = r#"<?xml version="1.0"?>
<scpd xmlns="urn:dslforum-org:service-1-0">
  <specVersion>
    <major>1</major>
    <minor>0</minor>
  </specVersion>
  <actionList>
    <action>
      <name>GetInfo</name>
      <argumentList>
        <argument>
          <name>NewManufacturerName</name>
          <direction>out</direction>
          <relatedStateVariable>ManufacturerName</relatedStateVariable>
        </argument>
        <argument>
          <name>NewModelName</name>
          <direction>out</direction>
          <relatedStateVariable>ModelName</relatedStateVariable>
        </argument>
        <argument>
          <name>NewSoftwareVersion</name>
          <direction>out</direction>
          <relatedStateVariable>SoftwareVersion</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
    <action>
      <name>GetSecurityPort</name>
      <argumentList>
        <argument>
          <name>NewSecurityPort</name>
          <direction>out</direction>
          <relatedStateVariable>SecurityPort</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
    <action>
      <name>SetProvisioningCode</name>
      <argumentList>
        <argument>
          <name>NewProvisioningCode</name>
          <direction>in</direction>
          <relatedStateVariable>ProvisioningCode</relatedStateVariable>
        </argument>
        <argument>
          <name>NewLegacyFlag</name>
          <relatedStateVariable>LegacyFlag</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
  </actionList>
  <serviceStateTable>
    <stateVariable sendEvents="no">
      <name>ManufacturerName</name>
      <dataType>string</dataType>
    </stateVariable>
    <stateVariable sendEvents="no">
      <name>ModelName</name>
      <dataType>string</dataType>
    </stateVariable>
    <stateVariable sendEvents="yes">
      <name>SoftwareVersion</name>
      <dataType>string</dataType>
      <defaultValue>0.0</defaultValue>
    </stateVariable>
    <stateVariable sendEvents="no">
      <name>SecurityPort</name>
      <dataType>ui2</dataType>
    </stateVariable>
    <stateVariable sendEvents="no">
      <name>ProvisioningCode</name>
      <dataType>string</dataType>
    </stateVariable>
    <stateVariable sendEvents="no">
      <name>LegacyFlag</name>
      <dataType>boolean</dataType>
    </stateVariable>
  </serviceStateTable>
</scpd>"#;

pub const DEVICE_CONFIG_SCPD: &str = r#"<?xml version="1.0"?>
<scpd xmlns="urn:dslforum-org:service-1-0">
  <actionList>
    <action>
      <name>ConfigurationStarted</name>
      <argumentList>
        <argument>
          <name>NewSessionID</name>
          <direction>in</direction>
          <relatedStateVariable>X_AVM-DE_SessionID</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
    <action>
      <name>ConfigurationFinished</name>
      <argumentList>
        <argument>
          <name>NewStatus</name>
          <direction>out</direction>
          <relatedStateVariable>A_ARG_TYPE_Status</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
  </actionList>
  <serviceStateTable>
    <stateVariable sendEvents="no">
      <name>X_AVM-DE_SessionID</name>
      <dataType>string</dataType>
    </stateVariable>
    <stateVariable sendEvents="no">
      <name>A_ARG_TYPE_Status</name>
      <dataType>string</dataType>
    </stateVariable>
  </serviceStateTable>
</scpd>"#;

/// A single action with a single argument (no list nesting).
pub const HOSTS_SCPD: &str = r#"<?xml version="1.0"?>
<scpd xmlns="urn:dslforum-org:service-1-0">
  <actionList>
    <action>
      <name>GetHostNumberOfEntries</name>
      <argumentList>
        <argument>
          <name>NewHostNumberOfEntries</name>
          <direction>out</direction>
          <relatedStateVariable>HostNumberOfEntries</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
  </actionList>
  <serviceStateTable>
    <stateVariable sendEvents="no">
      <name>HostNumberOfEntries</name>
      <dataType>ui2</dataType>
    </stateVariable>
  </serviceStateTable>
</scpd>"#;

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Responses
// ─────────────────────────────────────────────────────────────────────────────

/// `{action}Response` envelope. Values are inserted verbatim (pre-escaped).
pub fn response_envelope(
    service_type: &str,
    action: &str,
    values: &[(&str, &str)],
    header: Option<&str>,
) -> String {
    let values: String = values
        .iter()
        .map(|(name, value)| format!("      <{name}>{value}</{name}>\n"))
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  {header}<s:Body>
    <u:{action}Response xmlns:u="{service_type}">
{values}    </u:{action}Response>
  </s:Body>
</s:Envelope>"#,
        header = header.unwrap_or_default(),
    )
}

pub fn challenge_header(nonce: &str, realm: &str) -> String {
    format!(
        r#"<s:Header><h:Challenge xmlns:h="http://soap-authentication.org/digest/2001/10/" s:mustUnderstand="1"><Status>Unauthenticated</Status><Nonce>{nonce}</Nonce><Realm>{realm}</Realm></h:Challenge></s:Header>"#
    )
}

pub fn next_challenge_header(nonce: &str, realm: &str) -> String {
    format!(
        r#"<s:Header><h:NextChallenge xmlns:h="http://soap-authentication.org/digest/2001/10/" s:mustUnderstand="1"><Status>Authenticated</Status><Nonce>{nonce}</Nonce><Realm>{realm}</Realm></h:NextChallenge></s:Header>"#
    )
}

pub fn fault_envelope(code: &str, description: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail>
        <UPnPError xmlns="urn:dslforum-org:control-1-0">
          <errorCode>{code}</errorCode>
          <errorDescription>{description}</errorDescription>
        </UPnPError>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#
    )
}
