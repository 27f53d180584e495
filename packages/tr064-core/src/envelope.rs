//! SOAP envelope construction and response decoding.
//!
//! Requests are built as a single line with no leading whitespace; some device
//! SOAP stacks reject XML with anything before the root element. Responses are
//! read with the streaming `quick-xml` reader and matched on local names, so
//! namespace prefixes (`s:`, `soap:`, `u:`, `h:`) do not matter.

use std::collections::HashMap;

use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::DecodeError;
use crate::protocol_constants::{SOAP_AUTH_NS, SOAP_ENCODING_NS, SOAP_ENVELOPE_NS};

// ─────────────────────────────────────────────────────────────────────────────
// Request Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication header embedded in a request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthHeader {
    /// No digest yet: solicit a nonce from the device.
    InitChallenge { user_id: String, realm: String },
    /// Digest computed from the last nonce.
    ClientAuth {
        nonce: String,
        auth: String,
        user_id: String,
        realm: String,
    },
}

impl AuthHeader {
    fn write_to(&self, out: &mut String) {
        match self {
            Self::InitChallenge { user_id, realm } => {
                out.push_str(&format!(
                    r#"<s:Header><h:InitChallenge xmlns:h="{SOAP_AUTH_NS}" s:mustUnderstand="1"><UserID>{}</UserID><Realm>{}</Realm></h:InitChallenge></s:Header>"#,
                    escape(user_id.as_str()),
                    escape(realm.as_str()),
                ));
            }
            Self::ClientAuth {
                nonce,
                auth,
                user_id,
                realm,
            } => {
                out.push_str(&format!(
                    r#"<s:Header><h:ClientAuth xmlns:h="{SOAP_AUTH_NS}" s:mustUnderstand="1"><Nonce>{}</Nonce><Auth>{}</Auth><UserID>{}</UserID><Realm>{}</Realm></h:ClientAuth></s:Header>"#,
                    escape(nonce.as_str()),
                    escape(auth.as_str()),
                    escape(user_id.as_str()),
                    escape(realm.as_str()),
                ));
            }
        }
    }
}

/// Builds the request envelope for `service_type#action`.
///
/// `args` become one child element each, in the given order, with their values
/// XML-escaped.
#[must_use]
pub fn build_envelope(
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
    header: Option<&AuthHeader>,
) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope s:encodingStyle="{SOAP_ENCODING_NS}" xmlns:s="{SOAP_ENVELOPE_NS}">"#
    );

    if let Some(header) = header {
        header.write_to(&mut body);
    }

    body.push_str(&format!(
        r#"<s:Body><u:{action} xmlns:u="{service_type}">"#
    ));
    for (name, value) in args {
        body.push_str(&format!("<{name}>{}</{name}>", escape(*value)));
    }
    body.push_str(&format!("</u:{action}></s:Body></s:Envelope>"));
    body
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Which authentication header the device sent back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    /// Authentication required (or the digest was rejected): retry with a
    /// digest over the enclosed nonce.
    Challenge,
    /// The call was authenticated; use the enclosed nonce for the next one.
    NextChallenge,
}

/// Nonce/realm pair announced by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerChallenge {
    pub kind: ChallengeKind,
    pub nonce: String,
    pub realm: String,
    pub status: Option<String>,
}

/// Generic SOAP fault fields plus the vendor `UPnPError` detail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapFault {
    pub fault_code: Option<String>,
    pub fault_string: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
}

/// Decoded response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub challenge: Option<ServerChallenge>,
    /// Children of `<{action}Response>` by element name, if present.
    pub response: Option<HashMap<String, String>>,
    pub fault: Option<SoapFault>,
}

#[derive(Default)]
struct ChallengeBuilder {
    kind: Option<ChallengeKind>,
    nonce: String,
    realm: String,
    status: Option<String>,
}

/// Decodes a response envelope for `action`.
///
/// # Errors
/// Returns `DecodeError` if the body is not well-formed XML or its root
/// element is not a SOAP `Envelope`.
pub fn parse_response(xml: &str, action: &str) -> Result<ResponseEnvelope, DecodeError> {
    let response_name = format!("{action}Response");
    let mut reader = Reader::from_str(xml);

    let mut envelope = ResponseEnvelope::default();
    let mut challenge = ChallengeBuilder::default();
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut seen_envelope = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if stack.is_empty() {
                    if name != "Envelope" {
                        return Err(DecodeError::MissingElement("Envelope"));
                    }
                    seen_envelope = true;
                }
                stack.push(name);
                open_element(&stack, &response_name, &mut envelope, &mut challenge);
                text.clear();
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if stack.is_empty() {
                    return Err(DecodeError::MissingElement("Envelope"));
                }
                stack.push(name);
                open_element(&stack, &response_name, &mut envelope, &mut challenge);
                close_element(&stack, "", &response_name, &mut envelope, &mut challenge);
                stack.pop();
                text.clear();
            }
            Event::End(_) => {
                close_element(&stack, &text, &response_name, &mut envelope, &mut challenge);
                stack.pop();
                text.clear();
            }
            Event::Text(t) => {
                let raw = String::from_utf8_lossy(&t);
                text.push_str(&unescape(&raw)?);
            }
            Event::CData(t) => {
                text.push_str(&String::from_utf8_lossy(&t));
            }
            Event::GeneralRef(r) => {
                let raw = String::from_utf8_lossy(&r);
                text.push_str(&unescape(&format!("&{raw};"))?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_envelope {
        return Err(DecodeError::MissingElement("Envelope"));
    }

    if let Some(kind) = challenge.kind {
        envelope.challenge = Some(ServerChallenge {
            kind,
            nonce: challenge.nonce,
            realm: challenge.realm,
            status: challenge.status,
        });
    }

    Ok(envelope)
}

fn open_element(
    stack: &[String],
    response_name: &str,
    envelope: &mut ResponseEnvelope,
    challenge: &mut ChallengeBuilder,
) {
    let path: Vec<&str> = stack.iter().map(String::as_str).collect();
    match path.as_slice() {
        ["Envelope", "Header", "Challenge"] => challenge.kind = Some(ChallengeKind::Challenge),
        ["Envelope", "Header", "NextChallenge"] => {
            challenge.kind = Some(ChallengeKind::NextChallenge)
        }
        ["Envelope", "Body", "Fault"] => envelope.fault = Some(SoapFault::default()),
        ["Envelope", "Body", name] if *name == response_name => {
            envelope.response = Some(HashMap::new())
        }
        _ => {}
    }
}

fn close_element(
    stack: &[String],
    text: &str,
    response_name: &str,
    envelope: &mut ResponseEnvelope,
    challenge: &mut ChallengeBuilder,
) {
    let path: Vec<&str> = stack.iter().map(String::as_str).collect();
    match path.as_slice() {
        ["Envelope", "Header", "Challenge" | "NextChallenge", field] => match *field {
            "Nonce" => challenge.nonce = text.to_string(),
            "Realm" => challenge.realm = text.to_string(),
            "Status" => challenge.status = Some(text.to_string()),
            _ => {}
        },
        ["Envelope", "Body", name, arg] if *name == response_name => {
            if let Some(values) = envelope.response.as_mut() {
                values.insert((*arg).to_string(), text.to_string());
            }
        }
        ["Envelope", "Body", "Fault", field] => {
            if let Some(fault) = envelope.fault.as_mut() {
                match *field {
                    "faultcode" => fault.fault_code = Some(text.to_string()),
                    "faultstring" => fault.fault_string = Some(text.to_string()),
                    _ => {}
                }
            }
        }
        ["Envelope", "Body", "Fault", "detail", "UPnPError", field] => {
            if let Some(fault) = envelope.fault.as_mut() {
                match *field {
                    "errorCode" => fault.error_code = Some(text.trim().to_string()),
                    "errorDescription" => fault.error_description = Some(text.to_string()),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}
