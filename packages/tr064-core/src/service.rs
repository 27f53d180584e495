//! TR-064 services and their SCPD-derived actions.
//!
//! A [`Service`] is built from one `<service>` entry of the device description
//! plus the SCPD document it points at. Actions are plain data
//! ([`ActionInfo`]) dispatched by name; [`Action`] is a borrowed proxy that runs
//! the invocation protocol against the owning service.
//!
//! # Invocation protocol
//!
//! 1. Build the envelope, embedding `InitChallenge` or `ClientAuth` when a user
//!    is logged in.
//! 2. POST to the plain or HTTPS control endpoint.
//! 3. On `Challenge`, absorb the nonce and retransmit once per (service,
//!    action); a second `Challenge` without progress is `CredentialsIncorrect`.
//! 4. On `NextChallenge`, re-key for the next call and deliver this result.
//! 5. Map the `{action}Response` children onto the declared out-arguments, or
//!    turn a SOAP fault into [`Tr064Error::Fault`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::auth::ChallengeOutcome;
use crate::description::{parse_scpd, Scpd, ServiceDescriptor};
use crate::envelope::{build_envelope, parse_response, ChallengeKind, ResponseEnvelope, SoapFault};
use crate::error::{ActionFault, DecodeError, Tr064Error, Tr064Result};
use crate::protocol_constants::SOAP_CONTENT_TYPE;
use crate::session::DeviceSession;
use crate::transport::{HttpRequest, HttpResponse};

/// Output values of one action call, keyed by out-argument name.
pub type ActionOutput = BTreeMap<String, String>;

/// Name and ordered argument lists of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInfo {
    pub name: String,
    pub in_args: Vec<String>,
    pub out_args: Vec<String>,
}

/// An evented state variable declared by the SCPD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateVariable {
    pub name: String,
    pub data_type: String,
    pub default_value: Option<String>,
}

/// One discovered service of a device.
pub struct Service {
    session: Arc<DeviceSession>,
    descriptor: ServiceDescriptor,
    actions_info: Vec<ActionInfo>,
    actions: HashMap<String, usize>,
    state_variables: HashMap<String, StateVariable>,
}

impl Service {
    /// Fetches and decodes the SCPD for `descriptor`.
    pub(crate) async fn load(
        session: Arc<DeviceSession>,
        mut descriptor: ServiceDescriptor,
        url_part: &str,
    ) -> Tr064Result<Self> {
        descriptor.scpd_url = resolve_scpd_url(url_part, &descriptor.scpd_url);
        let url = format!("{}{}", session.base_url(), descriptor.scpd_url);
        log::debug!(
            "[Service] Fetching SCPD for {}: {}",
            descriptor.service_type,
            url
        );

        let response = session
            .transport
            .execute(HttpRequest::get(url, session.timeout))
            .await?;
        if !response.is_ok() {
            return Err(Tr064Error::HttpStatus {
                status: response.status,
                status_text: response.status_text,
                service_type: Some(descriptor.service_type),
                action: None,
            });
        }

        let scpd = parse_scpd(&response.body)?;
        Ok(Self::from_scpd(session, descriptor, &scpd))
    }

    pub(crate) fn from_scpd(
        session: Arc<DeviceSession>,
        descriptor: ServiceDescriptor,
        scpd: &Scpd,
    ) -> Self {
        let mut actions_info = Vec::with_capacity(scpd.action_list.actions.len());
        let mut actions = HashMap::new();
        for node in &scpd.action_list.actions {
            let mut info = ActionInfo {
                name: node.name.clone(),
                in_args: Vec::new(),
                out_args: Vec::new(),
            };
            for arg in &node.argument_list.arguments {
                match arg.direction.trim() {
                    "in" => info.in_args.push(arg.name.clone()),
                    "out" => info.out_args.push(arg.name.clone()),
                    _ => {}
                }
            }
            actions.insert(info.name.clone(), actions_info.len());
            actions_info.push(info);
        }

        let state_variables = scpd
            .service_state_table
            .variables
            .iter()
            .filter(|v| v.is_evented())
            .map(|v| {
                (
                    v.name.clone(),
                    StateVariable {
                        name: v.name.clone(),
                        data_type: v.data_type.clone(),
                        default_value: v.default_value.clone(),
                    },
                )
            })
            .collect();

        log::debug!(
            "[Service] {} ready: {} actions",
            descriptor.service_type,
            actions_info.len()
        );

        Self {
            session,
            descriptor,
            actions_info,
            actions,
            state_variables,
        }
    }

    #[must_use]
    pub fn service_type(&self) -> &str {
        &self.descriptor.service_type
    }

    #[must_use]
    pub fn service_id(&self) -> &str {
        &self.descriptor.service_id
    }

    #[must_use]
    pub fn control_url(&self) -> &str {
        &self.descriptor.control_url
    }

    /// SCPD location, with the device URL prefix applied.
    #[must_use]
    pub fn scpd_url(&self) -> &str {
        &self.descriptor.scpd_url
    }

    /// Actions in SCPD document order.
    #[must_use]
    pub fn actions_info(&self) -> &[ActionInfo] {
        &self.actions_info
    }

    #[must_use]
    pub fn action_names(&self) -> Vec<&str> {
        self.actions_info.iter().map(|a| a.name.as_str()).collect()
    }

    /// Looks up an action proxy by name.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<Action<'_>> {
        let info = &self.actions_info[*self.actions.get(name)?];
        Some(Action {
            service: self,
            info,
        })
    }

    /// Invokes `action` with `args`.
    ///
    /// # Errors
    /// `ActionNotFound` if the SCPD does not declare the action; otherwise see
    /// [`Action::call`].
    pub async fn call(&self, action: &str, args: &[(&str, &str)]) -> Tr064Result<ActionOutput> {
        let Some(proxy) = self.action(action) else {
            return Err(Tr064Error::ActionNotFound {
                service_type: self.descriptor.service_type.clone(),
                action: action.to_string(),
            });
        };
        proxy.call(args).await
    }

    #[must_use]
    pub fn state_variable(&self, name: &str) -> Option<&StateVariable> {
        self.state_variables.get(name)
    }

    /// Names of evented state variables, sorted.
    #[must_use]
    pub fn state_variable_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.state_variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registers interest in an evented state variable.
    ///
    /// Registration only: no event is ever delivered.
    ///
    /// # Errors
    /// `UnknownStateVariable` if the SCPD does not mark `name` as evented.
    pub fn subscribe(&self, name: &str) -> Tr064Result<()> {
        if !self.state_variables.contains_key(name) {
            return Err(Tr064Error::UnknownStateVariable(name.to_string()));
        }
        log::debug!(
            "[Service] Subscribed to {}#{} (no event delivery)",
            self.descriptor.service_type,
            name
        );
        Ok(())
    }

    async fn send_action_request(
        &self,
        info: &ActionInfo,
        args: &[(&str, &str)],
    ) -> Tr064Result<ActionOutput> {
        let service_type = self.descriptor.service_type.as_str();
        let action = info.name.as_str();

        loop {
            let header = self.session.auth_header();
            let body = build_envelope(service_type, action, args, header.as_ref());
            let (url, tls) = self.session.control_endpoint(&self.descriptor.control_url);

            log::debug!("[SOAP] {}#{} -> {}", service_type, action, url);

            let request = HttpRequest::post(url, body, self.session.timeout)
                .header("SoapAction", format!("{service_type}#{action}"))
                .header("Content-Type", SOAP_CONTENT_TYPE)
                .tls(tls);

            let response = self
                .session
                .transport
                .execute(request)
                .await
                .map_err(|source| Tr064Error::ActionTransport {
                    service_type: service_type.to_string(),
                    action: action.to_string(),
                    source,
                })?;

            if !response.is_ok() {
                return Err(self.status_error(action, response));
            }

            let mut envelope = parse_response(&response.body, action)
                .map_err(|source| self.decode_error(action, source))?;

            if let Some(challenge) = envelope.challenge.take() {
                let status = challenge.status.as_deref().unwrap_or("no status");
                match challenge.kind {
                    ChallengeKind::Challenge => {
                        match self.session.attempts.on_challenge(service_type, action) {
                            ChallengeOutcome::Retry => {
                                log::info!(
                                    "[Auth] Challenge for {}#{} ({}), retrying with digest",
                                    service_type,
                                    action,
                                    status
                                );
                                self.session
                                    .auth
                                    .lock()
                                    .absorb_challenge(challenge.nonce, challenge.realm);
                                continue;
                            }
                            ChallengeOutcome::CredentialsIncorrect => {
                                log::warn!(
                                    "[Auth] Repeated challenge for {}#{} ({}), giving up",
                                    service_type,
                                    action,
                                    status
                                );
                                return Err(Tr064Error::CredentialsIncorrect {
                                    service_type: service_type.to_string(),
                                    action: action.to_string(),
                                });
                            }
                        }
                    }
                    ChallengeKind::NextChallenge => {
                        log::debug!(
                            "[Auth] Next challenge for {}#{} ({})",
                            service_type,
                            action,
                            status
                        );
                        self.session
                            .attempts
                            .on_next_challenge(service_type, action);
                        self.session
                            .auth
                            .lock()
                            .absorb_next_challenge(challenge.nonce, challenge.realm);
                    }
                }
            }

            return self.output_from(info, envelope);
        }
    }

    fn output_from(
        &self,
        info: &ActionInfo,
        envelope: ResponseEnvelope,
    ) -> Tr064Result<ActionOutput> {
        if let Some(mut values) = envelope.response {
            return Ok(info
                .out_args
                .iter()
                .filter_map(|name| values.remove_entry(name.as_str()))
                .collect());
        }
        if let Some(fault) = envelope.fault {
            return Err(self.fault_error(&info.name, fault, None));
        }
        Ok(ActionOutput::new())
    }

    /// Non-200 answer: a decodable fault wins, otherwise the bare status.
    fn status_error(&self, action: &str, response: HttpResponse) -> Tr064Error {
        if let Ok(ResponseEnvelope {
            fault: Some(fault), ..
        }) = parse_response(&response.body, action)
        {
            return self.fault_error(action, fault, Some(&response));
        }
        log::warn!(
            "[SOAP] {}#{} failed: HTTP {} {}",
            self.descriptor.service_type,
            action,
            response.status,
            response.status_text
        );
        Tr064Error::HttpStatus {
            status: response.status,
            status_text: response.status_text,
            service_type: Some(self.descriptor.service_type.clone()),
            action: Some(action.to_string()),
        }
    }

    fn decode_error(&self, action: &str, source: DecodeError) -> Tr064Error {
        log::warn!(
            "[SOAP] {}#{} returned an undecodable response: {}",
            self.descriptor.service_type,
            action,
            source
        );
        Tr064Error::ActionDecode {
            service_type: self.descriptor.service_type.clone(),
            action: action.to_string(),
            source,
        }
    }

    fn fault_error(
        &self,
        action: &str,
        fault: SoapFault,
        response: Option<&HttpResponse>,
    ) -> Tr064Error {
        let fault = ActionFault {
            service_type: self.descriptor.service_type.clone(),
            action: action.to_string(),
            status: response.map(|r| r.status),
            status_text: response.map(|r| r.status_text.clone()),
            fault_code: fault.fault_code,
            fault_string: fault.fault_string,
            tr064_code: fault.error_code.as_deref().and_then(|c| c.parse().ok()),
            tr064: fault.error_description,
        };
        log::warn!("[SOAP] Fault: {}", fault);
        fault.into()
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("service_type", &self.descriptor.service_type)
            .field("control_url", &self.descriptor.control_url)
            .field("actions", &self.actions_info.len())
            .finish_non_exhaustive()
    }
}

fn resolve_scpd_url(url_part: &str, scpd_url: &str) -> String {
    let path = scpd_url.trim_start_matches('/');
    if url_part.is_empty() {
        format!("/{path}")
    } else {
        format!("{}/{}", url_part.trim_end_matches('/'), path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Action Proxy
// ─────────────────────────────────────────────────────────────────────────────

/// Callable handle for one action of a [`Service`].
#[derive(Debug, Clone, Copy)]
pub struct Action<'a> {
    service: &'a Service,
    info: &'a ActionInfo,
}

impl Action<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub fn info(&self) -> &ActionInfo {
        self.info
    }

    /// Invokes the action with the given input arguments.
    ///
    /// Arguments are sent in the order given.
    ///
    /// # Errors
    /// - `InvalidArgument` if a name is not a declared input (nothing is sent)
    /// - `CredentialsIncorrect` after a repeated challenge
    /// - `Fault` if the device answers with a SOAP fault
    /// - `HttpStatus`, `ActionTransport` or `ActionDecode` for lower-level failures
    pub async fn call(&self, args: &[(&str, &str)]) -> Tr064Result<ActionOutput> {
        if let Some((name, _)) = args
            .iter()
            .find(|(name, _)| !self.info.in_args.iter().any(|a| a == name))
        {
            return Err(Tr064Error::InvalidArgument {
                action: self.info.name.clone(),
                argument: (*name).to_string(),
            });
        }
        self.service.send_action_request(self.info, args).await
    }

    /// Invokes an action that takes no input.
    pub async fn call_empty(&self) -> Tr064Result<ActionOutput> {
        self.call(&[]).await
    }
}
