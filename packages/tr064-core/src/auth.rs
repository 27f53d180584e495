//! Vendor digest authentication state.
//!
//! [`AuthState`] is the one session object per device. Services never copy it;
//! they read it to build request headers and feed device challenges back into
//! it through [`AuthState::absorb_challenge`] and
//! [`AuthState::absorb_next_challenge`].
//!
//! [`AttemptLog`] bounds the retry on `Challenge` per (service, action): one
//! retransmission, then the credentials are considered wrong.

use std::fmt;

use dashmap::DashMap;
use md5::{Digest, Md5};

use crate::envelope::AuthHeader;
use crate::protocol_constants::{DEFAULT_REALM, DEFAULT_USER};

/// Computes the credential proof for a device nonce.
///
/// `md5_hex(md5_hex("{uid}:{realm}:{pwd}") + ":" + nonce)`; devices verify
/// exactly this construction.
#[must_use]
pub fn compute_digest(uid: &str, pwd: &str, realm: &str, nonce: &str) -> String {
    let secret = md5_hex(&format!("{uid}:{realm}:{pwd}"));
    md5_hex(&format!("{secret}:{nonce}"))
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ─────────────────────────────────────────────────────────────────────────────
// Session State
// ─────────────────────────────────────────────────────────────────────────────

/// Credential and challenge state shared by all services of one device.
pub struct AuthState {
    uid: Option<String>,
    pwd: Option<String>,
    realm: String,
    nonce: Option<String>,
    digest: Option<String>,
    challenge_count: u32,
    ca_pem: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    /// Creates an empty, logged-out state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            uid: None,
            pwd: None,
            realm: DEFAULT_REALM.to_string(),
            nonce: None,
            digest: None,
            challenge_count: 0,
            ca_pem: None,
        }
    }

    /// Stores credentials. `uid` falls back to the default user identity.
    pub fn login(&mut self, uid: Option<String>, pwd: String) {
        self.uid = Some(uid.unwrap_or_else(|| DEFAULT_USER.to_string()));
        self.pwd = Some(pwd);
    }

    /// Forgets the credentials and the challenge counter.
    ///
    /// The last nonce and digest are kept; a request already built with them
    /// is unaffected.
    pub fn logout(&mut self) {
        self.uid = None;
        self.pwd = None;
        self.challenge_count = 0;
    }

    /// Device demanded authentication: adopt its nonce/realm and recompute.
    pub fn absorb_challenge(&mut self, nonce: String, realm: String) {
        self.rekey(nonce, realm);
        self.challenge_count += 1;
    }

    /// Device accepted the call and issued the nonce for the next one.
    pub fn absorb_next_challenge(&mut self, nonce: String, realm: String) {
        self.challenge_count = 0;
        self.rekey(nonce, realm);
    }

    fn rekey(&mut self, nonce: String, realm: String) {
        self.digest = Some(compute_digest(
            self.uid.as_deref().unwrap_or_default(),
            self.pwd.as_deref().unwrap_or_default(),
            &realm,
            &nonce,
        ));
        self.nonce = Some(nonce);
        self.realm = realm;
    }

    /// Header for the next request, or `None` when logged out.
    #[must_use]
    pub fn header(&self) -> Option<AuthHeader> {
        let user_id = self.uid.clone()?;
        let realm = self.realm.clone();
        Some(match (&self.nonce, &self.digest) {
            (Some(nonce), Some(auth)) => AuthHeader::ClientAuth {
                nonce: nonce.clone(),
                auth: auth.clone(),
                user_id,
                realm,
            },
            _ => AuthHeader::InitChallenge { user_id, realm },
        })
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    #[must_use]
    pub fn has_password(&self) -> bool {
        self.pwd.is_some()
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    #[must_use]
    pub fn challenge_count(&self) -> u32 {
        self.challenge_count
    }

    /// PEM of the certificate authority pinned for HTTPS, if any.
    #[must_use]
    pub fn ca_pem(&self) -> Option<&str> {
        self.ca_pem.as_deref()
    }

    pub fn set_ca_pem(&mut self, pem: Option<String>) {
        self.ca_pem = pem;
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("uid", &self.uid)
            .field("realm", &self.realm)
            .field("nonce", &self.nonce)
            .field("challenge_count", &self.challenge_count)
            .field("pinned_ca", &self.ca_pem.is_some())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Attempt Log
// ─────────────────────────────────────────────────────────────────────────────

/// Retry state of one (service, action) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Unchallenged,
    ChallengedOnce,
}

/// What to do with a `Challenge` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// Retransmit once with the recomputed digest.
    Retry,
    /// Already retried without progress.
    CredentialsIncorrect,
}

/// Challenge attempts keyed by (service type, action name).
#[derive(Debug, Default)]
pub struct AttemptLog {
    attempts: DashMap<(String, String), AttemptState>,
}

impl AttemptLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a `Challenge` for the pair and decides whether to retransmit.
    pub fn on_challenge(&self, service_type: &str, action: &str) -> ChallengeOutcome {
        let mut state = self
            .attempts
            .entry((service_type.to_string(), action.to_string()))
            .or_insert(AttemptState::Unchallenged);
        match *state {
            AttemptState::Unchallenged => {
                *state = AttemptState::ChallengedOnce;
                ChallengeOutcome::Retry
            }
            AttemptState::ChallengedOnce => ChallengeOutcome::CredentialsIncorrect,
        }
    }

    /// A `NextChallenge` proves progress: the pair may be challenged again.
    pub fn on_next_challenge(&self, service_type: &str, action: &str) {
        self.attempts.insert(
            (service_type.to_string(), action.to_string()),
            AttemptState::Unchallenged,
        );
    }

    #[must_use]
    pub fn state(&self, service_type: &str, action: &str) -> AttemptState {
        self.attempts
            .get(&(service_type.to_string(), action.to_string()))
            .map(|s| *s)
            .unwrap_or(AttemptState::Unchallenged)
    }

    pub fn clear(&self) {
        self.attempts.clear();
    }
}
