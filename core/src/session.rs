//! Session state and the credential refresher.
//!
//! # Design
//! A `Session` owns the bearer credential, its expiry and the sticky-routing
//! cookie. All three live behind one mutex. `ensure_valid` holds that lock
//! across a refresh, so callers racing on an expired token produce a single
//! identity call and the affinity cookie is written at most once.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dispatch;
use crate::encode::{self, ContentType, RequestDescriptor, Stamp};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpResponse, Transport};

/// Identity endpoint path, relative to the instance URL.
pub const OAUTH_TOKEN_PATH: &str = "/api/oauth/token";

/// Cookie names the load balancer uses to pin a client to one node.
pub const AFFINITY_COOKIE_NAMES: [&str; 2] = ["APBALANCEID", "AWSALB"];

/// Longest lifetime a credential is trusted for, whatever the server claims.
pub const MAX_CREDENTIAL_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Sticky-routing cookie captured from the identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityCookie {
    name: String,
    value: String,
}

impl AffinityCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Value for a `Cookie` request header.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// Parses a `Set-Cookie` value, keeping it only if it is a recognized
    /// affinity cookie with a non-empty value.
    pub fn from_set_cookie(set_cookie: &str) -> Option<Self> {
        let pair = set_cookie.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        let (name, value) = (name.trim(), value.trim().trim_matches('"'));
        if value.is_empty() || !AFFINITY_COOKIE_NAMES.contains(&name) {
            return None;
        }
        Some(Self::new(name, value))
    }
}

#[derive(Serialize)]
struct TokenForm<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug)]
struct Credential {
    token: String,
    expires_at: Instant,
}

impl Credential {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct SessionState {
    credential: Option<Credential>,
    affinity: Option<AffinityCookie>,
}

/// Bearer credential, expiry and affinity cookie for one API instance.
#[derive(Debug)]
pub struct Session {
    base_url: String,
    client_id: String,
    client_secret: String,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The pinned affinity cookie, if one has been captured.
    pub fn affinity(&self) -> Option<AffinityCookie> {
        self.state.lock().affinity.clone()
    }

    /// True when a credential exists and has not yet expired.
    pub fn has_live_credential(&self) -> bool {
        let state = self.state.lock();
        state.credential.as_ref().is_some_and(|c| c.is_live(Instant::now()))
    }

    /// Returns a bearer token that is valid right now, refreshing it from
    /// the identity endpoint first if it is absent or expired.
    pub fn ensure_valid(&self, transport: &dyn Transport) -> Result<String> {
        let mut state = self.state.lock();
        if let Some(credential) = state.credential.as_ref() {
            if credential.is_live(Instant::now()) {
                return Ok(credential.token.clone());
            }
        }
        self.refresh(&mut state, transport)
    }

    fn refresh(&self, state: &mut SessionState, transport: &dyn Transport) -> Result<String> {
        state.credential = None;

        let form = TokenForm {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "client_credentials",
        };
        let descriptor = RequestDescriptor {
            method: HttpMethod::Post,
            path: OAUTH_TOKEN_PATH,
            body: Some(&form),
            content_type: ContentType::Form,
        };
        let stamp =
            Stamp { bearer_token: None, affinity: state.affinity.as_ref(), extra_headers: &[] };
        let request = encode::build(&self.base_url, &descriptor, stamp)?;

        debug!(url = %request.url, "requesting bearer token");
        let response = transport.execute(&request).map_err(ApiError::Transport)?;
        let response = dispatch::check_response(&request, response)?;

        if state.affinity.is_none() {
            state.affinity = affinity_from(&response);
            if let Some(cookie) = state.affinity.as_ref() {
                debug!(cookie = cookie.name(), "pinned session to backend node");
            }
        }

        let decoded: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::CredentialUnavailable(format!("token response: {e}")))?;
        let (Some(token), Some(expires_in)) = (decoded.access_token, decoded.expires_in) else {
            return Err(ApiError::CredentialUnavailable(
                "token response lacks access_token or expires_in".to_string(),
            ));
        };

        let lifetime = Duration::from_secs(expires_in).min(MAX_CREDENTIAL_LIFETIME);
        let expires_at = Instant::now().checked_add(lifetime).ok_or_else(|| {
            ApiError::CredentialUnavailable(format!("token lifetime {expires_in}s is out of range"))
        })?;

        info!(expires_in, "bearer token refreshed");
        state.credential = Some(Credential { token: token.clone(), expires_at });
        Ok(token)
    }
}

fn affinity_from(response: &HttpResponse) -> Option<AffinityCookie> {
    response.header_values("set-cookie").find_map(AffinityCookie::from_set_cookie)
}
