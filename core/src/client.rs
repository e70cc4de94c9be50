//! Blocking client for the Jamf Pro API.
//!
//! # Design
//! `JamfClient` ties the pieces together: the shared `Session` supplies a
//! live bearer token, the encoder turns a descriptor into an `HttpRequest`,
//! the `Transport` performs the round-trip and the dispatcher classifies and
//! decodes the answer. Resource services borrow the client and add path
//! templates plus, for mutations, reconciliation.
//!
//! Cloning is cheap and clones share the session, so a token refreshed
//! through one clone is reused by all of them. `with_cancel_token` derives
//! a clone whose calls and backoff sleeps observe a caller-owned token.

use std::io::Write;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cancel::{CancelToken, Sleeper, ThreadSleeper};
use crate::config::ClientConfig;
use crate::dispatch::{self, Response};
use crate::encode::{self, ContentType, RequestDescriptor, Stamp};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::reconcile::{ReconcilePolicy, Reconciler};
use crate::resources::{
    ApiRoles, Buildings, Categories, ComputerGroups, Computers, Departments,
};
use crate::session::Session;

/// Client for one Jamf Pro instance.
#[derive(Clone)]
pub struct JamfClient {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: ReconcilePolicy,
    extra_headers: Arc<Vec<(String, String)>>,
    cancel: CancelToken,
}

impl JamfClient {
    /// Builds a client over a pooled ureq agent. No request is sent until
    /// the first call.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = Arc::new(UreqTransport::new(config.request_timeout()));
        Self::with_transport(config, transport)
    }

    /// Builds a client and obtains the first bearer token up front.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.authenticate()?;
        Ok(client)
    }

    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let extra_headers = config
            .extra_headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        Ok(Self {
            session: Arc::new(Session::new(
                &config.base_url,
                &config.client_id,
                &config.client_secret,
            )),
            transport,
            sleeper: Arc::new(ThreadSleeper),
            policy: config.reconcile_policy(),
            extra_headers: Arc::new(extra_headers),
            cancel: CancelToken::new(),
        })
    }

    /// Replaces how reconciliation backoff waits.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// A clone sharing this client's session whose calls observe `cancel`.
    pub fn with_cancel_token(&self, cancel: CancelToken) -> Self {
        Self { cancel, ..self.clone() }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn reconcile_policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Ensures the session holds a live bearer token.
    pub fn authenticate(&self) -> Result<()> {
        self.cancel.check()?;
        self.session.ensure_valid(self.transport.as_ref()).map(|_| ())
    }

    /// Encodes a request against the instance, refreshing the credential
    /// first when needed.
    pub fn request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        content_type: ContentType,
    ) -> Result<HttpRequest> {
        self.cancel.check()?;
        let token = self.session.ensure_valid(self.transport.as_ref())?;
        let affinity = self.session.affinity();
        let stamp = Stamp {
            bearer_token: Some(token.as_str()),
            affinity: affinity.as_ref(),
            extra_headers: &self.extra_headers,
        };
        let descriptor = RequestDescriptor { method, path, body, content_type };
        encode::build(self.session.base_url(), &descriptor, stamp)
    }

    /// `request` for calls without a payload.
    pub fn bodiless_request(
        &self,
        method: HttpMethod,
        path: &str,
        content_type: ContentType,
    ) -> Result<HttpRequest> {
        self.request::<()>(method, path, None, content_type)
    }

    /// Sends `request` and decodes a successful body into `T`.
    pub fn send<T: DeserializeOwned>(&self, request: &HttpRequest) -> Result<(T, Response)> {
        let response = self.execute(request)?;
        let (envelope, body) = dispatch::into_parts(response);
        let value = dispatch::decode(envelope.header("content-type"), &body)?;
        Ok((value, envelope))
    }

    /// Sends `request` and copies a successful body verbatim into `sink`.
    pub fn send_raw<W: Write + ?Sized>(
        &self,
        request: &HttpRequest,
        sink: &mut W,
    ) -> Result<Response> {
        let response = self.execute(request)?;
        let (envelope, body) = dispatch::into_parts(response);
        dispatch::copy_raw(&body, sink)?;
        Ok(envelope)
    }

    /// Sends `request` for its status alone; the body is discarded.
    pub fn send_empty(&self, request: &HttpRequest) -> Result<Response> {
        let response = self.execute(request)?;
        Ok(dispatch::into_parts(response).0)
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.cancel.check()?;
        debug!(method = %request.method, url = %request.url, "dispatching request");
        let response = self.transport.execute(request).map_err(ApiError::Transport)?;
        dispatch::check_response(request, response)
    }

    /// Poller bound to this client's policy, sleeper and cancel token.
    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.policy, self.sleeper.as_ref(), &self.cancel)
    }

    pub fn computer_groups(&self) -> ComputerGroups<'_> {
        ComputerGroups::new(self)
    }

    pub fn computers(&self) -> Computers<'_> {
        Computers::new(self)
    }

    pub fn categories(&self) -> Categories<'_> {
        Categories::new(self)
    }

    pub fn departments(&self) -> Departments<'_> {
        Departments::new(self)
    }

    pub fn buildings(&self) -> Buildings<'_> {
        Buildings::new(self)
    }

    pub fn api_roles(&self) -> ApiRoles<'_> {
        ApiRoles::new(self)
    }
}
