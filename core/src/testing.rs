//! In-crate test doubles: a scripted transport and a recording sleeper.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cancel::{CancelToken, Sleeper};
use crate::error::{BoxError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};

type Handler =
    Box<dyn Fn(&HttpRequest) -> std::result::Result<HttpResponse, BoxError> + Send + Sync>;

/// Transport that answers from a closure and records every request.
pub struct StubTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> std::result::Result<HttpResponse, BoxError> + Send + Sync + 'static,
    {
        Self { handler: Box::new(handler), requests: Mutex::new(Vec::new()) }
    }

    /// Answers with each response in turn; panics when the script runs dry.
    pub fn sequence(responses: Vec<std::result::Result<HttpResponse, BoxError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |req| {
            queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted request: {} {}", req.method, req.url))
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, BoxError> {
        self.requests.lock().push(request.clone());
        (self.handler)(request)
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<()> {
        self.delays.lock().push(duration);
        cancel.check()
    }
}

/// Identity endpoint answer with the given token, lifetime and cookies.
pub fn token_response(token: &str, expires_in: u64, set_cookies: &[&str]) -> HttpResponse {
    let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
    headers.extend(set_cookies.iter().map(|c| ("set-cookie".to_string(), c.to_string())));
    HttpResponse {
        status: 200,
        headers,
        body: serde_json::json!({
            "access_token": token,
            "scope": "api-role:1",
            "token_type": "Bearer",
            "expires_in": expires_in,
        })
        .to_string(),
    }
}

pub fn json_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json;charset=UTF-8".to_string())],
        body: body.to_string(),
    }
}

pub fn xml_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "text/xml;charset=UTF-8".to_string())],
        body: body.to_string(),
    }
}

pub fn is_token_request(request: &HttpRequest) -> bool {
    request.url.ends_with(crate::session::OAUTH_TOKEN_PATH)
}
