//! Response classification and body decoding.
//!
//! # Design
//! Status is checked before any decoding is attempted: anything outside
//! 200-299 becomes `ApiError::Http` carrying the raw body text. Successful
//! bodies decode as XML when the response says so and as JSON otherwise.

use std::io::Write;

use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};

/// Status and headers of a completed call, after the body was consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        crate::http::find_header(&self.headers, name)
    }
}

/// True for statuses the API treats as success.
pub fn is_success(status: u16) -> bool {
    (200..=299).contains(&status)
}

/// Passes 2xx responses through and turns everything else into an error
/// envelope naming the request.
pub fn check_response(request: &HttpRequest, response: HttpResponse) -> Result<HttpResponse> {
    if is_success(response.status) {
        return Ok(response);
    }
    Err(ApiError::Http {
        method: request.method,
        url: request.url.clone(),
        status: response.status,
        body: response.body,
    })
}

/// Splits a checked response into its envelope and body.
pub fn into_parts(response: HttpResponse) -> (Response, String) {
    (Response { status: response.status, headers: response.headers }, response.body)
}

/// Decodes a body according to the response's content type.
pub fn decode<T: DeserializeOwned>(content_type: Option<&str>, body: &str) -> Result<T> {
    let is_xml = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("xml"));
    if is_xml {
        quick_xml::de::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
    } else {
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Copies a body verbatim into `sink`.
pub fn copy_raw<W: Write + ?Sized>(body: &str, sink: &mut W) -> Result<()> {
    sink.write_all(body.as_bytes())
        .map_err(|e| ApiError::Transport(Box::new(e)))
}
