//! Request encoder: logical request descriptor to transport-ready request.
//!
//! # Design
//! The caller names the payload encoding explicitly through `ContentType`
//! rather than the encoder guessing it from the path. Safe methods drop any
//! body they are handed. Encoding happens fully before a request value
//! exists, so a payload that cannot be serialized never reaches the wire.

use serde::Serialize;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest};
use crate::session::AffinityCookie;

/// Payload encoding for a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Json,
    Xml,
    Form,
}

impl ContentType {
    /// Maps a declared media type; anything unrecognized becomes JSON.
    pub fn from_declared(declared: &str) -> Self {
        let essence = declared.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("application/xml") {
            ContentType::Xml
        } else if essence.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            ContentType::Form
        } else {
            ContentType::Json
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Xml => "application/xml",
            ContentType::Form => "application/x-www-form-urlencoded",
        }
    }

    fn encode<T: Serialize + ?Sized>(self, body: &T) -> Result<String> {
        match self {
            ContentType::Json => {
                serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))
            }
            ContentType::Xml => {
                quick_xml::se::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))
            }
            ContentType::Form => serde_urlencoded::to_string(body)
                .map_err(|e| ApiError::Serialization(e.to_string())),
        }
    }
}

/// A logical request before encoding.
#[derive(Debug)]
pub struct RequestDescriptor<'a, T: ?Sized> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub body: Option<&'a T>,
    pub content_type: ContentType,
}

impl<'a> RequestDescriptor<'a, ()> {
    /// Descriptor without a payload.
    pub fn bodiless(method: HttpMethod, path: &'a str, content_type: ContentType) -> Self {
        Self { method, path, body: None, content_type }
    }
}

/// Credentials and routing state stamped onto every outgoing request.
#[derive(Debug, Clone, Copy)]
pub struct Stamp<'a> {
    pub bearer_token: Option<&'a str>,
    pub affinity: Option<&'a AffinityCookie>,
    pub extra_headers: &'a [(String, String)],
}

/// Joins `path` onto `base_url` with exactly one slash between them.
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Encodes `descriptor` into an `HttpRequest` addressed under `base_url`.
pub fn build<T: Serialize + ?Sized>(
    base_url: &str,
    descriptor: &RequestDescriptor<'_, T>,
    stamp: Stamp<'_>,
) -> Result<HttpRequest> {
    let content_type = descriptor.content_type;

    let body = match descriptor.body {
        Some(body) if !descriptor.method.is_safe() => Some(content_type.encode(body)?),
        _ => None,
    };

    let mut headers = Vec::with_capacity(5 + stamp.extra_headers.len());
    headers.push(("content-type".to_string(), content_type.media_type().to_string()));
    if content_type != ContentType::Xml {
        headers.push(("accept".to_string(), "application/json".to_string()));
    }
    if let Some(token) = stamp.bearer_token {
        headers.push(("authorization".to_string(), format!("Bearer {token}")));
    }
    if let Some(cookie) = stamp.affinity {
        headers.push(("cookie".to_string(), cookie.header_value()));
    }
    headers.extend(stamp.extra_headers.iter().cloned());

    Ok(HttpRequest {
        method: descriptor.method,
        url: join_url(base_url, descriptor.path),
        headers,
        body,
    })
}
