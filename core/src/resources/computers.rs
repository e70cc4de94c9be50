//! Computer inventory records on the legacy root.
//!
//! Writes go out as XML; reads ask for JSON and flatten the `general`
//! section, which is the only part the client models.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{path_segment, require_id, WrittenId};
use crate::client::JamfClient;
use crate::dispatch::Response;
use crate::encode::ContentType;
use crate::error::Result;
use crate::http::HttpMethod;

const BASE_PATH: &str = "JSSResource/computers";

/// General section of a computer record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Computer {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub udid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComputerSummary {
    pub id: i64,
    pub name: String,
}

/// Payload for creating or updating a computer record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(into = "ComputerXml")]
pub struct ComputerRequest {
    pub name: String,
    pub serial_number: String,
    /// Left out of the payload when empty; the server assigns one.
    pub udid: String,
}

#[derive(Debug, Deserialize)]
struct ComputerListing {
    #[serde(default)]
    computers: Vec<ComputerSummary>,
}

#[derive(Debug, Deserialize)]
struct ComputerEnvelope {
    computer: ComputerSections,
}

#[derive(Debug, Deserialize)]
struct ComputerSections {
    general: Computer,
}

#[derive(Debug, Serialize)]
#[serde(rename = "computer")]
struct ComputerXml {
    general: GeneralXml,
}

#[derive(Debug, Serialize)]
struct GeneralXml {
    name: String,
    serial_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    udid: String,
}

impl From<ComputerRequest> for ComputerXml {
    fn from(request: ComputerRequest) -> Self {
        Self {
            general: GeneralXml {
                name: request.name,
                serial_number: request.serial_number,
                udid: request.udid,
            },
        }
    }
}

impl Computer {
    pub fn intended(id: i64, request: &ComputerRequest) -> Self {
        Self {
            id,
            name: request.name.clone(),
            serial_number: request.serial_number.clone(),
            udid: request.udid.clone(),
        }
    }
}

/// Matches on name, id and serial number. The udid is server-assigned and
/// ignored.
pub fn computers_equivalent(planned: &Computer, actual: Option<&Computer>) -> bool {
    actual.is_some_and(|actual| {
        planned.name == actual.name
            && planned.id == actual.id
            && planned.serial_number == actual.serial_number
    })
}

/// Computer operations.
pub struct Computers<'a> {
    client: &'a JamfClient,
}

impl<'a> Computers<'a> {
    pub(crate) fn new(client: &'a JamfClient) -> Self {
        Self { client }
    }

    pub fn list(&self) -> Result<(Vec<ComputerSummary>, Response)> {
        let req = self.client.bodiless_request(HttpMethod::Get, BASE_PATH, ContentType::Json)?;
        let (listing, response): (ComputerListing, _) = self.client.send(&req)?;
        Ok((listing.computers, response))
    }

    pub fn get_by_id(&self, id: i64) -> Result<(Computer, Response)> {
        self.get(&format!("{BASE_PATH}/id/{id}"))
    }

    pub fn get_by_name(&self, name: &str) -> Result<(Computer, Response)> {
        self.get(&format!("{BASE_PATH}/name/{}", path_segment(name)))
    }

    pub fn get_by_serial_number(&self, serial_number: &str) -> Result<(Computer, Response)> {
        self.get(&format!("{BASE_PATH}/serialnumber/{}", path_segment(serial_number)))
    }

    fn get(&self, path: &str) -> Result<(Computer, Response)> {
        let req = self.client.bodiless_request(HttpMethod::Get, path, ContentType::Json)?;
        let (envelope, response): (ComputerEnvelope, _) = self.client.send(&req)?;
        Ok((envelope.computer.general, response))
    }

    pub fn create(&self, request: &ComputerRequest) -> Result<(Computer, Response)> {
        let path = format!("{BASE_PATH}/id/0");
        let req = self.client.request(HttpMethod::Post, &path, Some(request), ContentType::Xml)?;
        let (written, _): (WrittenId, _) = self.client.send(&req)?;
        let id = written.require()?;
        info!(id, name = %request.name, "computer created");
        self.await_visible(id, request)
    }

    pub fn update(&self, id: i64, request: &ComputerRequest) -> Result<(Computer, Response)> {
        require_id("computer ID", id)?;
        let path = format!("{BASE_PATH}/id/{id}");
        let req = self.client.request(HttpMethod::Put, &path, Some(request), ContentType::Xml)?;
        let (written, _): (WrittenId, _) = self.client.send(&req)?;
        let id = written.require()?;
        info!(id, "computer updated");
        self.await_visible(id, request)
    }

    pub fn delete(&self, id: i64) -> Result<Response> {
        require_id("computer ID", id)?;
        let path = format!("{BASE_PATH}/id/{id}");
        let req = self.client.bodiless_request(HttpMethod::Delete, &path, ContentType::Xml)?;
        let response = self.client.send_empty(&req)?;
        self.client.reconciler().after_delete(&id, |id| self.get_by_id(*id))?;
        info!(id, "computer deleted");
        Ok(response)
    }

    fn await_visible(&self, id: i64, request: &ComputerRequest) -> Result<(Computer, Response)> {
        let intended = Computer::intended(id, request);
        self.client
            .reconciler()
            .after_mutation(&id, &intended, |id| self.get_by_id(*id), computers_equivalent)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ApiError;
    use crate::testing::{
        is_token_request, json_response, token_response, xml_response, RecordingSleeper,
        StubTransport,
    };

    const LAB_01: &str = r#"{"computer":{"general":{"id":7,"name":"lab-01",
        "serial_number":"C02XK1JHJG5J","udid":"55A1-3C","mac_address":"AA:BB"},
        "hardware":{"model":"MacBook Pro"}}}"#;

    fn request() -> ComputerRequest {
        ComputerRequest {
            name: "lab-01".to_string(),
            serial_number: "C02XK1JHJG5J".to_string(),
            udid: String::new(),
        }
    }

    fn client_over(transport: Arc<StubTransport>, sleeper: Arc<RecordingSleeper>) -> JamfClient {
        let config = ClientConfig::new("https://example.jamfcloud.com", "client", "secret");
        JamfClient::with_transport(&config, transport).unwrap().with_sleeper(sleeper)
    }

    #[test]
    fn get_by_id_flattens_general_section() {
        let transport = Arc::new(StubTransport::new(|req| {
            if is_token_request(req) {
                return Ok(token_response("tok", 1200, &[]));
            }
            Ok(json_response(200, LAB_01))
        }));
        let client = client_over(Arc::clone(&transport), Arc::default());

        let (computer, _) = client.computers().get_by_id(7).unwrap();
        assert_eq!(computer.name, "lab-01");
        assert_eq!(computer.serial_number, "C02XK1JHJG5J");
        assert_eq!(computer.udid, "55A1-3C");

        let get = transport.requests().pop().unwrap();
        assert_eq!(get.header("accept"), Some("application/json"));
    }

    #[test]
    fn lookups_escape_their_path_segment() {
        let transport = Arc::new(StubTransport::new(|req| {
            if is_token_request(req) {
                return Ok(token_response("tok", 1200, &[]));
            }
            Ok(json_response(200, LAB_01))
        }));
        let client = client_over(Arc::clone(&transport), Arc::default());

        client.computers().get_by_name("Lab Mac/01").unwrap();
        client.computers().get_by_serial_number("C02XK1JHJG5J").unwrap();

        let urls: Vec<String> = transport
            .requests()
            .into_iter()
            .filter(|r| !is_token_request(r))
            .map(|r| r.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://example.jamfcloud.com/JSSResource/computers/name/Lab%20Mac%2F01",
                "https://example.jamfcloud.com/JSSResource/computers/serialnumber/C02XK1JHJG5J",
            ]
        );
    }

    #[test]
    fn create_sends_xml_and_waits_for_record() {
        let reads = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&reads);
        let transport = Arc::new(StubTransport::new(move |req| {
            if is_token_request(req) {
                return Ok(token_response("tok", 1200, &[]));
            }
            match req.method {
                HttpMethod::Post => Ok(xml_response(201, "<computer><id>7</id></computer>")),
                _ if seen.fetch_add(1, Ordering::SeqCst) == 0 => {
                    Ok(json_response(404, r#"{"error":"Not Found"}"#))
                }
                _ => Ok(json_response(200, LAB_01)),
            }
        }));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_over(Arc::clone(&transport), Arc::clone(&sleeper));

        let (computer, _) = client.computers().create(&request()).unwrap();
        assert_eq!(computer.id, 7);
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(1)]);

        let post = transport
            .requests()
            .into_iter()
            .find(|r| r.method == HttpMethod::Post && !is_token_request(r))
            .unwrap();
        assert_eq!(
            post.body.as_deref(),
            Some(
                "<computer><general><name>lab-01</name>\
                 <serial_number>C02XK1JHJG5J</serial_number></general></computer>"
            )
        );
    }

    #[test]
    fn delete_that_never_lands_is_reported() {
        let transport = Arc::new(StubTransport::new(|req| {
            if is_token_request(req) {
                return Ok(token_response("tok", 1200, &[]));
            }
            match req.method {
                HttpMethod::Delete => Ok(xml_response(200, "")),
                _ => Ok(json_response(200, LAB_01)),
            }
        }));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client_over(transport, Arc::clone(&sleeper));

        let err = client.computers().delete(7).unwrap_err();
        assert!(matches!(err, ApiError::DeletionNotConfirmed { attempts: 5, .. }));
        assert_eq!(sleeper.delays().len(), 4);
    }

    #[test]
    fn update_with_zero_id_is_rejected() {
        let transport = Arc::new(StubTransport::new(|_| panic!("no request expected")));
        let client = client_over(transport, Arc::default());
        let err = client.computers().update(0, &request()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument { arg: "computer ID", .. }));
    }

    #[test]
    fn udid_does_not_affect_equivalence() {
        let planned = Computer::intended(7, &request());
        let observed = Computer { udid: "55A1-3C".to_string(), ..planned.clone() };
        assert!(computers_equivalent(&planned, Some(&observed)));

        let moved = Computer { serial_number: "C02OTHER".to_string(), ..planned.clone() };
        assert!(!computers_equivalent(&planned, Some(&moved)));
    }
}
