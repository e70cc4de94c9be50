//! Buildings on the versioned JSON root.

use serde::{Deserialize, Serialize};

use super::versioned::{Collection, Named};
use crate::client::JamfClient;
use crate::dispatch::Response;
use crate::error::Result;

const BASE_PATH: &str = "uapi/v1/buildings";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Building {
    pub id: String,
    pub name: String,
    pub street_address1: Option<String>,
    pub street_address2: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub zip_postal_code: Option<String>,
    pub country: Option<String>,
    pub href: Option<String>,
}

impl Named for Building {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Payload for creating or updating a building. Unset address lines are
/// left out of the body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Building {
    fn written(id: String, href: Option<String>, request: &BuildingRequest) -> Self {
        Self {
            id,
            name: request.name.clone(),
            street_address1: request.street_address1.clone(),
            street_address2: request.street_address2.clone(),
            city: request.city.clone(),
            state_province: request.state_province.clone(),
            zip_postal_code: request.zip_postal_code.clone(),
            country: request.country.clone(),
            href,
        }
    }
}

/// Building operations.
pub struct Buildings<'a> {
    collection: Collection<'a>,
}

impl<'a> Buildings<'a> {
    pub(crate) fn new(client: &'a JamfClient) -> Self {
        Self { collection: Collection::new(client, BASE_PATH, "building", "building ID") }
    }

    pub fn list(&self) -> Result<(Vec<Building>, Response)> {
        self.collection.list()
    }

    pub fn get_by_id(&self, id: i64) -> Result<(Building, Response)> {
        self.collection.get_by_id(id)
    }

    pub fn get_by_name(&self, name: &str) -> Result<(Building, Response)> {
        self.collection.get_by_name(name)
    }

    pub fn create(&self, request: &BuildingRequest) -> Result<(Building, Response)> {
        let (created, response) = self.collection.create_for_id(request)?;
        Ok((Building::written(created.id, created.href, request), response))
    }

    pub fn update(&self, id: i64, request: &BuildingRequest) -> Result<(Building, Response)> {
        self.collection.update(id, request)
    }

    pub fn delete(&self, id: i64) -> Result<Response> {
        self.collection.delete(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ClientConfig;
    use crate::http::HttpMethod;
    use crate::testing::{is_token_request, json_response, token_response, StubTransport};

    const HQ: &str = r#"{"id":"2","name":"HQ","streetAddress1":"1 Main St","streetAddress2":null,
        "city":"Minneapolis","stateProvince":"MN","zipPostalCode":"55401","country":"US",
        "href":"https://example.jamfcloud.com/api/v1/buildings/2"}"#;

    fn client_over(transport: Arc<StubTransport>) -> JamfClient {
        let config = ClientConfig::new("https://example.jamfcloud.com", "client", "secret");
        JamfClient::with_transport(&config, transport).unwrap()
    }

    fn hq_request() -> BuildingRequest {
        BuildingRequest {
            name: "HQ".to_string(),
            street_address1: Some("1 Main St".to_string()),
            city: Some("Minneapolis".to_string()),
            ..BuildingRequest::default()
        }
    }

    #[test]
    fn list_and_get_by_name_decode_addresses() {
        let transport = Arc::new(StubTransport::new(|req| {
            if is_token_request(req) {
                return Ok(token_response("tok", 1200, &[]));
            }
            if req.url.ends_with("/buildings") {
                Ok(json_response(200, &format!(r#"{{"totalCount":1,"results":[{HQ}]}}"#)))
            } else {
                Ok(json_response(200, HQ))
            }
        }));
        let client = client_over(Arc::clone(&transport));

        let (listed, _) = client.buildings().list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].street_address2, None);

        let (building, _) = client.buildings().get_by_name("HQ").unwrap();
        assert_eq!(building.state_province.as_deref(), Some("MN"));
        assert_eq!(building.zip_postal_code.as_deref(), Some("55401"));
        let last = transport.requests().pop().unwrap();
        assert_eq!(last.url, "https://example.jamfcloud.com/uapi/v1/buildings/2");
    }

    #[test]
    fn create_omits_unset_address_lines() {
        let transport = Arc::new(StubTransport::new(|req| {
            if is_token_request(req) {
                return Ok(token_response("tok", 1200, &[]));
            }
            Ok(json_response(
                201,
                r#"{"id":"2","href":"https://example.jamfcloud.com/api/v1/buildings/2"}"#,
            ))
        }));
        let client = client_over(Arc::clone(&transport));

        let (building, _) = client.buildings().create(&hq_request()).unwrap();
        assert_eq!(building.id, "2");
        assert_eq!(building.city.as_deref(), Some("Minneapolis"));

        let post = transport.requests().pop().unwrap();
        assert_eq!(post.method, HttpMethod::Post);
        assert_eq!(
            post.body.as_deref(),
            Some(r#"{"name":"HQ","streetAddress1":"1 Main St","city":"Minneapolis"}"#)
        );
    }

    #[test]
    fn update_puts_to_id_path() {
        let transport = Arc::new(StubTransport::new(|req| {
            if is_token_request(req) {
                return Ok(token_response("tok", 1200, &[]));
            }
            Ok(json_response(200, HQ))
        }));
        let client = client_over(Arc::clone(&transport));

        let (building, _) = client.buildings().update(2, &hq_request()).unwrap();
        assert_eq!(building.country.as_deref(), Some("US"));
        let put = transport.requests().pop().unwrap();
        assert_eq!(put.method, HttpMethod::Put);
        assert_eq!(put.url, "https://example.jamfcloud.com/uapi/v1/buildings/2");
    }
}
