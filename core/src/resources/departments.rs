//! Departments on the versioned JSON root.

use serde::{Deserialize, Serialize};

use super::versioned::{Collection, Named};
use crate::client::JamfClient;
use crate::dispatch::Response;
use crate::error::Result;

const BASE_PATH: &str = "uapi/v1/departments";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub href: Option<String>,
}

impl Named for Department {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DepartmentRequest {
    pub name: String,
}

/// Department operations.
pub struct Departments<'a> {
    collection: Collection<'a>,
}

impl<'a> Departments<'a> {
    pub(crate) fn new(client: &'a JamfClient) -> Self {
        Self { collection: Collection::new(client, BASE_PATH, "department", "department ID") }
    }

    pub fn list(&self) -> Result<(Vec<Department>, Response)> {
        self.collection.list()
    }

    pub fn get_by_id(&self, id: i64) -> Result<(Department, Response)> {
        self.collection.get_by_id(id)
    }

    pub fn get_by_name(&self, name: &str) -> Result<(Department, Response)> {
        self.collection.get_by_name(name)
    }

    pub fn create(&self, request: &DepartmentRequest) -> Result<(Department, Response)> {
        let (created, response) = self.collection.create_for_id(request)?;
        let department =
            Department { id: created.id, name: request.name.clone(), href: created.href };
        Ok((department, response))
    }

    /// The server answers `{id, name}`, so `href` is `None` on the result.
    pub fn update(&self, id: i64, request: &DepartmentRequest) -> Result<(Department, Response)> {
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
    use crate::error::ApiError;
    use crate::http::{HttpMethod, HttpResponse};
    use crate::testing::{is_token_request, json_response, token_response, StubTransport};

    fn client_over(transport: Arc<StubTransport>) -> JamfClient {
        let config = ClientConfig::new("https://example.jamfcloud.com", "client", "secret");
        JamfClient::with_transport(&config, transport).unwrap()
    }

    fn stub() -> Arc<StubTransport> {
        Arc::new(StubTransport::new(|req| {
            if is_token_request(req) {
                return Ok(token_response("tok", 1200, &[]));
            }
            match (req.method, req.url.ends_with("/departments")) {
                (HttpMethod::Get, true) => Ok(json_response(
                    200,
                    r#"{"totalCount":2,"results":[{"id":"1","name":"Finance"},
                        {"id":"3","name":"Engineering"}]}"#,
                )),
                (HttpMethod::Get, false) => {
                    Ok(json_response(200, r#"{"id":"3","name":"Engineering"}"#))
                }
                (HttpMethod::Post, _) => Ok(json_response(
                    201,
                    r#"{"id":"7","href":"https://example.jamfcloud.com/api/v1/departments/7"}"#,
                )),
                (HttpMethod::Put, _) => Ok(json_response(200, r#"{"id":"3","name":"R&D"}"#)),
                _ => Ok(HttpResponse { status: 204, headers: Vec::new(), body: String::new() }),
            }
        }))
    }

    #[test]
    fn get_by_name_reads_matching_id() {
        let transport = stub();
        let client = client_over(Arc::clone(&transport));

        let (department, _) = client.departments().get_by_name("Engineering").unwrap();
        assert_eq!(department.id, "3");
        let last = transport.requests().pop().unwrap();
        assert_eq!(last.url, "https://example.jamfcloud.com/uapi/v1/departments/3");

        let err = client.departments().get_by_name("Legal").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn create_update_delete() {
        let transport = stub();
        let client = client_over(Arc::clone(&transport));
        let departments = client.departments();

        let (created, _) =
            departments.create(&DepartmentRequest { name: "Legal".to_string() }).unwrap();
        assert_eq!(created.id, "7");
        assert_eq!(created.name, "Legal");
        assert!(created.href.is_some());
        let post = transport.requests().pop().unwrap();
        assert_eq!(post.body.as_deref(), Some(r#"{"name":"Legal"}"#));

        let (updated, _) =
            departments.update(3, &DepartmentRequest { name: "R&D".to_string() }).unwrap();
        assert_eq!(updated.name, "R&D");
        assert_eq!(updated.href, None);

        assert_eq!(departments.delete(3).unwrap().status, 204);
        assert!(matches!(
            departments.delete(0),
            Err(ApiError::InvalidArgument { arg: "department ID", .. })
        ));
    }
}
