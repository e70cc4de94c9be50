//! API roles on the versioned JSON root. A role is looked up by its
//! display name and carries a list of privilege names.

use serde::{Deserialize, Serialize};

use super::versioned::{Collection, Named};
use crate::client::JamfClient;
use crate::dispatch::Response;
use crate::error::{ApiError, Result};

const BASE_PATH: &str = "uapi/v1/api-roles";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiRole {
    pub id: String,
    pub display_name: String,
    pub privileges: Vec<String>,
}

impl Named for ApiRole {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.display_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRoleRequest {
    pub display_name: String,
    pub privileges: Vec<String>,
}

/// API role operations.
pub struct ApiRoles<'a> {
    collection: Collection<'a>,
}

impl<'a> ApiRoles<'a> {
    pub(crate) fn new(client: &'a JamfClient) -> Self {
        Self { collection: Collection::new(client, BASE_PATH, "API role", "API role ID") }
    }

    pub fn list(&self) -> Result<(Vec<ApiRole>, Response)> {
        self.collection.list()
    }

    pub fn get_by_id(&self, id: i64) -> Result<(ApiRole, Response)> {
        self.collection.get_by_id(id)
    }

    /// Finds the role whose display name is `name`.
    pub fn get_by_name(&self, name: &str) -> Result<(ApiRole, Response)> {
        self.collection.get_by_name(name)
    }

    /// The server echoes the whole role on create.
    pub fn create(&self, request: &ApiRoleRequest) -> Result<(ApiRole, Response)> {
        let (role, response): (ApiRole, _) = self.collection.create(request)?;
        if role.id.is_empty() {
            return Err(ApiError::Deserialization("create response carried no id".to_string()));
        }
        Ok((role, response))
    }

    pub fn update(&self, id: i64, request: &ApiRoleRequest) -> Result<(ApiRole, Response)> {
        self.collection.update(id, request)
    }

    pub fn delete(&self, id: i64) -> Result<Response> {
        self.collection.delete(id)
    }
}
