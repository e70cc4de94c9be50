//! Resource services built on the client core.
//!
//! Each service borrows a `JamfClient` and maps its operations onto path
//! templates under either the legacy XML root (`JSSResource/...`) or the
//! versioned JSON root (`uapi/v1/...`).

mod api_roles;
mod buildings;
mod categories;
mod computer_groups;
mod computers;
mod departments;
mod versioned;

pub use api_roles::{ApiRole, ApiRoleRequest, ApiRoles};
pub use buildings::{Building, BuildingRequest, Buildings};
pub use categories::{Categories, Category, CategoryRequest};
pub use computer_groups::{
    groups_equivalent, ComputerGroup, ComputerGroupRequest, ComputerGroupSummary, ComputerGroups,
    GroupCriterion, GroupMember,
};
pub use computers::{computers_equivalent, Computer, ComputerRequest, ComputerSummary, Computers};
pub use departments::{Department, DepartmentRequest, Departments};

use serde::Deserialize;

use crate::error::{ApiError, Result};

/// Body the legacy root returns for a create or update: just the id.
#[derive(Debug, Deserialize)]
pub(crate) struct WrittenId {
    #[serde(default)]
    pub id: i64,
}

impl WrittenId {
    pub fn require(self) -> Result<i64> {
        if self.id == 0 {
            return Err(ApiError::Deserialization("write response carried no id".to_string()));
        }
        Ok(self.id)
    }
}

/// Percent-encodes `value` for use as a single path segment.
pub(crate) fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub(crate) fn require_id(arg: &'static str, id: i64) -> Result<()> {
    if id == 0 {
        return Err(ApiError::invalid_argument(arg, "cannot be 0"));
    }
    Ok(())
}
