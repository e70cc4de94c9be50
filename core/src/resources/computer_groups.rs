//! Computer groups on the legacy XML root.
//!
//! Reads and writes use XML except the listing, which the server also
//! offers as JSON. Create, update and delete wait for the change to become
//! visible before returning.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{require_id, WrittenId};
use crate::client::JamfClient;
use crate::dispatch::Response;
use crate::encode::ContentType;
use crate::error::{ApiError, Result};
use crate::http::HttpMethod;

const BASE_PATH: &str = "JSSResource/computergroups";

/// One rule of a smart group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupCriterion {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub and_or: String,
    #[serde(default)]
    pub search_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub opening_paren: bool,
    #[serde(default)]
    pub closing_paren: bool,
}

/// A computer listed as a static group member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A computer group as read back from the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "GroupXml")]
pub struct ComputerGroup {
    pub id: i64,
    pub name: String,
    pub is_smart: bool,
    pub criteria: Vec<GroupCriterion>,
    pub computers: Vec<GroupMember>,
}

/// Payload for creating or updating a group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(into = "GroupXml")]
pub struct ComputerGroupRequest {
    pub name: String,
    pub is_smart: bool,
    pub criteria: Vec<GroupCriterion>,
    pub computers: Vec<GroupMember>,
}

/// Entry of the group listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComputerGroupSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_smart: bool,
}

#[derive(Debug, Deserialize)]
struct GroupListing {
    #[serde(default)]
    computer_groups: Vec<ComputerGroupSummary>,
}

// Wire shape: lists are wrapped, `<criteria><criterion>..</criterion></criteria>`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "computer_group")]
struct GroupXml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_smart: bool,
    #[serde(default, skip_serializing_if = "CriteriaXml::is_empty")]
    criteria: CriteriaXml,
    #[serde(default, skip_serializing_if = "MembersXml::is_empty")]
    computers: MembersXml,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CriteriaXml {
    #[serde(default)]
    criterion: Vec<GroupCriterion>,
}

impl CriteriaXml {
    fn is_empty(&self) -> bool {
        self.criterion.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MembersXml {
    #[serde(default)]
    computer: Vec<GroupMember>,
}

impl MembersXml {
    fn is_empty(&self) -> bool {
        self.computer.is_empty()
    }
}

impl From<GroupXml> for ComputerGroup {
    fn from(xml: GroupXml) -> Self {
        Self {
            id: xml.id.unwrap_or_default(),
            name: xml.name,
            is_smart: xml.is_smart,
            criteria: xml.criteria.criterion,
            computers: xml.computers.computer,
        }
    }
}

impl From<ComputerGroupRequest> for GroupXml {
    fn from(request: ComputerGroupRequest) -> Self {
        Self {
            id: None,
            name: request.name,
            is_smart: request.is_smart,
            criteria: CriteriaXml { criterion: request.criteria },
            computers: MembersXml { computer: request.computers },
        }
    }
}

impl ComputerGroup {
    /// The state a write of `request` to `id` should produce, as a read
    /// reports it: members of a smart group and criteria of a static group
    /// are not echoed back.
    pub fn intended(id: i64, request: &ComputerGroupRequest) -> Self {
        Self {
            id,
            name: request.name.clone(),
            is_smart: request.is_smart,
            criteria: request.criteria.clone(),
            computers: request.computers.clone(),
        }
        .normalized()
    }

    fn normalized(mut self) -> Self {
        if self.is_smart {
            self.computers.clear();
        } else {
            self.criteria.clear();
        }
        self
    }
}

/// Compares name, id and both lists position by position. The same members
/// in a different order do not match.
pub fn groups_equivalent(planned: &ComputerGroup, actual: Option<&ComputerGroup>) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    planned.name == actual.name
        && planned.id == actual.id
        && planned.computers == actual.computers
        && planned.criteria == actual.criteria
}

/// Computer group operations.
pub struct ComputerGroups<'a> {
    client: &'a JamfClient,
}

impl<'a> ComputerGroups<'a> {
    pub(crate) fn new(client: &'a JamfClient) -> Self {
        Self { client }
    }

    pub fn list(&self) -> Result<(Vec<ComputerGroupSummary>, Response)> {
        let req = self.client.bodiless_request(HttpMethod::Get, BASE_PATH, ContentType::Json)?;
        let (listing, response): (GroupListing, _) = self.client.send(&req)?;
        Ok((listing.computer_groups, response))
    }

    /// Smart groups come back without members and static groups without
    /// criteria.
    pub fn get_by_id(&self, id: i64) -> Result<(ComputerGroup, Response)> {
        let path = format!("{BASE_PATH}/id/{id}");
        let req = self.client.bodiless_request(HttpMethod::Get, &path, ContentType::Xml)?;
        let (group, response): (ComputerGroup, _) = self.client.send(&req)?;
        Ok((group.normalized(), response))
    }

    /// Resolves `name` through the listing, then reads that group by id.
    pub fn get_by_name(&self, name: &str) -> Result<(ComputerGroup, Response)> {
        let (groups, _) = self.list()?;
        let summary = groups
            .into_iter()
            .find(|g| g.name == name)
            .ok_or_else(|| ApiError::NotFound(format!("computer group named {name:?}")))?;
        self.get_by_id(summary.id)
    }

    pub fn create(&self, request: &ComputerGroupRequest) -> Result<(ComputerGroup, Response)> {
        if request.is_smart && request.criteria.is_empty() {
            return Err(ApiError::invalid_argument(
                "criteria",
                "must be supplied for a smart group",
            ));
        }
        let path = format!("{BASE_PATH}/id/0");
        let req = self.client.request(HttpMethod::Post, &path, Some(request), ContentType::Xml)?;
        let (written, _): (WrittenId, _) = self.client.send(&req)?;
        let id = written.require()?;
        info!(id, name = %request.name, "computer group created");
        self.await_visible(id, request)
    }

    pub fn update(
        &self,
        id: i64,
        request: &ComputerGroupRequest,
    ) -> Result<(ComputerGroup, Response)> {
        require_id("computer group ID", id)?;
        let path = format!("{BASE_PATH}/id/{id}");
        let req = self.client.request(HttpMethod::Put, &path, Some(request), ContentType::Xml)?;
        let (written, _): (WrittenId, _) = self.client.send(&req)?;
        let id = written.require()?;
        info!(id, "computer group updated");
        self.await_visible(id, request)
    }

    pub fn delete(&self, id: i64) -> Result<Response> {
        require_id("computer group ID", id)?;
        let path = format!("{BASE_PATH}/id/{id}");
        let req = self.client.bodiless_request(HttpMethod::Delete, &path, ContentType::Xml)?;
        let response = self.client.send_empty(&req)?;
        self.client.reconciler().after_delete(&id, |id| self.get_by_id(*id))?;
        info!(id, "computer group deleted");
        Ok(response)
    }

    fn await_visible(
        &self,
        id: i64,
        request: &ComputerGroupRequest,
    ) -> Result<(ComputerGroup, Response)> {
        let intended = ComputerGroup::intended(id, request);
        self.client
            .reconciler()
            .after_mutation(&id, &intended, |id| self.get_by_id(*id), groups_equivalent)
    }
}
