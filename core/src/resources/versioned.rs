//! Shared plumbing for collections on the versioned JSON root.
//!
//! # Design
//! Every `uapi/v1/...` collection speaks the same dialect: a paged listing
//! shaped `{"totalCount", "results"}`, string identifiers, `{id, href}` on
//! create and an empty body on delete. `Collection` maps that dialect onto
//! the client core once; the services in this module tree add their record
//! types and nothing else. Writes are not reconciled, since this root is
//! strongly consistent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::require_id;
use crate::client::JamfClient;
use crate::dispatch::Response;
use crate::encode::ContentType;
use crate::error::{ApiError, Result};
use crate::http::HttpMethod;

/// A record that can be found by name in a listing.
pub(crate) trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default)]
    total_count: usize,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

/// Body of a successful create: the new id and its canonical href.
#[derive(Debug, Deserialize)]
pub(crate) struct Created {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub href: Option<String>,
}

pub(crate) struct Collection<'a> {
    client: &'a JamfClient,
    base_path: &'static str,
    /// Singular noun used in logs and errors, e.g. "category".
    noun: &'static str,
    /// Argument name reported when an id is zero.
    id_arg: &'static str,
}

impl<'a> Collection<'a> {
    pub fn new(
        client: &'a JamfClient,
        base_path: &'static str,
        noun: &'static str,
        id_arg: &'static str,
    ) -> Self {
        Self { client, base_path, noun, id_arg }
    }

    pub fn list<T: DeserializeOwned>(&self) -> Result<(Vec<T>, Response)> {
        let req =
            self.client.bodiless_request(HttpMethod::Get, self.base_path, ContentType::Json)?;
        let (page, response): (Page<T>, _) = self.client.send(&req)?;
        if page.total_count != page.results.len() {
            debug!(
                noun = self.noun,
                total = page.total_count,
                returned = page.results.len(),
                "listing is paged"
            );
        }
        Ok((page.results, response))
    }

    pub fn get_by_id<T: DeserializeOwned>(&self, id: i64) -> Result<(T, Response)> {
        let path = format!("{}/{id}", self.base_path);
        let req = self.client.bodiless_request(HttpMethod::Get, &path, ContentType::Json)?;
        self.client.send(&req)
    }

    /// Finds `name` in the listing and reads that record by id.
    pub fn get_by_name<T: DeserializeOwned + Named>(&self, name: &str) -> Result<(T, Response)> {
        let (records, _): (Vec<T>, _) = self.list()?;
        let found = records
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| ApiError::NotFound(format!("{} named {name:?}", self.noun)))?;
        let id = found.id().parse::<i64>().map_err(|_| {
            ApiError::Deserialization(format!("{} id {:?} is not numeric", self.noun, found.id()))
        })?;
        self.get_by_id(id)
    }

    /// POSTs `body` and decodes the answer as `R`.
    pub fn create<B, R>(&self, body: &B) -> Result<(R, Response)>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let req =
            self.client.request(HttpMethod::Post, self.base_path, Some(body), ContentType::Json)?;
        self.client.send(&req)
    }

    /// `create` for endpoints answering `{id, href}`. An empty id is an error.
    pub fn create_for_id<B: Serialize + ?Sized>(&self, body: &B) -> Result<(Created, Response)> {
        let (created, response): (Created, _) = self.create(body)?;
        if created.id.is_empty() {
            return Err(ApiError::Deserialization("create response carried no id".to_string()));
        }
        info!(noun = self.noun, id = %created.id, "created");
        Ok((created, response))
    }

    pub fn update<B, R>(&self, id: i64, body: &B) -> Result<(R, Response)>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        require_id(self.id_arg, id)?;
        let path = format!("{}/{id}", self.base_path);
        let req = self.client.request(HttpMethod::Put, &path, Some(body), ContentType::Json)?;
        let updated = self.client.send(&req)?;
        info!(noun = self.noun, id, "updated");
        Ok(updated)
    }

    pub fn delete(&self, id: i64) -> Result<Response> {
        require_id(self.id_arg, id)?;
        let path = format!("{}/{id}", self.base_path);
        let req = self.client.bodiless_request(HttpMethod::Delete, &path, ContentType::Json)?;
        let response = self.client.send_empty(&req)?;
        info!(noun = self.noun, id, "deleted");
        Ok(response)
    }
}
