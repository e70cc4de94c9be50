//! Categories on the versioned JSON root.
//!
//! The versioned root is strongly consistent for categories, so writes
//! return as soon as the server acknowledges them.

use serde::{Deserialize, Serialize};

use super::versioned::{Collection, Named};
use crate::client::JamfClient;
use crate::dispatch::Response;
use crate::error::Result;

const BASE_PATH: &str = "uapi/v1/categories";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Identifiers travel as strings on this root.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub href: Option<String>,
}

impl Named for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CategoryRequest {
    pub name: String,
    pub priority: i32,
}

/// Category operations.
pub struct Categories<'a> {
    collection: Collection<'a>,
}

impl<'a> Categories<'a> {
    pub(crate) fn new(client: &'a JamfClient) -> Self {
        Self { collection: Collection::new(client, BASE_PATH, "category", "category ID") }
    }

    pub fn list(&self) -> Result<(Vec<Category>, Response)> {
        self.collection.list()
    }

    pub fn get_by_id(&self, id: i64) -> Result<(Category, Response)> {
        self.collection.get_by_id(id)
    }

    /// Finds `name` in the listing and reads that category by id.
    pub fn get_by_name(&self, name: &str) -> Result<(Category, Response)> {
        self.collection.get_by_name(name)
    }

    /// Returns the created category as written, with the server's id and href.
    pub fn create(&self, request: &CategoryRequest) -> Result<(Category, Response)> {
        let (created, response) = self.collection.create_for_id(request)?;
        let category = Category {
            id: created.id,
            name: request.name.clone(),
            priority: request.priority,
            href: created.href,
        };
        Ok((category, response))
    }

    pub fn update(&self, id: i64, request: &CategoryRequest) -> Result<(Category, Response)> {
        self.collection.update(id, request)
    }

    pub fn delete(&self, id: i64) -> Result<Response> {
        self.collection.delete(id)
    }
}
