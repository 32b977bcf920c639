use super::CategoryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use stockroom_framework::{Record, Resource, SortOption};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Category {
    type Id = CategoryId;
    const KIND: &'static str = "category";

    fn id(&self) -> &CategoryId {
        &self.id
    }

    fn compare_by(&self, other: &Self, sort: Option<SortOption>) -> Ordering {
        match sort {
            Some(SortOption::Name) => self.name.cmp(&other.name),
            Some(SortOption::CreatedAt) => self.created_at.cmp(&other.created_at),
            Some(SortOption::UpdatedAt) => self.updated_at.cmp(&other.updated_at),
            _ => self.id.cmp(&other.id),
        }
    }
}

impl Resource for Category {
    type Create = CategoryCreate;
    type Update = CategoryUpdate;
    type Action = CategoryAction;
    type ActionResult = ();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Categories have no operations beyond CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryAction {}
