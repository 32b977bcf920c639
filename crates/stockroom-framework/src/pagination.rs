//! Offset pagination shared by every `list` operation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DEFAULT_PAGE_SIZE: u64 = 10;
/// Largest page a caller can ask for. Full-table reloads use [`Pagination::all`] instead.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Column a listing is ordered by. `None` in a [`Pagination`] means the record's own default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    Id,
    Price,
    Quantity,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sort option: {0}")]
pub struct InvalidSortOption(pub String);

impl FromStr for SortOption {
    type Err = InvalidSortOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(SortOption::Id),
            "price" => Ok(SortOption::Price),
            "quantity" => Ok(SortOption::Quantity),
            "name" => Ok(SortOption::Name),
            "created_at" => Ok(SortOption::CreatedAt),
            "updated_at" => Ok(SortOption::UpdatedAt),
            _ => Err(InvalidSortOption(s.to_string())),
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOption::Id => "id",
            SortOption::Price => "price",
            SortOption::Quantity => "quantity",
            SortOption::Name => "name",
            SortOption::CreatedAt => "created_at",
            SortOption::UpdatedAt => "updated_at",
        };
        f.write_str(name)
    }
}

/// A page request. Construct with [`Pagination::new`] so out-of-range values are normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub sort_by: Option<SortOption>,
}

impl Pagination {
    /// `page < 1` becomes 1, `page_size < 1` becomes 10 and larger sizes are capped at
    /// [`MAX_PAGE_SIZE`].
    pub fn new(page: i64, page_size: i64, sort_by: Option<SortOption>) -> Self {
        let page = if page < 1 { 1 } else { page as u64 };
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            (page_size as u64).min(MAX_PAGE_SIZE)
        };
        Self {
            page,
            page_size,
            sort_by,
        }
    }

    /// A single page holding `total` rows, used by full-table reloads.
    pub fn all(total: u64) -> Self {
        Self {
            page: 1,
            page_size: total,
            sort_by: None,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE as i64, None)
    }
}

/// One page of results plus the navigation fields clients render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub current_page: u64,
    pub has_next_page: bool,
    pub page_size: u64,
    pub total_pages: u64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(pagination: &Pagination, total: u64, data: Vec<T>) -> Self {
        let total_pages = if pagination.page_size == 0 {
            0
        } else {
            total.div_ceil(pagination.page_size)
        };
        Self {
            current_page: pagination.page,
            has_next_page: pagination.page < total_pages,
            page_size: pagination.page_size,
            total_pages,
            data,
        }
    }
}
