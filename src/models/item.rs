//! Item domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    InUse,
    Archived,
    Deleted,
    Transferred,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::InUse => "in_use",
            ItemStatus::Archived => "archived",
            ItemStatus::Deleted => "deleted",
            ItemStatus::Transferred => "transferred",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Active => "Active",
            ItemStatus::InUse => "In use",
            ItemStatus::Archived => "Archived",
            ItemStatus::Deleted => "Deleted",
            ItemStatus::Transferred => "Transferred",
        }
    }
}

/// How an item is offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealMode {
    Sale,
    Rent,
    Free,
    SaleRent,
}

impl DealMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealMode::Sale => "sale",
            DealMode::Rent => "rent",
            DealMode::Free => "free",
            DealMode::SaleRent => "sale_rent",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DealMode::Sale => "For sale",
            DealMode::Rent => "For rent",
            DealMode::Free => "Give away",
            DealMode::SaleRent => "Sale or rent",
        }
    }

    /// Rental modes need a date range
    pub fn is_rental(&self) -> bool {
        matches!(self, DealMode::Rent | DealMode::SaleRent)
    }
}

impl std::str::FromStr for DealMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sale" => Ok(DealMode::Sale),
            "rent" => Ok(DealMode::Rent),
            "free" => Ok(DealMode::Free),
            "sale_rent" => Ok(DealMode::SaleRent),
            other => Err(format!(
                "unknown deal mode '{}', expected one of: sale, rent, free, sale_rent",
                other
            )),
        }
    }
}

/// Item photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemImage {
    pub id: i64,
    pub item_id: i64,
    pub url: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub status: ItemStatus,
    pub mode: DealMode,
    #[serde(default)]
    pub description: String,
    /// Minor currency units
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub deposit: i64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: Option<Vec<ItemImage>>,
}

/// Create item request
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub mode: DealMode,
}

/// Add image request
#[derive(Debug, Clone, Serialize, Validate)]
pub struct AddImageRequest {
    #[validate(length(min = 1, message = "image url is required"))]
    pub url: String,
}

/// Catalog list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemListParams {
    pub mode: Option<DealMode>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Limit/offset pagination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
