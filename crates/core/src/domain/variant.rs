use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::inventory::InventoryItemId;
use crate::domain::product::{handle_from_title, short_token, Product, ProductId};

pub const DEFAULT_VARIANT_TITLE: &str = "Default Title";

const SKU_STEM_LIMIT: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub String);

impl VariantId {
    pub const PREFIX: &'static str = "variant_";

    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, short_token()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub title: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub ean: Option<String>,
    pub upc: Option<String>,
    pub material: Option<String>,
    pub allow_backorder: bool,
    pub manage_inventory: bool,
    pub weight: Option<i32>,
    pub length: Option<i32>,
    pub height: Option<i32>,
    pub width: Option<i32>,
    pub inventory_item_id: Option<InventoryItemId>,
    pub rank: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set by a soft delete. The row stays readable by id.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProductVariant {
    pub fn new(
        product_id: ProductId,
        title: impl Into<String>,
        rank: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: VariantId::generate(),
            product_id,
            title: title.into(),
            sku: None,
            barcode: None,
            ean: None,
            upc: None,
            material: None,
            allow_backorder: false,
            manage_inventory: true,
            weight: None,
            length: None,
            height: None,
            width: None,
            inventory_item_id: None,
            rank,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// The implicit first variant attached to a product created without any.
    pub fn default_for(product: &Product, now: DateTime<Utc>) -> Self {
        let mut variant = Self::new(product.id.clone(), DEFAULT_VARIANT_TITLE, 1, now);
        variant.sku = Some(default_sku(&product.title));
        variant
    }
}

/// Uppercased title slug capped at 20 characters, suffixed `-001`.
pub fn default_sku(title: &str) -> String {
    let slug = handle_from_title(title).to_uppercase();
    let stem: String = slug.chars().take(SKU_STEM_LIMIT).collect();
    let stem = stem.trim_end_matches('-');

    if stem.is_empty() {
        return "ITEM-001".to_owned();
    }

    format!("{stem}-001")
}
