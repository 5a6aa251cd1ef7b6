use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryItemId(pub String);

impl fmt::Display for InventoryItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub weight: Option<i32>,
    pub length: Option<i32>,
    pub height: Option<i32>,
    pub width: Option<i32>,
}

impl Dimensions {
    /// `Weight: 200g Length: 10cm ...`, listing only the measurements that are known.
    pub fn describe(&self) -> Option<String> {
        let parts: Vec<String> = [
            self.weight.map(|value| format!("Weight: {value}g")),
            self.length.map(|value| format!("Length: {value}cm")),
            self.height.map(|value| format!("Height: {value}cm")),
            self.width.map(|value| format!("Width: {value}cm")),
        ]
        .into_iter()
        .flatten()
        .collect();

        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub title: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub dimensions: Dimensions,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub id: String,
    pub inventory_item_id: InventoryItemId,
    pub stocked_quantity: Decimal,
    pub reserved_quantity: Decimal,
    pub incoming_quantity: Decimal,
}

impl InventoryLevel {
    pub fn available(&self) -> Decimal {
        self.stocked_quantity - self.reserved_quantity + self.incoming_quantity
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub item: InventoryItem,
    pub level: InventoryLevel,
}
