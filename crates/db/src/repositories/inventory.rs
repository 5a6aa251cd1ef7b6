use rust_decimal::Decimal;

use shelfbot_core::domain::inventory::{
    Dimensions, InventoryItem, InventoryItemId, InventoryLevel, LowStockItem,
};

use super::{column, decimal_column, timestamp_column, InventoryRepository, RepositoryError};
use crate::DbPool;

const ITEM_COLUMNS: &str =
    "i.id, i.title, i.sku, i.description, i.weight, i.length, i.height, i.width, i.created_at";

const LEVEL_COLUMNS: &str = "l.id AS level_id, l.inventory_item_id, l.stocked_quantity,
     l.reserved_quantity, l.incoming_quantity";

pub struct SqlInventoryRepository {
    pool: DbPool,
}

impl SqlInventoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn stocked_items(&self) -> Result<Vec<LowStockItem>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS}, {LEVEL_COLUMNS}
             FROM inventory_level l
             JOIN inventory_item i ON i.id = l.inventory_item_id
             WHERE l.deleted_at IS NULL AND i.deleted_at IS NULL
             ORDER BY i.title ASC, i.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok(LowStockItem { item: row_to_item(row)?, level: row_to_level(row)? }))
            .collect()
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<InventoryItem, RepositoryError> {
    Ok(InventoryItem {
        id: InventoryItemId(column(row, "id")?),
        title: column(row, "title")?,
        sku: column(row, "sku")?,
        description: column(row, "description")?,
        dimensions: Dimensions {
            weight: column(row, "weight")?,
            length: column(row, "length")?,
            height: column(row, "height")?,
            width: column(row, "width")?,
        },
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn row_to_level(row: &sqlx::sqlite::SqliteRow) -> Result<InventoryLevel, RepositoryError> {
    Ok(InventoryLevel {
        id: column(row, "level_id")?,
        inventory_item_id: InventoryItemId(column(row, "inventory_item_id")?),
        stocked_quantity: decimal_column(row, "stocked_quantity")?,
        reserved_quantity: decimal_column(row, "reserved_quantity")?,
        incoming_quantity: decimal_column(row, "incoming_quantity")?,
    })
}

#[async_trait::async_trait]
impl InventoryRepository for SqlInventoryRepository {
    async fn list_items(&self) -> Result<Vec<InventoryItem>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_item i
             WHERE i.deleted_at IS NULL
             ORDER BY i.title ASC, i.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn find_item(
        &self,
        id: &InventoryItemId,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_item i WHERE i.id = ? AND i.deleted_at IS NULL"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn save_item(&self, item: InventoryItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO inventory_item (id, title, sku, description, weight, length, height,
                                         width, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 sku = excluded.sku,
                 description = excluded.description,
                 weight = excluded.weight,
                 length = excluded.length,
                 height = excluded.height,
                 width = excluded.width",
        )
        .bind(&item.id.0)
        .bind(&item.title)
        .bind(&item.sku)
        .bind(&item.description)
        .bind(item.dimensions.weight)
        .bind(item.dimensions.length)
        .bind(item.dimensions.height)
        .bind(item.dimensions.width)
        .bind(item.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn stock_level(
        &self,
        item_id: &InventoryItemId,
    ) -> Result<Option<InventoryLevel>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {LEVEL_COLUMNS} FROM inventory_level l
             WHERE l.inventory_item_id = ? AND l.deleted_at IS NULL"
        ))
        .bind(&item_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_level).transpose()
    }

    async fn set_stock_level(&self, level: InventoryLevel) -> Result<(), RepositoryError> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO inventory_level (id, inventory_item_id, stocked_quantity,
                                          reserved_quantity, incoming_quantity,
                                          created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(inventory_item_id) DO UPDATE SET
                 stocked_quantity = excluded.stocked_quantity,
                 reserved_quantity = excluded.reserved_quantity,
                 incoming_quantity = excluded.incoming_quantity,
                 updated_at = excluded.updated_at,
                 deleted_at = NULL",
        )
        .bind(&level.id)
        .bind(&level.inventory_item_id.0)
        .bind(level.stocked_quantity.to_string())
        .bind(level.reserved_quantity.to_string())
        .bind(level.incoming_quantity.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn below_threshold(
        &self,
        threshold: Decimal,
    ) -> Result<Vec<LowStockItem>, RepositoryError> {
        Ok(self
            .stocked_items()
            .await?
            .into_iter()
            .filter(|entry| entry.level.available() < threshold)
            .collect())
    }

    async fn available_by_title(&self, fragment: &str) -> Result<Decimal, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        Ok(self
            .stocked_items()
            .await?
            .iter()
            .filter(|entry| entry.item.title.to_lowercase().contains(&needle))
            .map(|entry| entry.level.available())
            .sum())
    }
}
