use chrono::{DateTime, Utc};

use shelfbot_core::domain::inventory::InventoryItemId;
use shelfbot_core::domain::product::ProductId;
use shelfbot_core::domain::variant::{ProductVariant, VariantId};

use super::{
    column, count_from_i64, optional_timestamp_column, timestamp_column, RepositoryError,
    VariantRepository,
};
use crate::DbPool;

const VARIANT_COLUMNS: &str = "id, product_id, title, sku, barcode, ean, upc, material,
     allow_backorder, manage_inventory, weight, length, height, width,
     inventory_item_id, variant_rank, created_at, updated_at, deleted_at";

pub struct SqlVariantRepository {
    pool: DbPool,
}

impl SqlVariantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_where(
        &self,
        column_name: &str,
        value: &str,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variant
             WHERE {column_name} = ?
             ORDER BY created_at ASC, id ASC
             LIMIT 1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_variant).transpose()
    }
}

fn row_to_variant(row: &sqlx::sqlite::SqliteRow) -> Result<ProductVariant, RepositoryError> {
    let inventory_item_id: Option<String> = column(row, "inventory_item_id")?;

    Ok(ProductVariant {
        id: VariantId(column(row, "id")?),
        product_id: ProductId(column(row, "product_id")?),
        title: column(row, "title")?,
        sku: column(row, "sku")?,
        barcode: column(row, "barcode")?,
        ean: column(row, "ean")?,
        upc: column(row, "upc")?,
        material: column(row, "material")?,
        allow_backorder: column(row, "allow_backorder")?,
        manage_inventory: column(row, "manage_inventory")?,
        weight: column(row, "weight")?,
        length: column(row, "length")?,
        height: column(row, "height")?,
        width: column(row, "width")?,
        inventory_item_id: inventory_item_id.map(InventoryItemId),
        rank: column(row, "variant_rank")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
        deleted_at: optional_timestamp_column(row, "deleted_at")?,
    })
}

#[async_trait::async_trait]
impl VariantRepository for SqlVariantRepository {
    async fn find_by_id(&self, id: &VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {VARIANT_COLUMNS} FROM product_variant WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(row_to_variant).transpose()
    }

    async fn list_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variant
             WHERE product_id = ?
             ORDER BY variant_rank ASC, created_at ASC"
        ))
        .bind(&product_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_variant).collect()
    }

    async fn list_all(&self) -> Result<Vec<ProductVariant>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variant
             ORDER BY product_id ASC, variant_rank ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_variant).collect()
    }

    async fn list_active(
        &self,
        product_id: Option<&ProductId>,
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        let rows = match product_id {
            Some(product_id) => {
                sqlx::query(&format!(
                    "SELECT {VARIANT_COLUMNS} FROM product_variant
                     WHERE product_id = ? AND deleted_at IS NULL
                     ORDER BY variant_rank ASC, created_at ASC"
                ))
                .bind(&product_id.0)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {VARIANT_COLUMNS} FROM product_variant
                     WHERE deleted_at IS NULL
                     ORDER BY product_id ASC, variant_rank ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_variant).collect()
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<ProductVariant>, RepositoryError> {
        self.find_where("sku", sku).await
    }

    async fn find_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        self.find_where("barcode", barcode).await
    }

    // Folded in Rust like product titles; SQLite's LOWER() only folds ASCII.
    async fn search_by_title(&self, fragment: &str) -> Result<Vec<ProductVariant>, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        let mut variants = self.list_all().await?;
        variants.retain(|variant| variant.title.to_lowercase().contains(&needle));
        Ok(variants)
    }

    async fn search_by_sku(&self, fragment: &str) -> Result<Vec<ProductVariant>, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        let mut variants = self.list_all().await?;
        variants.retain(|variant| {
            variant.sku.as_deref().is_some_and(|sku| sku.to_lowercase().contains(&needle))
        });
        Ok(variants)
    }

    async fn max_rank(&self, product_id: &ProductId) -> Result<Option<i32>, RepositoryError> {
        let max: Option<i32> =
            sqlx::query_scalar("SELECT MAX(variant_rank) FROM product_variant WHERE product_id = ?")
                .bind(&product_id.0)
                .fetch_one(&self.pool)
                .await?;

        Ok(max)
    }

    async fn count(&self, product_id: Option<&ProductId>) -> Result<u64, RepositoryError> {
        let total: i64 = match product_id {
            Some(product_id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM product_variant WHERE product_id = ?")
                    .bind(&product_id.0)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM product_variant")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count_from_i64(total))
    }

    async fn save(&self, variant: ProductVariant) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product_variant (id, product_id, title, sku, barcode, ean, upc, material,
                                          allow_backorder, manage_inventory, weight, length,
                                          height, width, inventory_item_id, variant_rank,
                                          created_at, updated_at, deleted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 sku = excluded.sku,
                 barcode = excluded.barcode,
                 ean = excluded.ean,
                 upc = excluded.upc,
                 material = excluded.material,
                 allow_backorder = excluded.allow_backorder,
                 manage_inventory = excluded.manage_inventory,
                 weight = excluded.weight,
                 length = excluded.length,
                 height = excluded.height,
                 width = excluded.width,
                 inventory_item_id = excluded.inventory_item_id,
                 variant_rank = excluded.variant_rank,
                 updated_at = excluded.updated_at,
                 deleted_at = excluded.deleted_at",
        )
        .bind(&variant.id.0)
        .bind(&variant.product_id.0)
        .bind(&variant.title)
        .bind(&variant.sku)
        .bind(&variant.barcode)
        .bind(&variant.ean)
        .bind(&variant.upc)
        .bind(&variant.material)
        .bind(variant.allow_backorder)
        .bind(variant.manage_inventory)
        .bind(variant.weight)
        .bind(variant.length)
        .bind(variant.height)
        .bind(variant.width)
        .bind(variant.inventory_item_id.as_ref().map(|id| id.0.as_str()))
        .bind(variant.rank)
        .bind(variant.created_at.to_rfc3339())
        .bind(variant.updated_at.to_rfc3339())
        .bind(variant.deleted_at.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &VariantId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM product_variant WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: &VariantId, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let stamp = at.to_rfc3339();
        let result =
            sqlx::query("UPDATE product_variant SET deleted_at = ?, updated_at = ? WHERE id = ?")
                .bind(&stamp)
                .bind(&stamp)
                .bind(&id.0)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_product(&self, product_id: &ProductId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM product_variant WHERE product_id = ?")
            .bind(&product_id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
