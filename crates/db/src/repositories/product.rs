use shelfbot_core::domain::product::{Product, ProductId, ProductStatus};

use super::{column, count_from_i64, parse_column, timestamp_column, ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str =
    "id, title, handle, description, thumbnail, status, created_at, updated_at";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(column(row, "id")?),
        title: column(row, "title")?,
        handle: column(row, "handle")?,
        description: column(row, "description")?,
        thumbnail: column(row, "thumbnail")?,
        status: parse_column::<ProductStatus>(row, "status")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    // Titles are folded in Rust: SQLite's LOWER() only folds ASCII.
    async fn find_by_title(&self, title: &str) -> Result<Option<Product>, RepositoryError> {
        let wanted = title.trim().to_lowercase();
        Ok(self.list(None).await?.into_iter().find(|product| product.title.to_lowercase() == wanted))
    }

    async fn search_by_title(&self, fragment: &str) -> Result<Vec<Product>, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        let mut products = self.list(None).await?;
        products.retain(|product| product.title.to_lowercase().contains(&needle));
        Ok(products)
    }

    async fn list(&self, status: Option<ProductStatus>) -> Result<Vec<Product>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM product
                     WHERE status = ?
                     ORDER BY created_at ASC, id ASC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM product ORDER BY created_at ASC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_product).collect()
    }

    async fn count(&self, status: Option<ProductStatus>) -> Result<u64, RepositoryError> {
        let total: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM product WHERE status = ?")
                    .bind(status.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM product").fetch_one(&self.pool).await?
            }
        };

        Ok(count_from_i64(total))
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (id, title, handle, description, thumbnail, status,
                                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 handle = excluded.handle,
                 description = excluded.description,
                 thumbnail = excluded.thumbnail,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
        )
        .bind(&product.id.0)
        .bind(&product.title)
        .bind(&product.handle)
        .bind(&product.description)
        .bind(&product.thumbnail)
        .bind(product.status.as_str())
        .bind(product.created_at.to_rfc3339())
        .bind(product.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM product WHERE id = ?").bind(&id.0).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}
