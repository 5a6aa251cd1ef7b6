use shelfbot_core::domain::category::{CategoryId, ProductCategory};

use super::{column, timestamp_column, CategoryRepository, RepositoryError};
use crate::DbPool;

const CATEGORY_COLUMNS: &str = "id, name, description, handle, is_active, is_internal,
     parent_category_id, rank, created_at";

pub struct SqlCategoryRepository {
    pool: DbPool,
}

impl SqlCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        predicate: &str,
        bind: Option<&str>,
    ) -> Result<Vec<ProductCategory>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM product_category
             WHERE deleted_at IS NULL AND {predicate}
             ORDER BY rank ASC, name ASC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_category).collect()
    }
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<ProductCategory, RepositoryError> {
    let parent: Option<String> = column(row, "parent_category_id")?;

    Ok(ProductCategory {
        id: CategoryId(column(row, "id")?),
        name: column(row, "name")?,
        description: column(row, "description")?,
        handle: column(row, "handle")?,
        is_active: column(row, "is_active")?,
        is_internal: column(row, "is_internal")?,
        parent_id: parent.map(CategoryId),
        rank: column(row, "rank")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

#[async_trait::async_trait]
impl CategoryRepository for SqlCategoryRepository {
    async fn find_by_id(
        &self,
        id: &CategoryId,
    ) -> Result<Option<ProductCategory>, RepositoryError> {
        Ok(self.fetch_where("id = ?", Some(&id.0)).await?.into_iter().next())
    }

    async fn list_active(&self) -> Result<Vec<ProductCategory>, RepositoryError> {
        self.fetch_where("is_active = 1", None).await
    }

    async fn list_roots(&self) -> Result<Vec<ProductCategory>, RepositoryError> {
        self.fetch_where("is_active = 1 AND parent_category_id IS NULL", None).await
    }

    async fn list_children(
        &self,
        parent_id: &CategoryId,
    ) -> Result<Vec<ProductCategory>, RepositoryError> {
        self.fetch_where("is_active = 1 AND parent_category_id = ?", Some(&parent_id.0)).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ProductCategory>, RepositoryError> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .list_active()
            .await?
            .into_iter()
            .find(|category| category.name.to_lowercase() == wanted))
    }

    async fn save(&self, category: ProductCategory) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product_category (id, name, description, handle, is_active, is_internal,
                                           parent_category_id, rank, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 handle = excluded.handle,
                 is_active = excluded.is_active,
                 is_internal = excluded.is_internal,
                 parent_category_id = excluded.parent_category_id,
                 rank = excluded.rank",
        )
        .bind(&category.id.0)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.handle)
        .bind(category.is_active)
        .bind(category.is_internal)
        .bind(category.parent_id.as_ref().map(|id| id.0.as_str()))
        .bind(category.rank)
        .bind(category.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
