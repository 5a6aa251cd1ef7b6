use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::Row;
use thiserror::Error;

use shelfbot_core::domain::category::{CategoryId, ProductCategory};
use shelfbot_core::domain::inventory::{
    InventoryItem, InventoryItemId, InventoryLevel, LowStockItem,
};
use shelfbot_core::domain::pricing::{ListedPrice, Price, PriceList};
use shelfbot_core::domain::product::{Product, ProductId, ProductStatus};
use shelfbot_core::domain::variant::{ProductVariant, VariantId};

pub mod category;
pub mod inventory;
pub mod memory;
pub mod pricing;
pub mod product;
pub mod variant;

pub use category::SqlCategoryRepository;
pub use inventory::SqlInventoryRepository;
pub use memory::{
    InMemoryCategoryRepository, InMemoryInventoryRepository, InMemoryPricingRepository,
    InMemoryProductRepository, InMemoryVariantRepository,
};
pub use pricing::SqlPricingRepository;
pub use product::SqlProductRepository;
pub use variant::SqlVariantRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Exact title match, ignoring case.
    async fn find_by_title(&self, title: &str) -> Result<Option<Product>, RepositoryError>;

    /// Titles containing `fragment`, ignoring case.
    async fn search_by_title(&self, fragment: &str) -> Result<Vec<Product>, RepositoryError>;

    async fn list(&self, status: Option<ProductStatus>) -> Result<Vec<Product>, RepositoryError>;

    async fn count(&self, status: Option<ProductStatus>) -> Result<u64, RepositoryError>;

    async fn save(&self, product: Product) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait VariantRepository: Send + Sync {
    async fn find_by_id(&self, id: &VariantId) -> Result<Option<ProductVariant>, RepositoryError>;

    /// Variants of one product ordered by rank.
    async fn list_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<ProductVariant>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<ProductVariant>, RepositoryError>;

    /// Variants without a soft delete, optionally limited to one product, in rank order.
    async fn list_active(
        &self,
        product_id: Option<&ProductId>,
    ) -> Result<Vec<ProductVariant>, RepositoryError>;

    /// Exact SKU match.
    async fn find_by_sku(&self, sku: &str) -> Result<Option<ProductVariant>, RepositoryError>;

    /// Exact barcode match.
    async fn find_by_barcode(&self, barcode: &str)
        -> Result<Option<ProductVariant>, RepositoryError>;

    /// Titles containing `fragment`, ignoring case.
    async fn search_by_title(&self, fragment: &str) -> Result<Vec<ProductVariant>, RepositoryError>;

    /// SKUs containing `fragment`, ignoring case.
    async fn search_by_sku(&self, fragment: &str) -> Result<Vec<ProductVariant>, RepositoryError>;

    async fn max_rank(&self, product_id: &ProductId) -> Result<Option<i32>, RepositoryError>;

    async fn count(&self, product_id: Option<&ProductId>) -> Result<u64, RepositoryError>;

    async fn save(&self, variant: ProductVariant) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &VariantId) -> Result<bool, RepositoryError>;

    /// Stamps `deleted_at` and returns whether the variant existed.
    async fn soft_delete(&self, id: &VariantId, at: DateTime<Utc>) -> Result<bool, RepositoryError>;

    /// Removes every variant of the product and returns how many were removed.
    async fn delete_by_product(&self, product_id: &ProductId) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: &CategoryId)
        -> Result<Option<ProductCategory>, RepositoryError>;

    async fn list_active(&self) -> Result<Vec<ProductCategory>, RepositoryError>;

    async fn list_roots(&self) -> Result<Vec<ProductCategory>, RepositoryError>;

    async fn list_children(
        &self,
        parent_id: &CategoryId,
    ) -> Result<Vec<ProductCategory>, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<ProductCategory>, RepositoryError>;

    async fn save(&self, category: ProductCategory) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn list_items(&self) -> Result<Vec<InventoryItem>, RepositoryError>;

    async fn find_item(
        &self,
        id: &InventoryItemId,
    ) -> Result<Option<InventoryItem>, RepositoryError>;

    async fn save_item(&self, item: InventoryItem) -> Result<(), RepositoryError>;

    async fn stock_level(
        &self,
        item_id: &InventoryItemId,
    ) -> Result<Option<InventoryLevel>, RepositoryError>;

    async fn set_stock_level(&self, level: InventoryLevel) -> Result<(), RepositoryError>;

    /// Items whose available quantity is strictly below `threshold`.
    async fn below_threshold(
        &self,
        threshold: Decimal,
    ) -> Result<Vec<LowStockItem>, RepositoryError>;

    /// Sum of available quantity over items whose title contains `fragment`, ignoring case.
    async fn available_by_title(&self, fragment: &str) -> Result<Decimal, RepositoryError>;
}

#[async_trait]
pub trait PricingRepository: Send + Sync {
    async fn active_price_lists(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceList>, RepositoryError>;

    /// Prices outside any list, plus prices on lists active at `now`.
    async fn prices_for_product(
        &self,
        product_id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListedPrice>, RepositoryError>;

    async fn prices_for_variant(
        &self,
        variant_id: &VariantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListedPrice>, RepositoryError>;

    async fn save_price_list(&self, price_list: PriceList) -> Result<(), RepositoryError>;

    async fn save_price(&self, price: Price) -> Result<(), RepositoryError>;
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn timestamp_column(
    row: &SqliteRow,
    name: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = column(row, name)?;
    parse_timestamp(name, &raw)
}

pub(crate) fn optional_timestamp_column(
    row: &SqliteRow,
    name: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    let raw: Option<String> = column(row, name)?;
    raw.map(|value| parse_timestamp(name, &value)).transpose()
}

pub(crate) fn decimal_column(row: &SqliteRow, name: &str) -> Result<Decimal, RepositoryError> {
    let raw: Option<String> = column(row, name)?;
    match raw {
        Some(value) => Decimal::from_str(value.trim())
            .map_err(|e| RepositoryError::Decode(format!("{name}: {e}"))),
        None => Ok(Decimal::ZERO),
    }
}

pub(crate) fn parse_column<T>(row: &SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = column(row, name)?;
    raw.parse::<T>().map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

fn parse_timestamp(name: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn count_from_i64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
