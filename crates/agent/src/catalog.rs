use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use shelfbot_core::domain::category::{CategoryId, ProductCategory};
use shelfbot_core::domain::pricing::PriceRange;
use shelfbot_core::domain::product::{Product, ProductId, ProductStatus};
use shelfbot_core::domain::variant::{ProductVariant, VariantId};
use shelfbot_db::repositories::{
    CategoryRepository, InMemoryCategoryRepository, InMemoryInventoryRepository,
    InMemoryPricingRepository, InMemoryProductRepository, InMemoryVariantRepository,
    InventoryRepository, PricingRepository, ProductRepository, SqlCategoryRepository,
    SqlInventoryRepository, SqlPricingRepository, SqlProductRepository, SqlVariantRepository,
    VariantRepository,
};
use shelfbot_db::DbPool;

use crate::describe::DescriptionCascade;
use crate::errors::{persistence, CommandError};

/// The persistence ports the chatbot reads and writes through.
#[derive(Clone)]
pub struct CatalogRepositories {
    pub products: Arc<dyn ProductRepository>,
    pub variants: Arc<dyn VariantRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub inventory: Arc<dyn InventoryRepository>,
    pub pricing: Arc<dyn PricingRepository>,
}

impl CatalogRepositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            variants: Arc::new(SqlVariantRepository::new(pool.clone())),
            categories: Arc::new(SqlCategoryRepository::new(pool.clone())),
            inventory: Arc::new(SqlInventoryRepository::new(pool.clone())),
            pricing: Arc::new(SqlPricingRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryProductRepository::default()),
            variants: Arc::new(InMemoryVariantRepository::default()),
            categories: Arc::new(InMemoryCategoryRepository::default()),
            inventory: Arc::new(InMemoryInventoryRepository::default()),
            pricing: Arc::new(InMemoryPricingRepository::default()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Absent fields are left alone. An empty `description` together with a new
/// `title` asks for the description to be regenerated.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewVariant {
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VariantUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantSearchField {
    Title,
    Sku,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantLookup<'a> {
    Id(&'a str),
    Sku(&'a str),
    Barcode(&'a str),
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductDetails {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    pub price_range: Option<PriceRange>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeletedProduct {
    pub product: Product,
    pub variants_removed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub products: u64,
    pub published: u64,
    pub variants: u64,
}

impl CatalogCounts {
    pub fn drafts(&self) -> u64 {
        self.products.saturating_sub(self.published)
    }

    pub fn variants_per_product(&self) -> f64 {
        if self.products == 0 {
            return 0.0;
        }
        self.variants as f64 / self.products as f64
    }
}

/// Catalog operations shared by the chat dispatcher and the typed endpoints.
#[derive(Clone)]
pub struct CatalogService {
    repos: CatalogRepositories,
    describer: DescriptionCascade,
}

impl CatalogService {
    pub fn new(repos: CatalogRepositories, describer: DescriptionCascade) -> Self {
        Self { repos, describer }
    }

    pub fn repositories(&self) -> &CatalogRepositories {
        &self.repos
    }

    /// Creates a product with a generated description when none is given and a
    /// default variant. Titles are unique ignoring case, checked before writing.
    pub async fn create_product(&self, request: NewProduct) -> Result<ProductDetails, CommandError> {
        let title = non_blank(Some(request.title)).ok_or(CommandError::MissingField("a product title"))?;
        let status = match non_blank(request.status) {
            Some(raw) => ProductStatus::from_str(&raw)?,
            None => ProductStatus::default(),
        };

        if self
            .repos
            .products
            .find_by_title(&title)
            .await
            .map_err(persistence("creating product"))?
            .is_some()
        {
            return Err(CommandError::DuplicateTitle { title });
        }

        let description = match non_blank(request.description) {
            Some(description) => description,
            None => self.describer.describe(&title).await.text,
        };

        let now = Utc::now();
        let product = Product::new(title, Some(description), status, now);
        self.repos.products.save(product.clone()).await.map_err(persistence("creating product"))?;

        let mut variants = self
            .repos
            .variants
            .list_by_product(&product.id)
            .await
            .map_err(persistence("creating product"))?;
        if variants.is_empty() {
            let variant = ProductVariant::default_for(&product, now);
            self.repos
                .variants
                .save(variant.clone())
                .await
                .map_err(persistence("creating product"))?;
            variants.push(variant);
        }

        info!(
            event_name = "catalog.product_created",
            product_id = %product.id,
            variants = variants.len()
        );
        Ok(ProductDetails { product, variants, price_range: None })
    }

    pub async fn product(&self, id: &str) -> Result<Product, CommandError> {
        self.repos
            .products
            .find_by_id(&ProductId(id.to_owned()))
            .await
            .map_err(persistence("retrieving products"))?
            .ok_or_else(|| CommandError::not_found("Product", id))
    }

    pub async fn details(&self, product: Product) -> Result<ProductDetails, CommandError> {
        let variants = self
            .repos
            .variants
            .list_by_product(&product.id)
            .await
            .map_err(persistence("retrieving products"))?;
        let price_range = self.product_price_range(&product.id).await?;
        Ok(ProductDetails { product, variants, price_range })
    }

    pub async fn search(&self, fragment: &str) -> Result<Vec<Product>, CommandError> {
        self.repos
            .products
            .search_by_title(fragment.trim())
            .await
            .map_err(persistence("retrieving products"))
    }

    pub async fn list(&self, status: Option<ProductStatus>) -> Result<Vec<Product>, CommandError> {
        self.repos.products.list(status).await.map_err(persistence("retrieving products"))
    }

    pub async fn variant_count(&self, product_id: &ProductId) -> Result<u64, CommandError> {
        self.repos
            .variants
            .count(Some(product_id))
            .await
            .map_err(persistence("retrieving products"))
    }

    pub async fn update_product(
        &self,
        id: &str,
        update: ProductUpdate,
    ) -> Result<Product, CommandError> {
        let mut product = self.product(id).await?;
        let clears_description =
            update.description.as_deref().is_some_and(|value| value.trim().is_empty());

        if let Some(title) = non_blank(update.title) {
            if clears_description {
                product.description = Some(self.describer.describe(&title).await.text);
            }
            product.rename(title);
        }
        if let Some(description) = non_blank(update.description) {
            product.description = Some(description);
        }
        if let Some(status) = non_blank(update.status) {
            product.status = ProductStatus::from_str(&status)?;
        }
        product.updated_at = Utc::now();

        self.repos.products.save(product.clone()).await.map_err(persistence("updating product"))?;
        info!(event_name = "catalog.product_updated", product_id = %product.id);
        Ok(product)
    }

    /// Resolves `identifier` as an id, then as an exact title, and removes the
    /// product together with all of its variants.
    pub async fn delete_product(&self, identifier: &str) -> Result<DeletedProduct, CommandError> {
        let identifier = identifier.trim();
        let products = &self.repos.products;

        let by_id = products
            .find_by_id(&ProductId(identifier.to_owned()))
            .await
            .map_err(persistence("deleting product"))?;
        let product = match by_id {
            Some(product) => Some(product),
            None => {
                products.find_by_title(identifier).await.map_err(persistence("deleting product"))?
            }
        }
        .ok_or_else(|| CommandError::not_found("Product", identifier))?;

        let variants_removed = self
            .repos
            .variants
            .delete_by_product(&product.id)
            .await
            .map_err(persistence("deleting product"))?;
        products.delete(&product.id).await.map_err(persistence("deleting product"))?;

        info!(
            event_name = "catalog.product_deleted",
            product_id = %product.id,
            variants_removed
        );
        Ok(DeletedProduct { product, variants_removed })
    }

    /// Appends a variant after the product's highest ranked one.
    pub async fn create_variant(
        &self,
        product_id: &str,
        request: NewVariant,
    ) -> Result<ProductVariant, CommandError> {
        let product = self.product(product_id).await?;
        let title = non_blank(Some(request.title)).ok_or(CommandError::MissingField("a variant title"))?;

        let rank = self
            .repos
            .variants
            .max_rank(&product.id)
            .await
            .map_err(persistence("creating variant"))?
            .map_or(1, |max| max + 1);

        let mut variant = ProductVariant::new(product.id, title, rank, Utc::now());
        variant.sku = non_blank(request.sku);
        variant.barcode = non_blank(request.barcode);

        self.repos.variants.save(variant.clone()).await.map_err(persistence("creating variant"))?;
        info!(event_name = "catalog.variant_created", variant_id = %variant.id, rank);
        Ok(variant)
    }

    pub async fn variant(&self, id: &str) -> Result<ProductVariant, CommandError> {
        self.repos
            .variants
            .find_by_id(&VariantId(id.to_owned()))
            .await
            .map_err(persistence("retrieving variants"))?
            .ok_or_else(|| CommandError::not_found("Variant", id))
    }

    pub async fn variants_for(&self, product_id: &str) -> Result<Vec<ProductVariant>, CommandError> {
        self.repos
            .variants
            .list_by_product(&ProductId(product_id.to_owned()))
            .await
            .map_err(persistence("retrieving variants"))
    }

    pub async fn all_variants(&self) -> Result<Vec<ProductVariant>, CommandError> {
        self.repos.variants.list_all().await.map_err(persistence("retrieving variants"))
    }

    pub async fn update_variant(
        &self,
        id: &str,
        update: VariantUpdate,
    ) -> Result<ProductVariant, CommandError> {
        let title = non_blank(update.title);
        let sku = non_blank(update.sku);
        let barcode = non_blank(update.barcode);
        if title.is_none() && sku.is_none() && barcode.is_none() {
            return Err(CommandError::MissingField(
                "at least one field to update (title, sku, or barcode)",
            ));
        }

        let mut variant = self.variant(id).await?;
        if let Some(title) = title {
            variant.title = title;
        }
        if sku.is_some() {
            variant.sku = sku;
        }
        if barcode.is_some() {
            variant.barcode = barcode;
        }
        variant.updated_at = Utc::now();

        self.repos.variants.save(variant.clone()).await.map_err(persistence("updating variant"))?;
        Ok(variant)
    }

    pub async fn delete_variant(&self, id: &str) -> Result<ProductVariant, CommandError> {
        let variant = self.variant(id).await?;
        self.repos.variants.delete(&variant.id).await.map_err(persistence("deleting variant"))?;
        info!(event_name = "catalog.variant_deleted", variant_id = %variant.id);
        Ok(variant)
    }

    /// Marks the variant deleted without removing it. Active listings skip it.
    pub async fn soft_delete_variant(&self, id: &str) -> Result<ProductVariant, CommandError> {
        let mut variant = self.variant(id).await?;
        let now = Utc::now();
        self.repos
            .variants
            .soft_delete(&variant.id, now)
            .await
            .map_err(persistence("deleting variant"))?;
        variant.deleted_at = Some(now);
        variant.updated_at = now;
        info!(event_name = "catalog.variant_soft_deleted", variant_id = %variant.id);
        Ok(variant)
    }

    /// Creates every requested variant after the product's highest rank, in
    /// request order. All titles are checked before anything is written.
    pub async fn create_variants(
        &self,
        product_id: &str,
        requests: Vec<NewVariant>,
    ) -> Result<Vec<ProductVariant>, CommandError> {
        let product = self.product(product_id).await?;
        if requests.is_empty() {
            return Err(CommandError::MissingField("at least one variant"));
        }
        let titles = requests
            .iter()
            .map(|request| non_blank(Some(request.title.clone())))
            .collect::<Option<Vec<String>>>()
            .ok_or(CommandError::MissingField("a title for every variant"))?;

        let mut rank = self
            .repos
            .variants
            .max_rank(&product.id)
            .await
            .map_err(persistence("creating variants"))?
            .unwrap_or(0);

        let now = Utc::now();
        let mut created = Vec::with_capacity(requests.len());
        for (request, title) in requests.into_iter().zip(titles) {
            rank += 1;
            let mut variant = ProductVariant::new(product.id.clone(), title, rank, now);
            variant.sku = non_blank(request.sku);
            variant.barcode = non_blank(request.barcode);
            self.repos
                .variants
                .save(variant.clone())
                .await
                .map_err(persistence("creating variants"))?;
            created.push(variant);
        }

        info!(
            event_name = "catalog.variants_created",
            product_id = %product.id,
            count = created.len()
        );
        Ok(created)
    }

    /// Rewrites ranks to follow `variant_ids`, starting at 1. Ids that are
    /// unknown or belong to another product are skipped but keep their slot.
    pub async fn reorder_variants(
        &self,
        product_id: &str,
        variant_ids: &[String],
    ) -> Result<Vec<ProductVariant>, CommandError> {
        let product = self.product(product_id).await?;
        let now = Utc::now();

        for (position, id) in variant_ids.iter().enumerate() {
            let Some(mut variant) = self
                .repos
                .variants
                .find_by_id(&VariantId(id.trim().to_owned()))
                .await
                .map_err(persistence("reordering variants"))?
            else {
                continue;
            };
            if variant.product_id != product.id {
                continue;
            }

            variant.rank = i32::try_from(position + 1).unwrap_or(i32::MAX);
            variant.updated_at = now;
            self.repos
                .variants
                .save(variant)
                .await
                .map_err(persistence("reordering variants"))?;
        }

        info!(event_name = "catalog.variants_reordered", product_id = %product.id);
        self.variants_for(product.id.as_str()).await
    }

    pub async fn active_variants(
        &self,
        product_id: Option<&str>,
    ) -> Result<Vec<ProductVariant>, CommandError> {
        let product_id = product_id.map(|id| ProductId(id.to_owned()));
        self.repos
            .variants
            .list_active(product_id.as_ref())
            .await
            .map_err(persistence("retrieving variants"))
    }

    pub async fn variant_by_sku(&self, sku: &str) -> Result<ProductVariant, CommandError> {
        self.repos
            .variants
            .find_by_sku(sku.trim())
            .await
            .map_err(persistence("retrieving variants"))?
            .ok_or_else(|| CommandError::not_found("Variant", sku))
    }

    pub async fn variant_by_barcode(&self, barcode: &str) -> Result<ProductVariant, CommandError> {
        self.repos
            .variants
            .find_by_barcode(barcode.trim())
            .await
            .map_err(persistence("retrieving variants"))?
            .ok_or_else(|| CommandError::not_found("Variant", barcode))
    }

    pub async fn search_variants(
        &self,
        field: VariantSearchField,
        fragment: &str,
    ) -> Result<Vec<ProductVariant>, CommandError> {
        let variants = &self.repos.variants;
        let found = match field {
            VariantSearchField::Title => variants.search_by_title(fragment.trim()).await,
            VariantSearchField::Sku => variants.search_by_sku(fragment.trim()).await,
        };
        found.map_err(persistence("searching variants"))
    }

    pub async fn variant_exists(&self, lookup: VariantLookup<'_>) -> Result<bool, CommandError> {
        let variants = &self.repos.variants;
        let found = match lookup {
            VariantLookup::Id(id) => variants.find_by_id(&VariantId(id.trim().to_owned())).await,
            VariantLookup::Sku(sku) => variants.find_by_sku(sku.trim()).await,
            VariantLookup::Barcode(barcode) => variants.find_by_barcode(barcode.trim()).await,
        }
        .map_err(persistence("retrieving variants"))?;
        Ok(found.is_some())
    }

    /// Variant count over the whole catalog, or for one product.
    pub async fn variant_stats(&self, product_id: Option<&str>) -> Result<u64, CommandError> {
        let product_id = product_id.map(|id| ProductId(id.to_owned()));
        self.repos
            .variants
            .count(product_id.as_ref())
            .await
            .map_err(persistence("retrieving statistics"))
    }

    /// Available units across the variants of every product whose title
    /// contains `name`. Standalone inventory items are summed by title when no
    /// product matches.
    pub async fn stock_total(&self, name: &str) -> Result<Decimal, CommandError> {
        let products = self.search(name).await?;

        if products.is_empty() {
            return self
                .repos
                .inventory
                .available_by_title(name.trim())
                .await
                .map_err(persistence("checking stock"));
        }

        let mut total = Decimal::ZERO;
        for product in &products {
            let variants = self
                .repos
                .variants
                .list_by_product(&product.id)
                .await
                .map_err(persistence("checking stock"))?;
            for item_id in variants.iter().filter_map(|variant| variant.inventory_item_id.as_ref()) {
                if let Some(level) = self
                    .repos
                    .inventory
                    .stock_level(item_id)
                    .await
                    .map_err(persistence("checking stock"))?
                {
                    total += level.available();
                }
            }
        }

        Ok(total)
    }

    pub async fn counts(&self) -> Result<CatalogCounts, CommandError> {
        let products = &self.repos.products;
        Ok(CatalogCounts {
            products: products.count(None).await.map_err(persistence("retrieving statistics"))?,
            published: products
                .count(Some(ProductStatus::Published))
                .await
                .map_err(persistence("retrieving statistics"))?,
            variants: self
                .repos
                .variants
                .count(None)
                .await
                .map_err(persistence("retrieving statistics"))?,
        })
    }

    /// Lowest and highest active price over the product and its variants.
    pub async fn product_price_range(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<PriceRange>, CommandError> {
        let now = Utc::now();
        let mut amounts: Vec<Decimal> = self
            .repos
            .pricing
            .prices_for_product(product_id, now)
            .await
            .map_err(persistence("retrieving prices"))?
            .into_iter()
            .map(|listed| listed.price.amount)
            .collect();

        let variants = self
            .repos
            .variants
            .list_by_product(product_id)
            .await
            .map_err(persistence("retrieving prices"))?;
        for variant in &variants {
            let prices = self
                .repos
                .pricing
                .prices_for_variant(&variant.id, now)
                .await
                .map_err(persistence("retrieving prices"))?;
            amounts.extend(prices.into_iter().map(|listed| listed.price.amount));
        }

        Ok(PriceRange::from_amounts(amounts))
    }

    pub async fn variant_price_range(
        &self,
        variant_id: &VariantId,
    ) -> Result<Option<PriceRange>, CommandError> {
        let prices = self
            .repos
            .pricing
            .prices_for_variant(variant_id, Utc::now())
            .await
            .map_err(persistence("retrieving prices"))?;
        Ok(PriceRange::from_amounts(prices.into_iter().map(|listed| listed.price.amount)))
    }

    pub async fn active_categories(&self) -> Result<Vec<ProductCategory>, CommandError> {
        self.repos.categories.list_active().await.map_err(persistence("retrieving categories"))
    }

    pub async fn root_categories(&self) -> Result<Vec<ProductCategory>, CommandError> {
        self.repos.categories.list_roots().await.map_err(persistence("retrieving categories"))
    }

    pub async fn child_categories(
        &self,
        parent_id: &str,
    ) -> Result<Vec<ProductCategory>, CommandError> {
        self.repos
            .categories
            .list_children(&CategoryId(parent_id.to_owned()))
            .await
            .map_err(persistence("retrieving categories"))
    }

    pub async fn category_by_name(&self, name: &str) -> Result<ProductCategory, CommandError> {
        self.repos
            .categories
            .find_by_name(name)
            .await
            .map_err(persistence("retrieving categories"))?
            .ok_or_else(|| CommandError::not_found("Category", name))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}
