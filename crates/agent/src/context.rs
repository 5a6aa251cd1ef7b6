//! Plain-text catalog snapshot handed to the generative backend.
//!
//! Sections always appear in the same order. A failed top-level listing leaves
//! its section empty; a failed per-item lookup drops only that sub-line.

use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use shelfbot_core::domain::inventory::InventoryItemId;
use shelfbot_core::domain::pricing::ListedPrice;
use shelfbot_core::domain::product::{Product, ProductStatus};
use shelfbot_core::domain::variant::ProductVariant;

use crate::catalog::CatalogRepositories;

pub const LOW_STOCK_THRESHOLD: Decimal = Decimal::TEN;

const SNAPSHOT_HEADER: &str = "=== COMPREHENSIVE E-COMMERCE INVENTORY SYSTEM ===";
const ENTRY_SEPARATOR: &str = "---";
const EMPTY_SECTION: &str = "(none)";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionKind {
    Products,
    Categories,
    InventoryItems,
    PriceLists,
    LowStock,
}

impl SectionKind {
    pub const ORDER: [Self; 5] =
        [Self::Products, Self::Categories, Self::InventoryItems, Self::PriceLists, Self::LowStock];

    pub fn heading(self) -> &'static str {
        match self {
            Self::Products => "PRODUCTS:",
            Self::Categories => "CATEGORIES:",
            Self::InventoryItems => "INVENTORY ITEMS:",
            Self::PriceLists => "PRICE LISTS:",
            Self::LowStock => "LOW STOCK ALERTS (Below 10 units):",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotSection {
    pub kind: SectionKind,
    /// One rendered block per product, category, item, list or alert.
    pub entries: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextSnapshot {
    sections: Vec<SnapshotSection>,
}

impl ContextSnapshot {
    pub fn sections(&self) -> &[SnapshotSection] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&SnapshotSection> {
        self.sections.iter().find(|section| section.kind == kind)
    }
}

impl fmt::Display for ContextSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{SNAPSHOT_HEADER}")?;
        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}", section.kind.heading())?;
            if section.entries.is_empty() {
                writeln!(f, "{EMPTY_SECTION}")?;
            }
            for entry in &section.entries {
                f.write_str(entry)?;
            }
        }
        Ok(())
    }
}

/// Reads every repository and renders the snapshot fresh for each request.
#[derive(Clone)]
pub struct ContextAggregator {
    repos: CatalogRepositories,
}

impl ContextAggregator {
    pub fn new(repos: CatalogRepositories) -> Self {
        Self { repos }
    }

    pub async fn build_snapshot(&self) -> ContextSnapshot {
        let now = Utc::now();
        let mut sections = Vec::with_capacity(SectionKind::ORDER.len());

        for kind in SectionKind::ORDER {
            let entries = match kind {
                SectionKind::Products => self.product_entries(now).await,
                SectionKind::Categories => self.category_entries().await,
                SectionKind::InventoryItems => self.inventory_entries().await,
                SectionKind::PriceLists => self.price_list_entries(now).await,
                SectionKind::LowStock => self.low_stock_entries().await,
            };
            sections.push(SnapshotSection { kind, entries });
        }

        ContextSnapshot { sections }
    }

    async fn product_entries(&self, now: DateTime<Utc>) -> Vec<String> {
        let products = match self.repos.products.list(Some(ProductStatus::Published)).await {
            Ok(products) => products,
            Err(error) => {
                warn!(event_name = "context.section_failed", section = "products", error = %error);
                return Vec::new();
            }
        };

        let mut entries = Vec::with_capacity(products.len());
        for product in &products {
            entries.push(self.product_entry(product, now).await);
        }
        entries
    }

    async fn product_entry(&self, product: &Product, now: DateTime<Utc>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Product ID: {}", product.id);
        let _ = writeln!(out, "Title: {}", product.title);
        let _ = writeln!(out, "Handle: {}", product.handle);
        let _ = writeln!(out, "Status: {}", product.status);
        if let Some(description) = product.description.as_deref().filter(|text| !text.is_empty()) {
            let _ = writeln!(out, "Description: {description}");
        }

        match self.repos.variants.list_by_product(&product.id).await {
            Ok(variants) if !variants.is_empty() => {
                out.push_str("Variants:\n");
                for variant in &variants {
                    self.write_variant(&mut out, variant, now).await;
                }
            }
            Ok(_) => {}
            Err(error) => {
                debug!(event_name = "context.line_omitted", product_id = %product.id, error = %error)
            }
        }

        match self.repos.pricing.prices_for_product(&product.id, now).await {
            Ok(prices) if !prices.is_empty() => {
                out.push_str("Product Prices:\n");
                for listed in &prices {
                    let _ = writeln!(out, "  - {}", price_line(listed));
                }
            }
            Ok(_) => {}
            Err(error) => {
                debug!(event_name = "context.line_omitted", product_id = %product.id, error = %error)
            }
        }

        let _ = writeln!(out, "{ENTRY_SEPARATOR}");
        out
    }

    async fn write_variant(&self, out: &mut String, variant: &ProductVariant, now: DateTime<Utc>) {
        let _ = writeln!(out, "  - Variant ID: {}", variant.id);
        let _ = writeln!(out, "    Title: {}", variant.title);
        if let Some(sku) = variant.sku.as_deref() {
            let _ = writeln!(out, "    SKU: {sku}");
        }

        if let Some(item_id) = &variant.inventory_item_id {
            if let Some(line) = self.stock_line(item_id).await {
                let _ = writeln!(out, "    {line}");
            }
        }

        match self.repos.pricing.prices_for_variant(&variant.id, now).await {
            Ok(prices) if !prices.is_empty() => {
                out.push_str("    Prices:\n");
                for listed in &prices {
                    let _ = writeln!(out, "      - {}", price_line(listed));
                }
            }
            Ok(_) => {}
            Err(error) => {
                debug!(event_name = "context.line_omitted", variant_id = %variant.id, error = %error)
            }
        }
    }

    async fn stock_line(&self, item_id: &InventoryItemId) -> Option<String> {
        match self.repos.inventory.stock_level(item_id).await {
            Ok(Some(level)) => Some(format!(
                "Stock - Available: {}, Incoming: {}, Reserved: {}",
                level.available().normalize(),
                level.incoming_quantity.normalize(),
                level.reserved_quantity.normalize()
            )),
            Ok(None) => None,
            Err(error) => {
                debug!(event_name = "context.line_omitted", item_id = %item_id, error = %error);
                None
            }
        }
    }

    async fn category_entries(&self) -> Vec<String> {
        let categories = match self.repos.categories.list_active().await {
            Ok(categories) => categories,
            Err(error) => {
                warn!(event_name = "context.section_failed", section = "categories", error = %error);
                return Vec::new();
            }
        };

        categories
            .iter()
            .map(|category| {
                let mut out = String::new();
                let _ = writeln!(out, "Category ID: {}", category.id);
                let _ = writeln!(out, "Name: {}", category.name);
                if let Some(description) = category.description.as_deref() {
                    let _ = writeln!(out, "Description: {description}");
                }
                let _ = writeln!(out, "Active: {}", category.is_active);
                if let Some(parent_id) = &category.parent_id {
                    let _ = writeln!(out, "Parent Category ID: {parent_id}");
                }
                let _ = writeln!(out, "{ENTRY_SEPARATOR}");
                out
            })
            .collect()
    }

    async fn inventory_entries(&self) -> Vec<String> {
        let items = match self.repos.inventory.list_items().await {
            Ok(items) => items,
            Err(error) => {
                warn!(event_name = "context.section_failed", section = "inventory_items", error = %error);
                return Vec::new();
            }
        };

        let mut entries = Vec::with_capacity(items.len());
        for item in &items {
            let mut out = String::new();
            let _ = writeln!(out, "Inventory Item ID: {}", item.id);
            let _ = writeln!(out, "Title: {}", item.title);
            if let Some(sku) = item.sku.as_deref() {
                let _ = writeln!(out, "SKU: {sku}");
            }
            if let Some(description) = item.description.as_deref() {
                let _ = writeln!(out, "Description: {description}");
            }
            if let Some(dimensions) = item.dimensions.describe() {
                let _ = writeln!(out, "Dimensions: {dimensions}");
            }
            if let Some(line) = self.stock_line(&item.id).await {
                let _ = writeln!(out, "{line}");
            }
            let _ = writeln!(out, "{ENTRY_SEPARATOR}");
            entries.push(out);
        }
        entries
    }

    async fn price_list_entries(&self, now: DateTime<Utc>) -> Vec<String> {
        let lists = match self.repos.pricing.active_price_lists(now).await {
            Ok(lists) => lists,
            Err(error) => {
                warn!(event_name = "context.section_failed", section = "price_lists", error = %error);
                return Vec::new();
            }
        };

        lists
            .iter()
            .map(|list| {
                let mut out = String::new();
                let _ = writeln!(out, "Price List ID: {}", list.id);
                let _ = writeln!(out, "Title: {}", list.title);
                let _ = writeln!(out, "Type: {}", list.list_type);
                let _ = writeln!(out, "Status: {}", list.status);
                if let Some(starts_at) = list.starts_at {
                    let _ = writeln!(out, "Starts At: {}", starts_at.to_rfc3339());
                }
                if let Some(ends_at) = list.ends_at {
                    let _ = writeln!(out, "Ends At: {}", ends_at.to_rfc3339());
                }
                let _ = writeln!(out, "{ENTRY_SEPARATOR}");
                out
            })
            .collect()
    }

    async fn low_stock_entries(&self) -> Vec<String> {
        match self.repos.inventory.below_threshold(LOW_STOCK_THRESHOLD).await {
            Ok(items) => items
                .iter()
                .map(|low| {
                    format!("- {} ({} units)\n", low.item.title, low.level.available().normalize())
                })
                .collect(),
            Err(error) => {
                warn!(event_name = "context.section_failed", section = "low_stock", error = %error);
                Vec::new()
            }
        }
    }
}

fn price_line(listed: &ListedPrice) -> String {
    format!(
        "${} ({})",
        listed.price.amount.normalize(),
        listed.price_list_title.as_deref().unwrap_or("Base price")
    )
}

/// Wraps the snapshot and the user's question into one instruction prompt.
pub fn chat_prompt(snapshot: &ContextSnapshot, query: &str) -> String {
    format!(
        "You are an advanced e-commerce assistant with access to a comprehensive inventory management system.\n\n\
         SYSTEM CAPABILITIES:\n\
         - Product catalog with variants and detailed information\n\
         - Real-time inventory tracking with stock levels\n\
         - Dynamic pricing with multiple price lists\n\
         - Category hierarchy management\n\
         - Low stock monitoring and alerts\n\n\
         CURRENT SYSTEM DATA:\n\
         {snapshot}\n\n\
         INSTRUCTIONS:\n\
         - Provide specific, accurate information based on the data above\n\
         - When discussing stock, always mention current availability\n\
         - For pricing queries, show all relevant price options\n\
         - Include product variants when relevant\n\
         - Suggest related products or categories when appropriate\n\
         - Alert users about low stock items when relevant\n\
         - Use clear formatting with emojis for better readability\n\
         - If data is missing, acknowledge it and suggest alternatives\n\n\
         USER QUERY: {query}\n\n\
         RESPONSE:"
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use shelfbot_core::domain::inventory::{
        Dimensions, InventoryItem, InventoryItemId, InventoryLevel, LowStockItem,
    };
    use shelfbot_core::domain::pricing::{ListedPrice, Price, PriceList};
    use shelfbot_core::domain::product::{Product, ProductId, ProductStatus};
    use shelfbot_core::domain::variant::{ProductVariant, VariantId};
    use shelfbot_db::repositories::{InventoryRepository, PricingRepository, RepositoryError};

    use crate::catalog::CatalogRepositories;

    use super::{chat_prompt, ContextAggregator, SectionKind};

    fn lookup_failure() -> RepositoryError {
        RepositoryError::Decode("corrupt row".to_owned())
    }

    /// Delegates to the wrapped repository but fails price lookups for one variant.
    struct FlakyPricing {
        inner: Arc<dyn PricingRepository>,
        failing_variant: VariantId,
    }

    #[async_trait]
    impl PricingRepository for FlakyPricing {
        async fn active_price_lists(
            &self,
            now: DateTime<Utc>,
        ) -> Result<Vec<PriceList>, RepositoryError> {
            self.inner.active_price_lists(now).await
        }

        async fn prices_for_product(
            &self,
            product_id: &ProductId,
            now: DateTime<Utc>,
        ) -> Result<Vec<ListedPrice>, RepositoryError> {
            self.inner.prices_for_product(product_id, now).await
        }

        async fn prices_for_variant(
            &self,
            variant_id: &VariantId,
            now: DateTime<Utc>,
        ) -> Result<Vec<ListedPrice>, RepositoryError> {
            if *variant_id == self.failing_variant {
                return Err(lookup_failure());
            }
            self.inner.prices_for_variant(variant_id, now).await
        }

        async fn save_price_list(&self, price_list: PriceList) -> Result<(), RepositoryError> {
            self.inner.save_price_list(price_list).await
        }

        async fn save_price(&self, price: Price) -> Result<(), RepositoryError> {
            self.inner.save_price(price).await
        }
    }

    /// Delegates to the wrapped repository but fails stock lookups for one item.
    struct FlakyInventory {
        inner: Arc<dyn InventoryRepository>,
        failing_item: InventoryItemId,
    }

    #[async_trait]
    impl InventoryRepository for FlakyInventory {
        async fn list_items(&self) -> Result<Vec<InventoryItem>, RepositoryError> {
            self.inner.list_items().await
        }

        async fn find_item(
            &self,
            id: &InventoryItemId,
        ) -> Result<Option<InventoryItem>, RepositoryError> {
            self.inner.find_item(id).await
        }

        async fn save_item(&self, item: InventoryItem) -> Result<(), RepositoryError> {
            self.inner.save_item(item).await
        }

        async fn stock_level(
            &self,
            item_id: &InventoryItemId,
        ) -> Result<Option<InventoryLevel>, RepositoryError> {
            if *item_id == self.failing_item {
                return Err(lookup_failure());
            }
            self.inner.stock_level(item_id).await
        }

        async fn set_stock_level(&self, level: InventoryLevel) -> Result<(), RepositoryError> {
            self.inner.set_stock_level(level).await
        }

        async fn below_threshold(
            &self,
            threshold: Decimal,
        ) -> Result<Vec<LowStockItem>, RepositoryError> {
            self.inner.below_threshold(threshold).await
        }

        async fn available_by_title(&self, fragment: &str) -> Result<Decimal, RepositoryError> {
            self.inner.available_by_title(fragment).await
        }
    }

    async fn variant_price(repos: &CatalogRepositories, id: &str, variant: &VariantId, cents: i64) {
        repos
            .pricing
            .save_price(Price {
                id: id.to_owned(),
                price_list_id: None,
                variant_id: Some(variant.clone()),
                product_id: None,
                currency_code: "usd".to_owned(),
                amount: Decimal::new(cents, 2),
            })
            .await
            .expect("price");
    }

    async fn stock_item(repos: &CatalogRepositories, id: &str, title: &str, stocked: i64) {
        let item_id = InventoryItemId(id.to_owned());
        repos
            .inventory
            .save_item(InventoryItem {
                id: item_id.clone(),
                title: title.to_owned(),
                sku: None,
                description: None,
                dimensions: Dimensions { weight: Some(300), ..Dimensions::default() },
                created_at: Utc::now(),
            })
            .await
            .expect("item");
        repos
            .inventory
            .set_stock_level(InventoryLevel {
                id: format!("ilev_{id}"),
                inventory_item_id: item_id,
                stocked_quantity: Decimal::new(stocked, 0),
                reserved_quantity: Decimal::ZERO,
                incoming_quantity: Decimal::ZERO,
            })
            .await
            .expect("level");
    }

    #[tokio::test]
    async fn empty_catalog_renders_every_section_in_order() {
        let snapshot = ContextAggregator::new(CatalogRepositories::in_memory()).build_snapshot().await;
        let kinds: Vec<SectionKind> = snapshot.sections().iter().map(|section| section.kind).collect();
        assert_eq!(kinds, SectionKind::ORDER);

        let text = snapshot.to_string();
        let positions: Vec<usize> = SectionKind::ORDER
            .iter()
            .map(|kind| text.find(kind.heading()).expect("heading present"))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{text}");
        assert_eq!(text.matches("(none)").count(), 5);
    }

    #[tokio::test]
    async fn published_products_carry_variant_stock_and_prices() {
        let repos = CatalogRepositories::in_memory();
        let now = Utc::now();

        let product = Product::new("Cool T-Shirt", None, ProductStatus::Published, now);
        let hidden = Product::new("Secret Draft", None, ProductStatus::Draft, now);
        let mut variant = ProductVariant::default_for(&product, now);
        variant.inventory_item_id = Some(InventoryItemId("iitem_tee".to_owned()));

        repos.products.save(product.clone()).await.expect("product");
        repos.products.save(hidden).await.expect("draft");
        repos.variants.save(variant.clone()).await.expect("variant");
        stock_item(&repos, "iitem_tee", "Cool T-Shirt Stock", 4).await;
        variant_price(&repos, "price_1", &variant.id, 1999).await;

        let snapshot = ContextAggregator::new(repos).build_snapshot().await;
        let products = snapshot.section(SectionKind::Products).expect("products");
        assert_eq!(products.entries.len(), 1);

        let entry = &products.entries[0];
        assert!(entry.contains(&format!("Product ID: {}", product.id)));
        assert!(entry.contains(&format!("  - Variant ID: {}", variant.id)));
        assert!(entry.contains("    Stock - Available: 4, Incoming: 0, Reserved: 0"));
        assert!(entry.contains("      - $19.99 (Base price)"));

        let low = snapshot.section(SectionKind::LowStock).expect("low stock");
        assert_eq!(low.entries, vec!["- Cool T-Shirt Stock (4 units)\n".to_owned()]);

        let items = snapshot.section(SectionKind::InventoryItems).expect("items");
        assert!(items.entries[0].contains("Dimensions: Weight: 300g"));
    }

    #[tokio::test]
    async fn failed_item_lookups_drop_only_their_own_lines() {
        let mut repos = CatalogRepositories::in_memory();
        let now = Utc::now();

        let product = Product::new("Canvas Tote", None, ProductStatus::Published, now);
        let mut small = ProductVariant::new(product.id.clone(), "Small", 1, now);
        small.inventory_item_id = Some(InventoryItemId("iitem_small".to_owned()));
        let mut large = ProductVariant::new(product.id.clone(), "Large", 2, now);
        large.inventory_item_id = Some(InventoryItemId("iitem_large".to_owned()));

        repos.products.save(product.clone()).await.expect("product");
        repos.variants.save(small.clone()).await.expect("small");
        repos.variants.save(large.clone()).await.expect("large");
        stock_item(&repos, "iitem_small", "Tote Small Stock", 12).await;
        stock_item(&repos, "iitem_large", "Tote Large Stock", 30).await;
        variant_price(&repos, "price_small", &small.id, 1500).await;
        variant_price(&repos, "price_large", &large.id, 1800).await;

        repos.pricing =
            Arc::new(FlakyPricing { inner: repos.pricing.clone(), failing_variant: small.id.clone() });
        repos.inventory = Arc::new(FlakyInventory {
            inner: repos.inventory.clone(),
            failing_item: InventoryItemId("iitem_large".to_owned()),
        });

        let snapshot = ContextAggregator::new(repos).build_snapshot().await;
        let kinds: Vec<SectionKind> = snapshot.sections().iter().map(|section| section.kind).collect();
        assert_eq!(kinds, SectionKind::ORDER);

        let products = snapshot.section(SectionKind::Products).expect("products");
        assert_eq!(products.entries.len(), 1);
        let entry = &products.entries[0];
        assert!(entry.contains(&format!("Product ID: {}", product.id)));
        assert!(entry.contains(&format!("  - Variant ID: {}", small.id)));
        assert!(entry.contains(&format!("  - Variant ID: {}", large.id)));

        assert!(entry.contains("Stock - Available: 12, Incoming: 0, Reserved: 0"));
        assert!(!entry.contains("Stock - Available: 30"));
        assert!(entry.contains("      - $18 (Base price)"));
        assert!(!entry.contains("$15"));
        assert_eq!(entry.matches("    Prices:").count(), 1);

        let items = snapshot.section(SectionKind::InventoryItems).expect("items");
        assert_eq!(items.entries.len(), 2);
        assert!(items.entries.iter().any(|item| item.contains("Title: Tote Large Stock")));
        assert!(!snapshot.to_string().contains("Available: 30"));
    }

    #[test]
    fn prompt_embeds_query_after_data() {
        let snapshot = super::ContextSnapshot { sections: Vec::new() };
        let prompt = chat_prompt(&snapshot, "what is low on stock?");
        assert!(prompt.contains("CURRENT SYSTEM DATA:\n=== COMPREHENSIVE E-COMMERCE INVENTORY SYSTEM ==="));
        assert!(prompt.ends_with("USER QUERY: what is low on stock?\n\nRESPONSE:"));
    }
}
