use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use shelfbot_core::domain::category::{CategoryId, ProductCategory};
use shelfbot_core::domain::inventory::{
    InventoryItem, InventoryItemId, InventoryLevel, LowStockItem,
};
use shelfbot_core::domain::pricing::{ListedPrice, Price, PriceList};
use shelfbot_core::domain::product::{Product, ProductId, ProductStatus};
use shelfbot_core::domain::variant::{ProductVariant, VariantId};

use super::{
    CategoryRepository, InventoryRepository, PricingRepository, ProductRepository,
    RepositoryError, VariantRepository,
};

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    async fn sorted(&self, keep: impl Fn(&Product) -> bool) -> Vec<Product> {
        let products = self.products.read().await;
        let mut matching: Vec<Product> =
            products.values().filter(|product| keep(product)).cloned().collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        matching
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Product>, RepositoryError> {
        let wanted = title.trim().to_lowercase();
        Ok(self.sorted(|product| product.title.to_lowercase() == wanted).await.into_iter().next())
    }

    async fn search_by_title(&self, fragment: &str) -> Result<Vec<Product>, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        Ok(self.sorted(|product| product.title.to_lowercase().contains(&needle)).await)
    }

    async fn list(&self, status: Option<ProductStatus>) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.sorted(|product| status.map_or(true, |wanted| product.status == wanted)).await)
    }

    async fn count(&self, status: Option<ProductStatus>) -> Result<u64, RepositoryError> {
        let products = self.products.read().await;
        let total = products
            .values()
            .filter(|product| status.map_or(true, |wanted| product.status == wanted))
            .count();
        Ok(total as u64)
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product);
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().await;
        Ok(products.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryVariantRepository {
    variants: RwLock<HashMap<String, ProductVariant>>,
}

impl InMemoryVariantRepository {
    async fn ranked(&self, keep: impl Fn(&ProductVariant) -> bool) -> Vec<ProductVariant> {
        let variants = self.variants.read().await;
        let mut matching: Vec<ProductVariant> =
            variants.values().filter(|variant| keep(variant)).cloned().collect();
        matching.sort_by(|a, b| {
            a.product_id
                .0
                .cmp(&b.product_id.0)
                .then_with(|| a.rank.cmp(&b.rank))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        matching
    }

    async fn first_where(&self, keep: impl Fn(&ProductVariant) -> bool) -> Option<ProductVariant> {
        let variants = self.variants.read().await;
        variants
            .values()
            .filter(|variant| keep(variant))
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)))
            .cloned()
    }
}

#[async_trait::async_trait]
impl VariantRepository for InMemoryVariantRepository {
    async fn find_by_id(&self, id: &VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        let variants = self.variants.read().await;
        Ok(variants.get(&id.0).cloned())
    }

    async fn list_by_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        let variants = self.variants.read().await;
        let mut matching: Vec<ProductVariant> =
            variants.values().filter(|variant| &variant.product_id == product_id).cloned().collect();
        matching.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(matching)
    }

    async fn list_all(&self) -> Result<Vec<ProductVariant>, RepositoryError> {
        Ok(self.ranked(|_| true).await)
    }

    async fn list_active(
        &self,
        product_id: Option<&ProductId>,
    ) -> Result<Vec<ProductVariant>, RepositoryError> {
        Ok(self
            .ranked(|variant| {
                variant.is_active()
                    && product_id.map_or(true, |wanted| &variant.product_id == wanted)
            })
            .await)
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<ProductVariant>, RepositoryError> {
        Ok(self.first_where(|variant| variant.sku.as_deref() == Some(sku)).await)
    }

    async fn find_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        Ok(self.first_where(|variant| variant.barcode.as_deref() == Some(barcode)).await)
    }

    async fn search_by_title(&self, fragment: &str) -> Result<Vec<ProductVariant>, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        Ok(self.ranked(|variant| variant.title.to_lowercase().contains(&needle)).await)
    }

    async fn search_by_sku(&self, fragment: &str) -> Result<Vec<ProductVariant>, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        Ok(self
            .ranked(|variant| {
                variant.sku.as_deref().is_some_and(|sku| sku.to_lowercase().contains(&needle))
            })
            .await)
    }

    async fn max_rank(&self, product_id: &ProductId) -> Result<Option<i32>, RepositoryError> {
        let variants = self.variants.read().await;
        Ok(variants
            .values()
            .filter(|variant| &variant.product_id == product_id)
            .map(|variant| variant.rank)
            .max())
    }

    async fn count(&self, product_id: Option<&ProductId>) -> Result<u64, RepositoryError> {
        let variants = self.variants.read().await;
        let total = variants
            .values()
            .filter(|variant| product_id.map_or(true, |wanted| &variant.product_id == wanted))
            .count();
        Ok(total as u64)
    }

    async fn save(&self, variant: ProductVariant) -> Result<(), RepositoryError> {
        let mut variants = self.variants.write().await;
        variants.insert(variant.id.0.clone(), variant);
        Ok(())
    }

    async fn delete(&self, id: &VariantId) -> Result<bool, RepositoryError> {
        let mut variants = self.variants.write().await;
        Ok(variants.remove(&id.0).is_some())
    }

    async fn soft_delete(&self, id: &VariantId, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut variants = self.variants.write().await;
        Ok(match variants.get_mut(&id.0) {
            Some(variant) => {
                variant.deleted_at = Some(at);
                variant.updated_at = at;
                true
            }
            None => false,
        })
    }

    async fn delete_by_product(&self, product_id: &ProductId) -> Result<u64, RepositoryError> {
        let mut variants = self.variants.write().await;
        let before = variants.len();
        variants.retain(|_, variant| &variant.product_id != product_id);
        Ok((before - variants.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: RwLock<HashMap<String, ProductCategory>>,
}

impl InMemoryCategoryRepository {
    async fn active_where(&self, keep: impl Fn(&ProductCategory) -> bool) -> Vec<ProductCategory> {
        let categories = self.categories.read().await;
        let mut matching: Vec<ProductCategory> = categories
            .values()
            .filter(|category| category.is_active && keep(category))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name)));
        matching
    }
}

#[async_trait::async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_id(
        &self,
        id: &CategoryId,
    ) -> Result<Option<ProductCategory>, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories.get(&id.0).cloned())
    }

    async fn list_active(&self) -> Result<Vec<ProductCategory>, RepositoryError> {
        Ok(self.active_where(|_| true).await)
    }

    async fn list_roots(&self) -> Result<Vec<ProductCategory>, RepositoryError> {
        Ok(self.active_where(ProductCategory::is_root).await)
    }

    async fn list_children(
        &self,
        parent_id: &CategoryId,
    ) -> Result<Vec<ProductCategory>, RepositoryError> {
        Ok(self.active_where(|category| category.parent_id.as_ref() == Some(parent_id)).await)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ProductCategory>, RepositoryError> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .active_where(|category| category.name.to_lowercase() == wanted)
            .await
            .into_iter()
            .next())
    }

    async fn save(&self, category: ProductCategory) -> Result<(), RepositoryError> {
        let mut categories = self.categories.write().await;
        categories.insert(category.id.0.clone(), category);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInventoryRepository {
    items: RwLock<HashMap<String, InventoryItem>>,
    levels: RwLock<HashMap<String, InventoryLevel>>,
}

impl InMemoryInventoryRepository {
    async fn stocked_items(&self) -> Vec<LowStockItem> {
        let items = self.items.read().await;
        let levels = self.levels.read().await;
        let mut stocked: Vec<LowStockItem> = levels
            .values()
            .filter_map(|level| {
                items
                    .get(&level.inventory_item_id.0)
                    .map(|item| LowStockItem { item: item.clone(), level: level.clone() })
            })
            .collect();
        stocked.sort_by(|a, b| a.item.title.cmp(&b.item.title));
        stocked
    }
}

#[async_trait::async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn list_items(&self) -> Result<Vec<InventoryItem>, RepositoryError> {
        let items = self.items.read().await;
        let mut all: Vec<InventoryItem> = items.values().cloned().collect();
        all.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(all)
    }

    async fn find_item(
        &self,
        id: &InventoryItemId,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(&id.0).cloned())
    }

    async fn save_item(&self, item: InventoryItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.id.0.clone(), item);
        Ok(())
    }

    async fn stock_level(
        &self,
        item_id: &InventoryItemId,
    ) -> Result<Option<InventoryLevel>, RepositoryError> {
        let levels = self.levels.read().await;
        Ok(levels.get(&item_id.0).cloned())
    }

    async fn set_stock_level(&self, level: InventoryLevel) -> Result<(), RepositoryError> {
        let mut levels = self.levels.write().await;
        levels.insert(level.inventory_item_id.0.clone(), level);
        Ok(())
    }

    async fn below_threshold(
        &self,
        threshold: Decimal,
    ) -> Result<Vec<LowStockItem>, RepositoryError> {
        Ok(self
            .stocked_items()
            .await
            .into_iter()
            .filter(|entry| entry.level.available() < threshold)
            .collect())
    }

    async fn available_by_title(&self, fragment: &str) -> Result<Decimal, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        Ok(self
            .stocked_items()
            .await
            .iter()
            .filter(|entry| entry.item.title.to_lowercase().contains(&needle))
            .map(|entry| entry.level.available())
            .sum())
    }
}

#[derive(Default)]
pub struct InMemoryPricingRepository {
    lists: RwLock<HashMap<String, PriceList>>,
    prices: RwLock<Vec<Price>>,
}

impl InMemoryPricingRepository {
    async fn listed(&self, keep: impl Fn(&Price) -> bool, now: DateTime<Utc>) -> Vec<ListedPrice> {
        let lists = self.lists.read().await;
        let prices = self.prices.read().await;
        prices
            .iter()
            .filter(|price| keep(price))
            .filter_map(|price| match &price.price_list_id {
                None => Some(ListedPrice { price: price.clone(), price_list_title: None }),
                Some(list_id) => lists.get(&list_id.0).filter(|list| list.is_active_at(now)).map(
                    |list| ListedPrice {
                        price: price.clone(),
                        price_list_title: Some(list.title.clone()),
                    },
                ),
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl PricingRepository for InMemoryPricingRepository {
    async fn active_price_lists(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceList>, RepositoryError> {
        let lists = self.lists.read().await;
        let mut active: Vec<PriceList> =
            lists.values().filter(|list| list.is_active_at(now)).cloned().collect();
        active.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(active)
    }

    async fn prices_for_product(
        &self,
        product_id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListedPrice>, RepositoryError> {
        Ok(self.listed(|price| price.product_id.as_ref() == Some(product_id), now).await)
    }

    async fn prices_for_variant(
        &self,
        variant_id: &VariantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListedPrice>, RepositoryError> {
        Ok(self.listed(|price| price.variant_id.as_ref() == Some(variant_id), now).await)
    }

    async fn save_price_list(&self, price_list: PriceList) -> Result<(), RepositoryError> {
        let mut lists = self.lists.write().await;
        lists.insert(price_list.id.0.clone(), price_list);
        Ok(())
    }

    async fn save_price(&self, price: Price) -> Result<(), RepositoryError> {
        let mut prices = self.prices.write().await;
        prices.retain(|existing| existing.id != price.id);
        prices.push(price);
        Ok(())
    }
}
