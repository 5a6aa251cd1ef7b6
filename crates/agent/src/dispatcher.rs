use tracing::{debug, error};

use shelfbot_core::domain::product::{Product, ProductStatus};

use crate::catalog::{CatalogService, NewProduct, NewVariant, ProductUpdate, VariantUpdate};
use crate::errors::CommandError;
use crate::extract::{self, ExtractedFields};
use crate::format;
use crate::intent::{classify, Command, Intent};

/// Routes a classified message to its catalog operation and renders the reply.
#[derive(Clone)]
pub struct CommandDispatcher {
    catalog: CatalogService,
}

impl CommandDispatcher {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// Classifies, extracts and dispatches in one step.
    pub async fn handle(&self, command: &Command) -> String {
        let intent = classify(&command.normalized_text);
        let fields = ExtractedFields::from_text(&command.raw_text);
        debug!(event_name = "chat.classified", intent = ?intent);
        self.dispatch(intent, &fields, command).await
    }

    /// Never fails: validation misses, lookups and persistence errors all come
    /// back as reply text.
    pub async fn dispatch(&self, intent: Intent, fields: &ExtractedFields, command: &Command) -> String {
        let outcome = match intent {
            Intent::CreateProduct => self.create_product(fields).await,
            Intent::ReadProduct => self.read_product(fields, command).await,
            Intent::UpdateProduct => self.update_product(fields).await,
            Intent::DeleteProduct => self.delete_product(fields, command).await,
            Intent::VariantCreate => self.create_variant(fields).await,
            Intent::VariantRead => self.read_variants(fields).await,
            Intent::VariantUpdate => self.update_variant(fields).await,
            Intent::VariantDelete => self.delete_variant(fields).await,
            Intent::StockQuery => self.stock(command).await,
            Intent::Status => self.catalog.counts().await.map(|counts| format::status(&counts)),
            Intent::Help => Ok(format::HELP.to_owned()),
            Intent::Unknown => Ok(format::UNKNOWN_VARIANT_OPERATION.to_owned()),
        };

        outcome.unwrap_or_else(|failure| {
            match &failure {
                CommandError::Persistence { .. } => {
                    error!(event_name = "chat.persistence_failed", intent = ?intent, error = %failure)
                }
                _ => debug!(event_name = "chat.command_rejected", intent = ?intent, error = %failure),
            }
            format::error(&failure)
        })
    }

    async fn create_product(&self, fields: &ExtractedFields) -> Result<String, CommandError> {
        let Some(title) = fields.title.clone() else {
            return Ok("❌ Please specify a product title.\n\
                       Example: 'Create product with title Premium T-Shirt and description High quality cotton shirt'"
                .to_owned());
        };

        let request = NewProduct {
            title,
            description: fields.description.clone(),
            status: fields.status.clone(),
        };
        let details = self.catalog.create_product(request).await?;
        Ok(format::product_created(&details))
    }

    async fn read_product(
        &self,
        fields: &ExtractedFields,
        command: &Command,
    ) -> Result<String, CommandError> {
        if let Some(id) = &fields.product_id {
            let product = self.catalog.product(id).await?;
            let details = self.catalog.details(product).await?;
            return Ok(format::product_details(&details));
        }

        let term = fields
            .title
            .clone()
            .or_else(|| extract::quoted_value(&command.raw_text))
            .or_else(|| extract::loose_product_name(&command.raw_text));
        if let Some(term) = term {
            let products = self.catalog.search(&term).await?;
            if products.is_empty() {
                return Ok(format!("❌ No products found with title containing '{term}'"));
            }
            return self.product_list(&format!("Products matching '{term}':"), products).await;
        }

        let normalized = &command.normalized_text;
        if normalized.contains("all") && !normalized.contains("published") {
            let products = self.catalog.list(None).await?;
            self.product_list("All Products:", products).await
        } else {
            let products = self.catalog.list(Some(ProductStatus::Published)).await?;
            self.product_list("Published Products:", products).await
        }
    }

    async fn product_list(
        &self,
        header: &str,
        products: Vec<Product>,
    ) -> Result<String, CommandError> {
        let total = products.len();
        let mut rows = Vec::with_capacity(total.min(format::LIST_LIMIT));
        for product in products.into_iter().take(format::LIST_LIMIT) {
            let count = self.catalog.variant_count(&product.id).await?;
            rows.push((product, count));
        }
        Ok(format::product_list(header, &rows, total))
    }

    async fn update_product(&self, fields: &ExtractedFields) -> Result<String, CommandError> {
        let Some(id) = &fields.product_id else {
            return Ok("❌ Please specify a product ID.\n\
                       Example: 'Update product prod_123 with title New Title'"
                .to_owned());
        };

        let update = ProductUpdate {
            title: fields.title.clone(),
            description: fields.description.clone(),
            status: fields.status.clone(),
        };
        let product = self.catalog.update_product(id, update).await?;
        let details = self.catalog.details(product).await?;
        Ok(format!("✅ **Product Updated Successfully!**\n{}", format::product_details(&details)))
    }

    async fn delete_product(
        &self,
        fields: &ExtractedFields,
        command: &Command,
    ) -> Result<String, CommandError> {
        let identifier = fields
            .product_id
            .clone()
            .or_else(|| fields.title.clone())
            .or_else(|| extract::quoted_value(&command.raw_text))
            .or_else(|| extract::loose_product_name(&command.raw_text));
        let Some(identifier) = identifier else {
            return Ok("❌ Please specify a product ID or title.\n\
                       Examples:\n\
                       • 'Delete product prod_123'\n\
                       • 'Delete product Premium T-Shirt'"
                .to_owned());
        };

        match self.catalog.delete_product(&identifier).await {
            Ok(deleted) => Ok(format::product_deleted(&deleted)),
            Err(CommandError::NotFound { .. }) => Ok(format!(
                "❌ Product '{identifier}' not found. Please check the ID or title and try again."
            )),
            Err(other) => Err(other),
        }
    }

    async fn create_variant(&self, fields: &ExtractedFields) -> Result<String, CommandError> {
        let Some(product_id) = &fields.product_id else {
            return Ok("❌ Please specify a product ID for the variant.\n\
                       Example: 'Create variant for product prod_123 with title Red Large and sku RED-L-001'"
                .to_owned());
        };

        let Some(title) = fields.title.clone() else {
            self.catalog.product(product_id).await?;
            return Ok("❌ Please specify a variant title.\n\
                       Example: 'Create variant for product prod_123 with title Red Large and sku RED-L-001'"
                .to_owned());
        };

        let request = NewVariant { title, sku: fields.sku.clone(), barcode: fields.barcode.clone() };
        let variant = self.catalog.create_variant(product_id, request).await?;
        Ok(format::variant_created(&variant))
    }

    async fn read_variants(&self, fields: &ExtractedFields) -> Result<String, CommandError> {
        if let Some(id) = &fields.variant_id {
            let variant = self.catalog.variant(id).await?;
            return Ok(format::variant_details(&variant));
        }

        if let Some(product_id) = &fields.product_id {
            let variants = self.catalog.variants_for(product_id).await?;
            if variants.is_empty() {
                return Ok(format!("📦 No variants found for product ID '{product_id}'"));
            }
            return Ok(format::variant_list(&format!("Variants for product {product_id}"), &variants));
        }

        let variants = self.catalog.all_variants().await?;
        if variants.is_empty() {
            return Ok("📦 No variants found in the system.".to_owned());
        }
        Ok(format::variant_list("All Product Variants", &variants))
    }

    async fn update_variant(&self, fields: &ExtractedFields) -> Result<String, CommandError> {
        let Some(id) = &fields.variant_id else {
            return Ok("❌ Please specify a variant ID.\n\
                       Example: 'Update variant variant_123 with title Blue Medium'"
                .to_owned());
        };

        let update = VariantUpdate {
            title: fields.title.clone(),
            sku: fields.sku.clone(),
            barcode: fields.barcode.clone(),
        };
        let variant = self.catalog.update_variant(id, update).await?;
        Ok(format!("✅ **Variant Updated Successfully!**\n{}", format::variant_details(&variant)))
    }

    async fn delete_variant(&self, fields: &ExtractedFields) -> Result<String, CommandError> {
        let Some(id) = &fields.variant_id else {
            return Ok("❌ Please specify a variant ID.\nExample: 'Delete variant variant_123'".to_owned());
        };

        match self.catalog.delete_variant(id).await {
            Ok(variant) => Ok(format::variant_deleted(&variant)),
            Err(CommandError::NotFound { .. }) => Ok(format!("❌ Variant '{id}' not found.")),
            Err(other) => Err(other),
        }
    }

    async fn stock(&self, command: &Command) -> Result<String, CommandError> {
        let Some(name) = extract::stock_product_name(&command.raw_text) else {
            return Ok("❌ Please specify a product name for stock check.\n\
                       Example: 'Check stock for Premium T-Shirt'"
                .to_owned());
        };

        let total = self.catalog.stock_total(&name).await?;
        Ok(format::stock(&name, total))
    }
}
