//! Chat reply rendering. Every function returns the final user-facing text.

use std::fmt::Write as _;

use rust_decimal::Decimal;

use shelfbot_core::domain::inventory::Dimensions;
use shelfbot_core::domain::pricing::PriceRange;
use shelfbot_core::domain::product::Product;
use shelfbot_core::domain::variant::ProductVariant;

use crate::catalog::{CatalogCounts, DeletedProduct, ProductDetails};
use crate::errors::CommandError;

pub const LIST_LIMIT: usize = 10;
const DETAIL_VARIANT_LIMIT: usize = 5;
const DESCRIPTION_PREVIEW_CHARS: usize = 50;
const NOT_SET: &str = "Not set";

pub const HELP: &str = "🤖 **Product & Variant Management Chatbot**\n\n\
📋 **Product Commands:**\n\n\
**CREATE:**\n\
• 'Create product with title [name] and description [desc]'\n\
• 'Add product with title [name]'\n\n\
**READ:**\n\
• 'Show all products' or 'List all products'\n\
• 'Show published products'\n\
• 'Find product [name]' or 'Get product [id]'\n\n\
**UPDATE:**\n\
• 'Update product [id] with title [new title]'\n\
• 'Update product [id] with description [new desc]'\n\n\
**DELETE:**\n\
• 'Delete product [id]' or 'Delete product [title]'\n\
• 'Remove product [id]'\n\n\
📦 **Variant Commands:**\n\n\
**CREATE VARIANT:**\n\
• 'Create variant for product [id] with title [name] and sku [sku]'\n\
• 'Add variant for product [id] with title [name]'\n\n\
**SHOW VARIANTS:**\n\
• 'Show variants for product [id]'\n\
• 'Get variant [variant_id]'\n\
• 'List all variants'\n\n\
**UPDATE VARIANT:**\n\
• 'Update variant [variant_id] with title [new title]'\n\
• 'Update variant [variant_id] with sku [new sku]'\n\n\
**DELETE VARIANT:**\n\
• 'Delete variant [variant_id]'\n\
• 'Remove variant [variant_id]'\n\n\
**STOCK:**\n\
• 'Check stock for [product name]'\n\n\
**OTHER:**\n\
• 'Status' or 'Count' - Get product and variant statistics\n\
• 'Help' - Show this message";

pub const UNKNOWN_VARIANT_OPERATION: &str =
    "❌ Please specify variant operation: create, show, update, or delete variant";

pub fn product_created(details: &ProductDetails) -> String {
    let product = &details.product;
    format!(
        "✅ **Product Created Successfully!**\n\
         📦 ID: {}\n\
         📝 Title: {}\n\
         🔗 Handle: {}\n\
         📊 Status: {}\n\
         📄 Description: {}\n\
         🔄 Variants: {}",
        product.id,
        product.title,
        product.handle,
        product.status,
        product.description.as_deref().unwrap_or_default(),
        details.variants.len()
    )
}

pub fn product_details(details: &ProductDetails) -> String {
    let product = &details.product;
    let mut out = format!(
        "📦 **Product Details**\n\n\
         🆔 ID: {}\n\
         📝 Title: {}\n\
         🔗 Handle: {}\n\
         📊 Status: {}\n\
         📄 Description: {}\n",
        product.id,
        product.title,
        or_not_set(Some(product.handle.as_str())),
        product.status,
        product.description.as_deref().filter(|text| !text.is_empty()).unwrap_or("No description"),
    );

    if let Some(range) = details.price_range {
        let _ = writeln!(out, "💲 {}", price_range(range));
    }

    let _ = writeln!(out, "🔢 Variants: {}", details.variants.len());
    if !details.variants.is_empty() {
        out.push_str("\n**Variants:**\n");
        for (index, variant) in details.variants.iter().take(DETAIL_VARIANT_LIMIT).enumerate() {
            let _ = writeln!(
                out,
                "  {}. {} (ID: {}, SKU: {})",
                index + 1,
                variant.title,
                variant.id,
                variant.sku.as_deref().unwrap_or("No SKU")
            );
        }
        if details.variants.len() > DETAIL_VARIANT_LIMIT {
            let _ = writeln!(
                out,
                "  ... and {} more variants",
                details.variants.len() - DETAIL_VARIANT_LIMIT
            );
        }
    }

    out
}

/// Products paired with their variant counts, first ten shown.
pub fn product_list(header: &str, products: &[(Product, u64)], total: usize) -> String {
    if products.is_empty() {
        return "❌ No products found.".to_owned();
    }

    let mut out = format!("📋 **{header}**\n\n");
    for (index, (product, variant_count)) in products.iter().take(LIST_LIMIT).enumerate() {
        let _ = writeln!(out, "{}. **{}** (ID: `{}`)", index + 1, product.title, product.id);
        let _ = writeln!(
            out,
            "   📊 Status: {} | 🔗 Handle: {} | 🔄 Variants: {}",
            product.status,
            or_not_set(Some(product.handle.as_str())),
            variant_count
        );
        if let Some(description) = product.description.as_deref().filter(|text| !text.is_empty()) {
            let _ = writeln!(out, "   📄 Description: {}", preview(description));
        }
        out.push('\n');
    }

    if total > LIST_LIMIT {
        let _ = writeln!(out, "... and {} more products", total - LIST_LIMIT);
    }

    out
}

pub fn product_deleted(deleted: &DeletedProduct) -> String {
    format!(
        "✅ **Product Deleted Successfully!**\n\
         🗑️ Product '{}' and its {} variant(s) have been removed from the system.",
        deleted.product.title, deleted.variants_removed
    )
}

pub fn variant_created(variant: &ProductVariant) -> String {
    format!(
        "✅ **Variant Created Successfully!**\n\
         🆔 Variant ID: {}\n\
         📦 Product ID: {}\n\
         📝 Title: {}\n\
         🏷️ SKU: {}\n\
         📊 Barcode: {}\n\
         📈 Rank: {}",
        variant.id,
        variant.product_id,
        variant.title,
        or_not_set(variant.sku.as_deref()),
        or_not_set(variant.barcode.as_deref()),
        variant.rank
    )
}

pub fn variant_details(variant: &ProductVariant) -> String {
    format!(
        "🔄 **Variant Details**\n\n\
         🆔 Variant ID: {}\n\
         📦 Product ID: {}\n\
         📝 Title: {}\n\
         🏷️ SKU: {}\n\
         📊 Barcode: {}\n\
         📈 Rank: {}\n\
         ⚙️ Manage Inventory: {}\n\
         🔄 Allow Backorder: {}\n\
         📏 Dimensions: {}",
        variant.id,
        variant.product_id,
        variant.title,
        or_not_set(variant.sku.as_deref()),
        or_not_set(variant.barcode.as_deref()),
        variant.rank,
        variant.manage_inventory,
        variant.allow_backorder,
        variant_dimensions(variant)
    )
}

pub fn variant_list(header: &str, variants: &[ProductVariant]) -> String {
    if variants.is_empty() {
        return "❌ No variants found.".to_owned();
    }

    let mut out = format!("🔄 **{header}**\n\n");
    for (index, variant) in variants.iter().take(LIST_LIMIT).enumerate() {
        let _ = writeln!(out, "{}. **{}** (ID: `{}`)", index + 1, variant.title, variant.id);
        let _ = writeln!(
            out,
            "   📦 Product ID: {} | 🏷️ SKU: {}",
            variant.product_id,
            or_not_set(variant.sku.as_deref())
        );
        let _ = writeln!(
            out,
            "   📈 Rank: {} | 📊 Barcode: {}",
            variant.rank,
            or_not_set(variant.barcode.as_deref())
        );
        out.push('\n');
    }

    if variants.len() > LIST_LIMIT {
        let _ = writeln!(out, "... and {} more variants", variants.len() - LIST_LIMIT);
    }

    out
}

pub fn variant_deleted(variant: &ProductVariant) -> String {
    format!(
        "✅ **Variant Deleted Successfully!**\n\
         🗑️ Variant '{}' has been removed from the system.",
        variant.title
    )
}

pub fn stock(product_name: &str, total: Decimal) -> String {
    format!(
        "📦 **Stock Information**\nProduct: {product_name}\nTotal Stock: {} units",
        total.normalize()
    )
}

pub fn status(counts: &CatalogCounts) -> String {
    format!(
        "📊 **System Statistics**\n\n\
         📦 Total Products: {}\n\
         ✅ Published: {}\n\
         📝 Draft: {}\n\
         🔄 Total Variants: {}\n\
         📈 Avg Variants per Product: {:.1}",
        counts.products,
        counts.published,
        counts.drafts(),
        counts.variants,
        counts.variants_per_product()
    )
}

pub fn price_range(range: PriceRange) -> String {
    if range.min == range.max {
        format!("Price: ${}", range.min.normalize())
    } else {
        format!("Price Range: ${} - ${}", range.min.normalize(), range.max.normalize())
    }
}

pub fn error(error: &CommandError) -> String {
    match error {
        CommandError::MissingField(field) => format!("❌ Please specify {field}."),
        CommandError::NotFound { entity, id } => format!("❌ {entity} with ID '{id}' not found."),
        CommandError::DuplicateTitle { title } => format!(
            "❌ A product with the title '{title}' already exists. Please use a different title."
        ),
        CommandError::Domain(error) => format!("❌ {error}"),
        CommandError::Persistence { action, source } => format!("❌ Error {action}: {source}"),
    }
}

fn or_not_set(value: Option<&str>) -> &str {
    value.filter(|text| !text.is_empty()).unwrap_or(NOT_SET)
}

fn preview(text: &str) -> String {
    if text.chars().count() > DESCRIPTION_PREVIEW_CHARS {
        let head: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_owned()
    }
}

fn variant_dimensions(variant: &ProductVariant) -> String {
    Dimensions {
        weight: variant.weight,
        length: variant.length,
        height: variant.height,
        width: variant.width,
    }
    .describe()
    .unwrap_or_else(|| NOT_SET.to_owned())
}
