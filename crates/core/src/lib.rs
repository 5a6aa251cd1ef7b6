pub mod config;
pub mod domain;
pub mod errors;

pub use domain::category::{CategoryId, ProductCategory};
pub use domain::inventory::{Dimensions, InventoryItem, InventoryItemId, InventoryLevel, LowStockItem};
pub use domain::pricing::{
    ListedPrice, Price, PriceList, PriceListId, PriceListStatus, PriceListType, PriceRange,
};
pub use domain::product::{handle_from_title, Product, ProductId, ProductStatus};
pub use domain::variant::{default_sku, ProductVariant, VariantId, DEFAULT_VARIANT_TITLE};
pub use errors::{ApplicationError, DomainError, InterfaceError};
