pub mod category;
pub mod inventory;
pub mod pricing;
pub mod product;
pub mod variant;
