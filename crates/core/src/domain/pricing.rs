use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::domain::variant::VariantId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceListId(pub String);

impl fmt::Display for PriceListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceListType {
    Sale,
    Override,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceListStatus {
    Active,
    Draft,
}

macro_rules! str_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(DomainError::InvariantViolation(format!(
                        "unknown {} `{other}`",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

str_enum!(PriceListType { Sale => "sale", Override => "override" });
str_enum!(PriceListStatus { Active => "active", Draft => "draft" });

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    pub id: PriceListId,
    pub title: String,
    pub description: Option<String>,
    pub list_type: PriceListType,
    pub status: PriceListStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl PriceList {
    /// Active status and `now` inside the optional start/end window.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PriceListStatus::Active
            && self.starts_at.map_or(true, |starts_at| starts_at <= now)
            && self.ends_at.map_or(true, |ends_at| ends_at >= now)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub price_list_id: Option<PriceListId>,
    pub variant_id: Option<VariantId>,
    pub product_id: Option<ProductId>,
    pub currency_code: String,
    pub amount: Decimal,
}

/// A price together with the title of the list it belongs to, when it has one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedPrice {
    pub price: Price,
    pub price_list_title: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceRange {
    pub fn from_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Option<Self> {
        amounts.into_iter().fold(None, |range, amount| match range {
            None => Some(Self { min: amount, max: amount }),
            Some(Self { min, max }) => Some(Self { min: min.min(amount), max: max.max(amount) }),
        })
    }
}
