use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub const PREFIX: &'static str = "prod_";

    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, short_token()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Proposed,
    Published,
    Rejected,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Proposed => "proposed",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

impl Default for ProductStatus {
    fn default() -> Self {
        Self::Published
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "proposed" => Ok(Self::Proposed),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::InvalidStatus(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub handle: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        status: ProductStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        Self {
            id: ProductId::generate(),
            handle: handle_from_title(&title),
            title,
            description,
            thumbnail: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the title and keeps the handle in step with it.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.handle = handle_from_title(&self.title);
    }
}

/// Lowercase, dash separated slug. Runs of dashes collapse and edges are trimmed.
pub fn handle_from_title(title: &str) -> String {
    let mut handle = String::with_capacity(title.len());
    for ch in title.trim().to_lowercase().chars() {
        let mapped = if ch.is_whitespace() { '-' } else { ch };
        if !(mapped.is_ascii_lowercase() || mapped.is_ascii_digit() || mapped == '-') {
            continue;
        }
        if mapped == '-' && handle.ends_with('-') {
            continue;
        }
        handle.push(mapped);
    }

    handle.trim_matches('-').to_owned()
}

pub(crate) fn short_token() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}
