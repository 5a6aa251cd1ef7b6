use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub handle: String,
    pub is_active: bool,
    pub is_internal: bool,
    pub parent_id: Option<CategoryId>,
    pub rank: i32,
    pub created_at: DateTime<Utc>,
}

impl ProductCategory {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
