//! Catalog entries.

use serde::{Deserialize, Serialize};

use novel_cart_core::{Money, NovelId};

/// A novel in the catalog.
///
/// Read-only from the cart's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Novel {
    pub id: NovelId,
    pub name: String,
    pub author: String,
    pub publisher: String,
    /// Sort key; lower ranks list first.
    pub rank: i64,
    pub price: Money,
    /// Four character publication year, e.g. `"2025"`.
    pub year: String,
}

/// Fields needed to add a novel to the catalog (used by seeding).
#[derive(Debug, Clone, Deserialize)]
pub struct NewNovel {
    pub name: String,
    pub author: String,
    pub publisher: String,
    #[serde(default)]
    pub rank: i64,
    pub price: Money,
    #[serde(default = "default_year")]
    pub year: String,
}

fn default_year() -> String {
    "2025".to_owned()
}
