use serde::Serialize;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Row counts the demo fixture guarantees, keyed by table.
const SEED_CONTRACT: &[SeedTableContract] = &[
    SeedTableContract { table: "product", id_prefix: "prod_demo", expected: 4 },
    SeedTableContract { table: "product_variant", id_prefix: "variant_demo", expected: 5 },
    SeedTableContract { table: "inventory_item", id_prefix: "iitem_demo", expected: 4 },
    SeedTableContract { table: "inventory_level", id_prefix: "ilev_demo", expected: 4 },
    SeedTableContract { table: "product_category", id_prefix: "pcat_demo", expected: 4 },
    SeedTableContract { table: "price_list", id_prefix: "plist_demo", expected: 3 },
    SeedTableContract { table: "price", id_prefix: "price_demo", expected: 8 },
];

/// Small, deterministic catalog covering every section the chatbot reports on:
/// published and draft products, ranked variants, low stock, nested and inactive
/// categories, plus live and expired price lists.
pub struct DemoCatalog;

impl DemoCatalog {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_catalog.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(SeedResult {
            tables: SEED_CONTRACT
                .iter()
                .map(|contract| SeededTable { table: contract.table, rows: contract.expected })
                .collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_CONTRACT.len());

        for contract in SEED_CONTRACT {
            let sql = format!("SELECT COUNT(*) FROM {} WHERE id LIKE ? || '%'", contract.table);
            let actual: i64 =
                sqlx::query_scalar(&sql).bind(contract.id_prefix).fetch_one(pool).await?;
            checks.push(SeedCheck {
                table: contract.table,
                expected: contract.expected,
                actual,
                passed: actual == contract.expected,
            });
        }

        let all_passed = checks.iter().all(|check| check.passed);
        Ok(VerificationResult { all_passed, checks })
    }
}

struct SeedTableContract {
    table: &'static str,
    id_prefix: &'static str,
    expected: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeededTable {
    pub table: &'static str,
    pub rows: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub tables: Vec<SeededTable>,
}

impl SeedResult {
    pub fn total_rows(&self) -> i64 {
        self.tables.iter().map(|table| table.rows).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedCheck {
    pub table: &'static str,
    pub expected: i64,
    pub actual: i64,
    pub passed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub all_passed: bool,
    pub checks: Vec<SeedCheck>,
}

#[cfg(test)]
mod tests {
    use super::DemoCatalog;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn demo_catalog_loads_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let seeded = DemoCatalog::load(&pool).await.expect("load");
        assert_eq!(seeded.total_rows(), 32);

        let verification = DemoCatalog::verify(&pool).await.expect("verify");
        assert!(verification.all_passed, "{:?}", verification.checks);
    }

    #[tokio::test]
    async fn demo_catalog_can_be_replayed() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        DemoCatalog::load(&pool).await.expect("first load");
        DemoCatalog::load(&pool).await.expect("second load");

        let verification = DemoCatalog::verify(&pool).await.expect("verify");
        assert!(verification.all_passed, "{:?}", verification.checks);
    }
}
