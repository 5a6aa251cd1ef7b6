use chrono::{DateTime, Utc};

use shelfbot_core::domain::pricing::{
    ListedPrice, Price, PriceList, PriceListId, PriceListStatus, PriceListType,
};
use shelfbot_core::domain::product::ProductId;
use shelfbot_core::domain::variant::VariantId;

use super::{
    column, decimal_column, optional_timestamp_column, parse_column, PricingRepository,
    RepositoryError,
};
use crate::DbPool;

const PRICE_LIST_COLUMNS: &str =
    "pl.id, pl.title, pl.description, pl.type, pl.status, pl.starts_at, pl.ends_at";

const LISTED_PRICE_SELECT: &str = "SELECT p.id, p.price_list_id, p.variant_id, p.product_id,
            p.currency_code, p.amount, pl.title AS price_list_title,
            pl.status AS price_list_status, pl.starts_at, pl.ends_at
     FROM price p
     LEFT JOIN price_list pl ON pl.id = p.price_list_id AND pl.deleted_at IS NULL
     WHERE p.deleted_at IS NULL";

pub struct SqlPricingRepository {
    pool: DbPool,
}

impl SqlPricingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn listed_prices(
        &self,
        owner_column: &str,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListedPrice>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{LISTED_PRICE_SELECT} AND p.{owner_column} = ? ORDER BY p.id ASC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut prices = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(listed) = row_to_listed_price(row, now)? {
                prices.push(listed);
            }
        }

        Ok(prices)
    }
}

fn row_to_price_list(row: &sqlx::sqlite::SqliteRow) -> Result<PriceList, RepositoryError> {
    Ok(PriceList {
        id: PriceListId(column(row, "id")?),
        title: column(row, "title")?,
        description: column(row, "description")?,
        list_type: parse_column::<PriceListType>(row, "type")?,
        status: parse_column::<PriceListStatus>(row, "status")?,
        starts_at: optional_timestamp_column(row, "starts_at")?,
        ends_at: optional_timestamp_column(row, "ends_at")?,
    })
}

/// `None` when the price belongs to a list that is not active at `now`.
fn row_to_listed_price(
    row: &sqlx::sqlite::SqliteRow,
    now: DateTime<Utc>,
) -> Result<Option<ListedPrice>, RepositoryError> {
    let price_list_id: Option<String> = column(row, "price_list_id")?;
    let list_title: Option<String> = column(row, "price_list_title")?;

    if price_list_id.is_some() {
        let status: Option<String> = column(row, "price_list_status")?;
        let active = status.as_deref() == Some(PriceListStatus::Active.as_str())
            && optional_timestamp_column(row, "starts_at")?.map_or(true, |at| at <= now)
            && optional_timestamp_column(row, "ends_at")?.map_or(true, |at| at >= now);
        if !active {
            return Ok(None);
        }
    }

    let variant_id: Option<String> = column(row, "variant_id")?;
    let product_id: Option<String> = column(row, "product_id")?;

    Ok(Some(ListedPrice {
        price: Price {
            id: column(row, "id")?,
            price_list_id: price_list_id.map(PriceListId),
            variant_id: variant_id.map(VariantId),
            product_id: product_id.map(ProductId),
            currency_code: column(row, "currency_code")?,
            amount: decimal_column(row, "amount")?,
        },
        price_list_title: list_title,
    }))
}

#[async_trait::async_trait]
impl PricingRepository for SqlPricingRepository {
    async fn active_price_lists(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PriceList>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRICE_LIST_COLUMNS} FROM price_list pl
             WHERE pl.deleted_at IS NULL AND pl.status = 'active'
             ORDER BY pl.title ASC, pl.id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let lists = rows.iter().map(row_to_price_list).collect::<Result<Vec<_>, _>>()?;
        Ok(lists.into_iter().filter(|list| list.is_active_at(now)).collect())
    }

    async fn prices_for_product(
        &self,
        product_id: &ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListedPrice>, RepositoryError> {
        self.listed_prices("product_id", &product_id.0, now).await
    }

    async fn prices_for_variant(
        &self,
        variant_id: &VariantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ListedPrice>, RepositoryError> {
        self.listed_prices("variant_id", &variant_id.0, now).await
    }

    async fn save_price_list(&self, price_list: PriceList) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO price_list (id, title, description, type, status, starts_at, ends_at,
                                     created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 type = excluded.type,
                 status = excluded.status,
                 starts_at = excluded.starts_at,
                 ends_at = excluded.ends_at",
        )
        .bind(&price_list.id.0)
        .bind(&price_list.title)
        .bind(&price_list.description)
        .bind(price_list.list_type.as_str())
        .bind(price_list.status.as_str())
        .bind(price_list.starts_at.map(|at| at.to_rfc3339()))
        .bind(price_list.ends_at.map(|at| at.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_price(&self, price: Price) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO price (id, price_list_id, variant_id, product_id, currency_code, amount,
                                created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 price_list_id = excluded.price_list_id,
                 variant_id = excluded.variant_id,
                 product_id = excluded.product_id,
                 currency_code = excluded.currency_code,
                 amount = excluded.amount",
        )
        .bind(&price.id)
        .bind(price.price_list_id.as_ref().map(|id| id.0.as_str()))
        .bind(price.variant_id.as_ref().map(|id| id.0.as_str()))
        .bind(price.product_id.as_ref().map(|id| id.0.as_str()))
        .bind(&price.currency_code)
        .bind(price.amount.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use shelfbot_core::domain::pricing::{
        Price, PriceList, PriceListId, PriceListStatus, PriceListType,
    };
    use shelfbot_core::domain::variant::VariantId;

    use super::SqlPricingRepository;
    use crate::repositories::PricingRepository;
    use crate::{connect_with_settings, migrations};

    fn price_list(id: &str, status: PriceListStatus, expired: bool) -> PriceList {
        let now = Utc::now();
        PriceList {
            id: PriceListId(id.to_owned()),
            title: id.to_uppercase(),
            description: None,
            list_type: PriceListType::Sale,
            status,
            starts_at: Some(now - Duration::days(7)),
            ends_at: expired.then(|| now - Duration::days(1)),
        }
    }

    fn variant_price(id: &str, list: &str, cents: i64) -> Price {
        Price {
            id: id.to_owned(),
            price_list_id: Some(PriceListId(list.to_owned())),
            variant_id: Some(VariantId("variant_1".to_owned())),
            product_id: None,
            currency_code: "usd".to_owned(),
            amount: Decimal::new(cents, 2),
        }
    }

    #[tokio::test]
    async fn only_prices_on_active_lists_are_returned() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlPricingRepository::new(pool);

        repo.save_price_list(price_list("plist_live", PriceListStatus::Active, false))
            .await
            .expect("save");
        repo.save_price_list(price_list("plist_old", PriceListStatus::Active, true))
            .await
            .expect("save");
        repo.save_price_list(price_list("plist_draft", PriceListStatus::Draft, false))
            .await
            .expect("save");
        repo.save_price(variant_price("price_1", "plist_live", 1999)).await.expect("price");
        repo.save_price(variant_price("price_2", "plist_old", 999)).await.expect("price");
        repo.save_price(variant_price("price_3", "plist_draft", 1499)).await.expect("price");

        let lists = repo.active_price_lists(Utc::now()).await.expect("lists");
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].id.0, "plist_live");

        let prices = repo
            .prices_for_variant(&VariantId("variant_1".to_owned()), Utc::now())
            .await
            .expect("prices");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].price.amount, Decimal::new(1999, 2));
        assert_eq!(prices[0].price_list_title.as_deref(), Some("PLIST_LIVE"));
    }
}
