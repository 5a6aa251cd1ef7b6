//! Typed catalog endpoints. They share `CatalogService` with the chat
//! dispatcher, so creation gets the same defaults, generated description and
//! default variant.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shelfbot_agent::catalog::{
    CatalogService, DeletedProduct, NewProduct, NewVariant, ProductDetails, ProductUpdate,
    VariantLookup, VariantSearchField, VariantUpdate,
};
use shelfbot_core::domain::category::ProductCategory;
use shelfbot_core::domain::pricing::PriceRange;
use shelfbot_core::domain::product::{Product, ProductStatus};
use shelfbot_core::domain::variant::ProductVariant;

use crate::api::{ApiError, ApiResult};

#[derive(Clone)]
pub struct CatalogState {
    catalog: CatalogService,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub title: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VariantSearchQuery {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreatedVariants {
    pub variants: Vec<ProductVariant>,
    pub count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Exists {
    pub exists: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariantStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub variant_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StockReport {
    pub product: String,
    pub total_stock: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: ProductVariant,
    pub price_range: Option<PriceRange>,
}

pub fn router(catalog: CatalogService) -> Router {
    Router::new()
        .route("/api/products", get(published_products).post(create_product))
        .route("/api/products/all", get(all_products))
        .route("/api/products/search", get(search_products))
        .route("/api/products/stock/{name}", get(product_stock))
        .route(
            "/api/products/{id}",
            get(product_details).put(update_product).delete(delete_product),
        )
        .route("/api/variants", get(all_variants))
        .route("/api/variants/active", get(active_variants))
        .route("/api/variants/stats", get(variant_stats))
        .route("/api/variants/search/title", get(search_variants_by_title))
        .route("/api/variants/search/sku", get(search_variants_by_sku))
        .route("/api/variants/find/sku/{sku}", get(variant_by_sku))
        .route("/api/variants/find/barcode/{barcode}", get(variant_by_barcode))
        .route("/api/variants/check/sku/{sku}/exists", get(sku_exists))
        .route("/api/variants/check/barcode/{barcode}/exists", get(barcode_exists))
        .route("/api/variants/product/{product_id}", get(product_variants).post(create_variant))
        .route("/api/variants/product/{product_id}/active", get(active_product_variants))
        .route("/api/variants/product/{product_id}/bulk", post(create_variants))
        .route("/api/variants/product/{product_id}/reorder", post(reorder_variants))
        .route("/api/variants/product/{product_id}/stats", get(product_variant_stats))
        .route(
            "/api/variants/{id}",
            get(variant).put(update_variant).patch(patch_variant).delete(delete_variant),
        )
        .route("/api/variants/{id}/soft-delete", patch(soft_delete_variant))
        .route("/api/variants/{id}/exists", get(variant_exists))
        .route("/api/categories", get(active_categories))
        .route("/api/categories/roots", get(root_categories))
        .route("/api/categories/by-name/{name}", get(category_by_name))
        .route("/api/categories/{id}/children", get(child_categories))
        .with_state(CatalogState { catalog })
}

pub async fn published_products(State(state): State<CatalogState>) -> ApiResult<Vec<Product>> {
    Ok(Json(state.catalog.list(Some(ProductStatus::Published)).await?))
}

pub async fn all_products(State(state): State<CatalogState>) -> ApiResult<Vec<Product>> {
    Ok(Json(state.catalog.list(None).await?))
}

pub async fn search_products(
    State(state): State<CatalogState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Product>> {
    Ok(Json(state.catalog.search(&query.title).await?))
}

pub async fn product_stock(
    State(state): State<CatalogState>,
    Path(name): Path<String>,
) -> ApiResult<StockReport> {
    let total_stock = state.catalog.stock_total(&name).await?;
    Ok(Json(StockReport { product: name, total_stock }))
}

pub async fn product_details(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
) -> ApiResult<ProductDetails> {
    let product = state.catalog.product(&id).await?;
    Ok(Json(state.catalog.details(product).await?))
}

pub async fn create_product(
    State(state): State<CatalogState>,
    Json(request): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductDetails>), ApiError> {
    let created = state.catalog.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_product(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
    Json(update): Json<ProductUpdate>,
) -> ApiResult<Product> {
    Ok(Json(state.catalog.update_product(&id, update).await?))
}

pub async fn delete_product(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedProduct> {
    Ok(Json(state.catalog.delete_product(&id).await?))
}

pub async fn product_variants(
    State(state): State<CatalogState>,
    Path(product_id): Path<String>,
) -> ApiResult<Vec<ProductVariant>> {
    Ok(Json(state.catalog.variants_for(&product_id).await?))
}

pub async fn create_variant(
    State(state): State<CatalogState>,
    Path(product_id): Path<String>,
    Json(request): Json<NewVariant>,
) -> Result<(StatusCode, Json<ProductVariant>), ApiError> {
    let variant = state.catalog.create_variant(&product_id, request).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn variant(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
) -> ApiResult<VariantView> {
    let variant = state.catalog.variant(&id).await?;
    let price_range = state.catalog.variant_price_range(&variant.id).await?;
    Ok(Json(VariantView { variant, price_range }))
}

pub async fn update_variant(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
    Json(update): Json<VariantUpdate>,
) -> ApiResult<ProductVariant> {
    Ok(Json(state.catalog.update_variant(&id, update).await?))
}

pub async fn delete_variant(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
) -> ApiResult<ProductVariant> {
    Ok(Json(state.catalog.delete_variant(&id).await?))
}

/// Same as `PUT` but reads the fields from the query string.
pub async fn patch_variant(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
    Query(update): Query<VariantUpdate>,
) -> ApiResult<ProductVariant> {
    Ok(Json(state.catalog.update_variant(&id, update).await?))
}

pub async fn soft_delete_variant(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
) -> ApiResult<ProductVariant> {
    Ok(Json(state.catalog.soft_delete_variant(&id).await?))
}

pub async fn all_variants(State(state): State<CatalogState>) -> ApiResult<Vec<ProductVariant>> {
    Ok(Json(state.catalog.all_variants().await?))
}

pub async fn active_variants(State(state): State<CatalogState>) -> ApiResult<Vec<ProductVariant>> {
    Ok(Json(state.catalog.active_variants(None).await?))
}

pub async fn active_product_variants(
    State(state): State<CatalogState>,
    Path(product_id): Path<String>,
) -> ApiResult<Vec<ProductVariant>> {
    Ok(Json(state.catalog.active_variants(Some(&product_id)).await?))
}

pub async fn create_variants(
    State(state): State<CatalogState>,
    Path(product_id): Path<String>,
    Json(requests): Json<Vec<NewVariant>>,
) -> Result<(StatusCode, Json<CreatedVariants>), ApiError> {
    let variants = state.catalog.create_variants(&product_id, requests).await?;
    let count = variants.len();
    Ok((StatusCode::CREATED, Json(CreatedVariants { variants, count })))
}

/// Body is the variant ids in their new order.
pub async fn reorder_variants(
    State(state): State<CatalogState>,
    Path(product_id): Path<String>,
    Json(variant_ids): Json<Vec<String>>,
) -> ApiResult<Vec<ProductVariant>> {
    Ok(Json(state.catalog.reorder_variants(&product_id, &variant_ids).await?))
}

pub async fn search_variants_by_title(
    State(state): State<CatalogState>,
    Query(query): Query<VariantSearchQuery>,
) -> ApiResult<Vec<ProductVariant>> {
    let fragment = query.title.unwrap_or_default();
    Ok(Json(state.catalog.search_variants(VariantSearchField::Title, &fragment).await?))
}

pub async fn search_variants_by_sku(
    State(state): State<CatalogState>,
    Query(query): Query<VariantSearchQuery>,
) -> ApiResult<Vec<ProductVariant>> {
    let fragment = query.sku.unwrap_or_default();
    Ok(Json(state.catalog.search_variants(VariantSearchField::Sku, &fragment).await?))
}

pub async fn variant_by_sku(
    State(state): State<CatalogState>,
    Path(sku): Path<String>,
) -> ApiResult<ProductVariant> {
    Ok(Json(state.catalog.variant_by_sku(&sku).await?))
}

pub async fn variant_by_barcode(
    State(state): State<CatalogState>,
    Path(barcode): Path<String>,
) -> ApiResult<ProductVariant> {
    Ok(Json(state.catalog.variant_by_barcode(&barcode).await?))
}

pub async fn variant_exists(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
) -> ApiResult<Exists> {
    Ok(Json(Exists { exists: state.catalog.variant_exists(VariantLookup::Id(&id)).await? }))
}

pub async fn sku_exists(
    State(state): State<CatalogState>,
    Path(sku): Path<String>,
) -> ApiResult<Exists> {
    Ok(Json(Exists { exists: state.catalog.variant_exists(VariantLookup::Sku(&sku)).await? }))
}

pub async fn barcode_exists(
    State(state): State<CatalogState>,
    Path(barcode): Path<String>,
) -> ApiResult<Exists> {
    let exists = state.catalog.variant_exists(VariantLookup::Barcode(&barcode)).await?;
    Ok(Json(Exists { exists }))
}

pub async fn variant_stats(State(state): State<CatalogState>) -> ApiResult<VariantStats> {
    let variant_count = state.catalog.variant_stats(None).await?;
    Ok(Json(VariantStats { product_id: None, variant_count }))
}

pub async fn product_variant_stats(
    State(state): State<CatalogState>,
    Path(product_id): Path<String>,
) -> ApiResult<VariantStats> {
    let variant_count = state.catalog.variant_stats(Some(&product_id)).await?;
    Ok(Json(VariantStats { product_id: Some(product_id), variant_count }))
}

pub async fn active_categories(State(state): State<CatalogState>) -> ApiResult<Vec<ProductCategory>> {
    Ok(Json(state.catalog.active_categories().await?))
}

pub async fn root_categories(State(state): State<CatalogState>) -> ApiResult<Vec<ProductCategory>> {
    Ok(Json(state.catalog.root_categories().await?))
}

pub async fn child_categories(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ProductCategory>> {
    Ok(Json(state.catalog.child_categories(&id).await?))
}

pub async fn category_by_name(
    State(state): State<CatalogState>,
    Path(name): Path<String>,
) -> ApiResult<ProductCategory> {
    Ok(Json(state.catalog.category_by_name(&name).await?))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use shelfbot_agent::catalog::{CatalogRepositories, CatalogService};
    use shelfbot_agent::describe::DescriptionCascade;
    use shelfbot_agent::llm::DisabledLlmClient;
    use shelfbot_db::{connect_with_settings, migrations, DemoCatalog};

    use super::router;

    async fn seeded_app() -> axum::Router {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        DemoCatalog::load(&pool).await.expect("seed");

        let describer = DescriptionCascade::new(
            std::sync::Arc::new(DisabledLlmClient),
            std::time::Duration::from_secs(1),
        );
        router(CatalogService::new(CatalogRepositories::sql(pool), describer))
    }

    async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json") };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request")
    }

    fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn published_listing_hides_drafts() {
        let app = seeded_app().await;

        let (status, published) = send(&app, get("/api/products")).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> =
            published.as_array().expect("list").iter().filter_map(|p| p["title"].as_str()).collect();
        assert!(titles.contains(&"Cool T-Shirt"));
        assert!(!titles.contains(&"Travel Backpack"));

        let (_, everything) = send(&app, get("/api/products/all")).await;
        assert_eq!(everything.as_array().expect("list").len(), 4);
    }

    #[tokio::test]
    async fn details_stock_and_search_read_the_seeded_catalog() {
        let app = seeded_app().await;

        let (status, details) = send(&app, get("/api/products/prod_demo0001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(details["product"]["title"], "Cool T-Shirt");
        assert_eq!(details["variants"].as_array().expect("variants").len(), 2);

        let (_, stock) = send(&app, get("/api/products/stock/Cool%20T-Shirt")).await;
        assert_eq!(stock["product"], "Cool T-Shirt");
        assert_eq!(stock["total_stock"], "27");

        let (_, found) = send(&app, get("/api/products/search?title=mug")).await;
        assert_eq!(found[0]["id"], "prod_demo0003");

        let (status, missing) = send(&app, get("/api/products/prod_nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["error"], "The requested record does not exist.");
    }

    #[tokio::test]
    async fn create_update_and_delete_round_trip() {
        let app = seeded_app().await;

        let (status, created) =
            send(&app, with_json("POST", "/api/products", json!({ "title": "Ceramic Vase" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["product"]["status"], "published");
        assert_eq!(created["variants"][0]["title"], "Default Title");
        let id = created["product"]["id"].as_str().expect("id").to_owned();

        let (status, _) =
            send(&app, with_json("POST", "/api/products", json!({ "title": "ceramic vase" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, updated) = send(
            &app,
            with_json("PUT", &format!("/api/products/{id}"), json!({ "status": "draft" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "draft");

        let (status, _) = send(
            &app,
            with_json("PUT", &format!("/api/products/{id}"), json!({ "status": "archived" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, variant) = send(
            &app,
            with_json("POST", &format!("/api/variants/product/{id}"), json!({ "title": "Large" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(variant["rank"], 2);

        let delete = Request::delete(format!("/api/products/{id}")).body(Body::empty()).expect("request");
        let (status, deleted) = send(&app, delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["variants_removed"], 2);
    }

    #[tokio::test]
    async fn variant_lookups_and_utility_endpoints() {
        let app = seeded_app().await;

        let (status, by_sku) = send(&app, get("/api/variants/find/sku/COOL-T-SHIRT-M")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_sku["id"], "variant_demo0002");

        let (_, by_barcode) = send(&app, get("/api/variants/find/barcode/4006381333931")).await;
        assert_eq!(by_barcode["id"], "variant_demo0001");
        let (status, _) = send(&app, get("/api/variants/find/barcode/0000")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, titled) = send(&app, get("/api/variants/search/title?title=default")).await;
        assert_eq!(titled.as_array().expect("list").len(), 3);
        let (_, skus) = send(&app, get("/api/variants/search/sku?sku=cool-t")).await;
        assert_eq!(skus.as_array().expect("list").len(), 2);

        let (_, exists) = send(&app, get("/api/variants/variant_demo0003/exists")).await;
        assert_eq!(exists, json!({ "exists": true }));
        let (_, exists) = send(&app, get("/api/variants/check/sku/NOPE-1/exists")).await;
        assert_eq!(exists, json!({ "exists": false }));
        let (_, exists) = send(&app, get("/api/variants/check/barcode/4006381333931/exists")).await;
        assert_eq!(exists, json!({ "exists": true }));

        let (_, stats) = send(&app, get("/api/variants/stats")).await;
        assert_eq!(stats, json!({ "variant_count": 5 }));
        let (_, stats) = send(&app, get("/api/variants/product/prod_demo0001/stats")).await;
        assert_eq!(stats, json!({ "product_id": "prod_demo0001", "variant_count": 2 }));
    }

    #[tokio::test]
    async fn bulk_create_reorder_and_soft_delete_variants() {
        let app = seeded_app().await;

        let (status, created) = send(
            &app,
            with_json(
                "POST",
                "/api/variants/product/prod_demo0001/bulk",
                json!([{ "title": "Large", "sku": "COOL-T-SHIRT-L" }, { "title": "X-Large" }]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["count"], 2);
        assert_eq!(created["variants"][0]["rank"], 3);
        assert_eq!(created["variants"][1]["rank"], 4);
        let xl = created["variants"][1]["id"].as_str().expect("id").to_owned();

        let (status, _) = send(
            &app,
            with_json("POST", "/api/variants/product/prod_nope/bulk", json!([{ "title": "Solo" }])),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, reordered) = send(
            &app,
            with_json(
                "POST",
                "/api/variants/product/prod_demo0001/reorder",
                json!([xl, "variant_demo0002", "variant_demo0001"]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> =
            reordered.as_array().expect("list").iter().filter_map(|v| v["title"].as_str()).collect();
        assert_eq!(titles, ["X-Large", "Medium", "Small", "Large"]);

        let soft = Request::patch("/api/variants/variant_demo0001/soft-delete")
            .body(Body::empty())
            .expect("request");
        let (status, removed) = send(&app, soft).await;
        assert_eq!(status, StatusCode::OK);
        assert!(removed["deleted_at"].is_string());

        let (_, active) = send(&app, get("/api/variants/product/prod_demo0001/active")).await;
        let ids: Vec<&str> =
            active.as_array().expect("list").iter().filter_map(|v| v["id"].as_str()).collect();
        assert!(!ids.contains(&"variant_demo0001"));
        assert_eq!(ids.len(), 3);

        let (_, everything) = send(&app, get("/api/variants")).await;
        assert_eq!(everything.as_array().expect("list").len(), 7);
        let (_, all_active) = send(&app, get("/api/variants/active")).await;
        assert_eq!(all_active.as_array().expect("list").len(), 6);

        let renamed = Request::patch("/api/variants/variant_demo0002?title=Medium%20Fit")
            .body(Body::empty())
            .expect("request");
        let (status, patched) = send(&app, renamed).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["title"], "Medium Fit");
    }

    #[tokio::test]
    async fn category_hierarchy_endpoints() {
        let app = seeded_app().await;

        let (status, roots) = send(&app, get("/api/categories/roots")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!roots.as_array().expect("roots").is_empty());
        assert!(roots.as_array().expect("roots").iter().all(|c| c["parent_id"].is_null()));

        let (status, _) = send(&app, get("/api/categories/by-name/Nonexistent")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
