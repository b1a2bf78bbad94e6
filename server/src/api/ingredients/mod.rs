pub mod by_carbon_footprint;
pub mod carbon_footprint;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use foodprint_core::{Page, Row};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

/// One page of ingredient rows
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngredientPage {
    pub page: u64,
    pub limit: u64,
    pub total_results: u64,
    pub total_pages: u64,
    /// Ingredient rows keyed by dataset column name
    #[schema(value_type = Vec<Object>)]
    pub ingredients: Vec<Row>,
}

impl From<Page> for IngredientPage {
    fn from(page: Page) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total_results: page.total_results,
            total_pages: page.total_pages,
            ingredients: page.rows,
        }
    }
}

/// Returns the router for /api/ingredients endpoints (mounted at /api/ingredients)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/carbon-footprint",
            get(by_carbon_footprint::ingredients_by_footprint),
        )
        .route(
            "/{name}/carbon-footprint",
            get(carbon_footprint::ingredient_footprint),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        by_carbon_footprint::ingredients_by_footprint,
        carbon_footprint::ingredient_footprint,
    ),
    components(schemas(IngredientPage, carbon_footprint::IngredientFootprintResponse))
)]
pub struct ApiDoc;
