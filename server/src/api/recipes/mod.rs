pub mod advanced_search;
pub mod by_ingredient;
pub mod carbon_footprint_sum;
pub mod get;
pub mod ingredient_cf;
pub mod search;

use crate::AppState;
use axum::routing::get;
use axum::Router;
use foodprint_core::{Page, Row};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

/// One page of recipe rows
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipePage {
    pub page: u64,
    pub limit: u64,
    pub total_results: u64,
    pub total_pages: u64,
    /// Recipe rows keyed by dataset column name
    #[schema(value_type = Vec<Object>)]
    pub recipes: Vec<Row>,
}

impl From<Page> for RecipePage {
    fn from(page: Page) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total_results: page.total_results,
            total_pages: page.total_pages,
            recipes: page.rows,
        }
    }
}

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search::search_recipes))
        .route("/by-ingredient", get(by_ingredient::search_by_ingredient))
        .route("/by-ingredient/", get(by_ingredient::search_by_ingredient))
        .route("/advanced-search", get(advanced_search::advanced_search))
        .route("/advanced-search/", get(advanced_search::advanced_search))
        .route("/recipe/{id}", get(get::get_recipe))
        .route("/ingredient-cf", get(ingredient_cf::recipe_footprint))
        .route("/ingredient-cf/", get(ingredient_cf::recipe_footprint))
        .route(
            "/carbon-footprint-sum",
            get(carbon_footprint_sum::recipes_by_footprint),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        search::search_recipes,
        by_ingredient::search_by_ingredient,
        advanced_search::advanced_search,
        get::get_recipe,
        ingredient_cf::recipe_footprint,
        carbon_footprint_sum::recipes_by_footprint,
    ),
    components(schemas(RecipePage, ingredient_cf::RecipeFootprintResponse))
)]
pub struct ApiDoc;
