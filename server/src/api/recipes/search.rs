use super::RecipePage;
use crate::api::params::{page_request, required};
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use foodprint_core::sql::columns;
use foodprint_core::{paginate, PagedQuery, Predicate};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Substring of the recipe name, case-insensitive
    pub recipe_name: Option<String>,
    /// Page number (default: 1)
    pub page: Option<String>,
    /// Page size (default: 10)
    pub limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/recipes/search",
    tag = "recipes",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching recipes", body = RecipePage),
        (status = 400, description = "Missing name or bad pagination", body = ErrorResponse),
        (status = 404, description = "No recipes found", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse)
    )
)]
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<RecipePage>> {
    let name = required(params.recipe_name.as_deref(), "Recipe name is required")?;
    let request = page_request(params.page.as_deref(), params.limit.as_deref())?;

    let query = PagedQuery {
        table: &state.recipes_table,
        columns: columns::RECIPE_LISTING,
        predicate: Some(Predicate::contains(columns::RECIPE_NAME, name)),
        order_by: columns::RECIPE_ID,
        tie_breaker: None,
    };

    let page = paginate(&state.client, &query, request)
        .await
        .map_err(|e| ApiError::from_pagination(e, "No recipes found"))?;

    Ok(Json(page.into()))
}
