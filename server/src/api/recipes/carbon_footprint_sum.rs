use super::RecipePage;
use crate::api::params::{page_request, FootprintRange, FootprintRangeParams};
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use foodprint_core::sql::columns;
use foodprint_core::{paginate, PagedQuery};

/// Recipes whose total footprint falls within [min, max], lowest first.
#[utoipa::path(
    get,
    path = "/api/recipes/carbon-footprint-sum",
    tag = "recipes",
    params(FootprintRangeParams),
    responses(
        (status = 200, description = "Recipes ordered by total footprint", body = RecipePage),
        (status = 400, description = "Invalid range or pagination", body = ErrorResponse),
        (status = 404, description = "No recipes in range", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse)
    )
)]
pub async fn recipes_by_footprint(
    State(state): State<AppState>,
    Query(params): Query<FootprintRangeParams>,
) -> ApiResult<Json<RecipePage>> {
    let request = page_request(params.page.as_deref(), params.limit.as_deref())?;
    let range =
        FootprintRange::parse(params.min.as_deref(), params.max.as_deref())?.require_bound()?;

    let query = PagedQuery {
        table: &state.recipes_table,
        columns: columns::RECIPE_LISTING,
        predicate: range.to_predicate(columns::CARBON_FOOTPRINT_SUM),
        order_by: columns::CARBON_FOOTPRINT_SUM,
        tie_breaker: Some(columns::RECIPE_ID),
    };

    let page = paginate(&state.client, &query, request)
        .await
        .map_err(|e| {
            ApiError::from_pagination(e, "No recipes found for the specified carbon footprint range.")
        })?;

    Ok(Json(page.into()))
}
