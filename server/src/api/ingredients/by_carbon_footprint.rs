use super::IngredientPage;
use crate::api::params::{page_request, FootprintRange, FootprintRangeParams};
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use foodprint_core::sql::columns;
use foodprint_core::{paginate, PagedQuery};

/// Reference ingredients whose footprint per kg falls within [min, max], lowest first.
#[utoipa::path(
    get,
    path = "/api/ingredients/carbon-footprint",
    tag = "ingredients",
    params(FootprintRangeParams),
    responses(
        (status = 200, description = "Ingredients ordered by footprint", body = IngredientPage),
        (status = 400, description = "Invalid range or pagination", body = ErrorResponse),
        (status = 404, description = "No ingredients in range", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse)
    )
)]
pub async fn ingredients_by_footprint(
    State(state): State<AppState>,
    Query(params): Query<FootprintRangeParams>,
) -> ApiResult<Json<IngredientPage>> {
    let range =
        FootprintRange::parse(params.min.as_deref(), params.max.as_deref())?.require_bound()?;
    let request = page_request(params.page.as_deref(), params.limit.as_deref())?;

    let query = PagedQuery {
        table: &state.ingredients_table,
        columns: columns::INGREDIENT_LISTING,
        predicate: range.to_predicate(columns::CARBON_FOOTPRINT),
        order_by: columns::CARBON_FOOTPRINT,
        tie_breaker: Some(columns::INGREDIENT_NAME),
    };

    let page = paginate(&state.client, &query, request)
        .await
        .map_err(|e| {
            ApiError::from_pagination(
                e,
                "No ingredients found within the specified carbon footprint range.",
            )
        })?;

    Ok(Json(page.into()))
}
