use crate::api::params::{non_empty, parse_number};
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuantityParams {
    /// Quantity in kg (default: 1)
    pub quantity: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngredientFootprintResponse {
    /// Reference name of the matched ingredient
    pub ingredient: String,
    pub carbon_footprint_per_kg: f64,
    pub quantity: f64,
    pub total_carbon_footprint: f64,
}

fn parse_quantity(raw: Option<&str>) -> Result<f64, ApiError> {
    match non_empty(raw) {
        None => Ok(1.0),
        Some(raw) => parse_number(raw).filter(|q| *q > 0.0).ok_or_else(|| {
            ApiError::bad_request("Quantity must be a valid number greater than 0.")
        }),
    }
}

#[utoipa::path(
    get,
    path = "/api/ingredients/{name}/carbon-footprint",
    tag = "ingredients",
    params(
        ("name" = String, Path, description = "Ingredient name, matched as a case-insensitive substring"),
        QuantityParams
    ),
    responses(
        (status = 200, description = "Footprint of the first matching ingredient", body = IngredientFootprintResponse),
        (status = 400, description = "Blank name or invalid quantity", body = ErrorResponse),
        (status = 404, description = "Ingredient not found", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse)
    )
)]
pub async fn ingredient_footprint(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<QuantityParams>,
) -> ApiResult<Json<IngredientFootprintResponse>> {
    let name = non_empty(Some(name.as_str())).ok_or_else(|| {
        ApiError::bad_request("Ingredient name is required and cannot be empty.")
    })?;
    let quantity = parse_quantity(params.quantity.as_deref())?;

    let found = state
        .footprints
        .lookup_ingredient(name)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient not found."))?;

    Ok(Json(IngredientFootprintResponse {
        ingredient: found.ingredient,
        carbon_footprint_per_kg: found.footprint_per_kg,
        quantity,
        total_carbon_footprint: quantity * found.footprint_per_kg,
    }))
}
