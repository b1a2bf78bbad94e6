use super::RecipePage;
use crate::api::params::{non_empty, page_request, parse_number, FootprintRange};
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use foodprint_core::result::parse_flag;
use foodprint_core::sql::columns;
use foodprint_core::{paginate, IngredientFilter, PagedQuery, Predicate};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AdvancedSearchParams {
    /// Comma-separated ingredients the recipe must contain
    pub include: Option<String>,
    /// Comma-separated ingredients the recipe must not contain
    pub exclude: Option<String>,
    /// Comma-separated ingredients of which at least one must appear
    pub any_of: Option<String>,
    /// true or false
    pub vegetarian: Option<String>,
    /// Exact region name, case-insensitive
    pub region: Option<String>,
    /// Maximum cooking time in minutes
    pub max_cook_time: Option<String>,
    pub min_carbon_footprint: Option<String>,
    pub max_carbon_footprint: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl AdvancedSearchParams {
    /// Conjunction of every criterion given. None when no criterion was given.
    fn predicate(&self) -> Result<Option<Predicate>, ApiError> {
        let mut parts = Vec::new();

        let filter = IngredientFilter::from_lists(
            self.include.as_deref(),
            self.exclude.as_deref(),
            self.any_of.as_deref(),
        );
        filter.validate()?;
        parts.extend(filter.to_predicate(columns::RECIPE_INGREDIENT));

        if let Some(raw) = non_empty(self.vegetarian.as_deref()) {
            let vegetarian = parse_flag(raw)
                .ok_or_else(|| ApiError::bad_request("vegetarian must be true or false."))?;
            parts.push(vegetarian_predicate(vegetarian));
        }

        if let Some(region) = non_empty(self.region.as_deref()) {
            parts.push(Predicate::equals_ignore_case(columns::REGION, region));
        }

        if let Some(raw) = non_empty(self.max_cook_time.as_deref()) {
            let minutes = parse_number(raw).filter(|v| *v >= 0.0).ok_or_else(|| {
                ApiError::bad_request("maxCookTime must be a non-negative number.")
            })?;
            parts.push(Predicate::at_most(columns::COOK_TIME, minutes));
        }

        let range = FootprintRange::parse(
            self.min_carbon_footprint.as_deref(),
            self.max_carbon_footprint.as_deref(),
        )?;
        parts.extend(range.to_predicate(columns::CARBON_FOOTPRINT_SUM));

        Ok(Predicate::all(parts))
    }
}

/// The flag column is stored as 1/0 in some extracts and true/false in others.
fn vegetarian_predicate(vegetarian: bool) -> Predicate {
    let op = if vegetarian { "IN" } else { "NOT IN" };
    Predicate::raw(format!(
        "LOWER(CAST({} AS VARCHAR)) {} ('1', 'true')",
        columns::VEGETARIAN,
        op
    ))
}

#[utoipa::path(
    get,
    path = "/api/recipes/advanced-search",
    tag = "recipes",
    params(AdvancedSearchParams),
    responses(
        (status = 200, description = "Matching recipes", body = RecipePage),
        (status = 400, description = "No criteria, invalid criteria or bad pagination", body = ErrorResponse),
        (status = 404, description = "No recipes found", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse)
    )
)]
pub async fn advanced_search(
    State(state): State<AppState>,
    Query(params): Query<AdvancedSearchParams>,
) -> ApiResult<Json<RecipePage>> {
    let predicate = params
        .predicate()?
        .ok_or_else(|| ApiError::bad_request("At least one search criterion is required."))?;
    let request = page_request(params.page.as_deref(), params.limit.as_deref())?;

    let query = PagedQuery {
        table: &state.recipes_table,
        columns: columns::RECIPE_LISTING,
        predicate: Some(predicate),
        order_by: columns::RECIPE_ID,
        tie_breaker: None,
    };

    let page = paginate(&state.client, &query, request)
        .await
        .map_err(|e| ApiError::from_pagination(e, "No recipes found matching the given criteria."))?;

    Ok(Json(page.into()))
}
