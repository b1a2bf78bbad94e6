use crate::api::params::{non_empty, recipe_id};
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use foodprint_core::footprint::IngredientFootprint;
use foodprint_core::sql::columns;
use foodprint_core::Predicate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// Headers of the recipe lookup result
const NAME_HEADER: &str = "Recipe Name";
const INGREDIENTS_HEADER: &str = "Recipe Ingredient";

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RecipeFootprintParams {
    /// Recipe ID; takes precedence over `recipeName`
    pub id: Option<String>,
    /// Substring of the recipe name; the first match is used
    pub recipe_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFootprintResponse {
    pub recipe_name: String,
    /// One entry per ingredient, in recipe order. `carbonFootprint` is either
    /// kg CO2e per kg or the string "Data not available".
    #[schema(value_type = Vec<Object>)]
    pub ingredients: Vec<IngredientFootprint>,
    /// Sum of the available footprints
    pub total_carbon_footprint: f64,
}

#[utoipa::path(
    get,
    path = "/api/recipes/ingredient-cf",
    tag = "recipes",
    params(RecipeFootprintParams),
    responses(
        (status = 200, description = "Per-ingredient and total carbon footprint", body = RecipeFootprintResponse),
        (status = 400, description = "Missing or invalid recipe reference, or empty ingredient list", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Query failed or stored ingredient list unreadable", body = ErrorResponse)
    )
)]
pub async fn recipe_footprint(
    State(state): State<AppState>,
    Query(params): Query<RecipeFootprintParams>,
) -> ApiResult<Json<RecipeFootprintResponse>> {
    let selection = format!(
        "SELECT {}, {}, {} FROM {}",
        columns::RECIPE_ID,
        columns::RECIPE_NAME,
        columns::RECIPE_INGREDIENT,
        state.recipes_table
    );

    let sql = match (
        non_empty(params.id.as_deref()),
        non_empty(params.recipe_name.as_deref()),
    ) {
        (Some(id), _) => format!("{} WHERE {} = {}", selection, columns::RECIPE_ID, recipe_id(id)?),
        (None, Some(name)) => format!(
            "{} WHERE {} LIMIT 1",
            selection,
            Predicate::contains(columns::RECIPE_NAME, name)
        ),
        (None, None) => {
            return Err(ApiError::bad_request("Either Recipe ID or Name is required"));
        }
    };

    let result = state.client.execute(&sql).await?;
    let recipe = result
        .first()
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    let raw_list = recipe.get(INGREDIENTS_HEADER).ok_or_else(|| {
        ApiError::MalformedData("Invalid Recipe Ingredient format".to_string())
    })?;
    let breakdown = state.footprints.aggregate(raw_list).await?;

    let unavailable = breakdown
        .items
        .iter()
        .filter(|item| item.carbon_footprint.value().is_none())
        .count();
    tracing::debug!(
        ingredients = breakdown.items.len(),
        unavailable,
        "recipe footprint computed"
    );

    Ok(Json(RecipeFootprintResponse {
        recipe_name: recipe.get(NAME_HEADER).unwrap_or_default().to_string(),
        ingredients: breakdown.items,
        total_carbon_footprint: breakdown.total,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, get_json};
    use axum::http::StatusCode;
    use foodprint_core::{FakeEngine, FakeOutcome};
    use serde_json::json;
    use std::sync::Arc;

    const RECIPE_HEADER: &[&str] = &["Recipe ID", "Recipe Name", "Recipe Ingredient"];
    const DETAILS_HEADER: &[&str] = &["RecipeDB Ingredient", "Carbon Footprint"];

    fn engine(ingredients: &str) -> FakeEngine {
        FakeEngine::new()
            .with_table(
                "from cutoff10_recipes_veg_non_veg_sm",
                RECIPE_HEADER,
                &[&["5", "Bruschetta", ingredients]],
            )
            .with_table("like '%tomato%'", DETAILS_HEADER, &[&["tomato", "1.5"]])
            .with_table("like '%garlic%'", DETAILS_HEADER, &[&["garlic", "0.5"]])
            .with_default_outcome(FakeOutcome::empty(DETAILS_HEADER))
    }

    #[tokio::test]
    async fn test_footprint_by_id() {
        let engine = Arc::new(engine("['tomato', 'garlic', 'unobtainium']"));
        let (status, body) = get_json(app(engine.clone()), "/api/recipes/ingredient-cf?id=5").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "recipeName": "Bruschetta",
                "ingredients": [
                    {"ingredient": "tomato", "carbonFootprint": 1.5},
                    {"ingredient": "garlic", "carbonFootprint": 0.5},
                    {"ingredient": "unobtainium", "carbonFootprint": "Data not available"}
                ],
                "totalCarbonFootprint": 2.0
            })
        );
        assert!(engine.submitted_queries()[0].ends_with(r#"WHERE "Recipe ID" = 5"#));
    }

    #[tokio::test]
    async fn test_footprint_by_name_uses_first_match() {
        let engine = Arc::new(engine(r#"["tomato"]"#));
        let (status, body) = get_json(
            app(engine.clone()),
            "/api/recipes/ingredient-cf/?recipeName=bruschetta",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalCarbonFootprint"], 1.5);
        assert!(engine.submitted_queries()[0].ends_with("LIMIT 1"));
    }

    #[tokio::test]
    async fn test_requires_id_or_name() {
        let engine = Arc::new(FakeEngine::new());
        let (status, body) = get_json(app(engine), "/api/recipes/ingredient-cf").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Either Recipe ID or Name is required");
    }

    #[tokio::test]
    async fn test_malformed_ingredient_list() {
        let engine = Arc::new(engine("{malformed json}"));
        let (status, body) = get_json(app(engine), "/api/recipes/ingredient-cf?id=5").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Invalid Recipe Ingredient format");
    }

    #[tokio::test]
    async fn test_empty_ingredient_list() {
        let engine = Arc::new(engine("[]"));
        let (status, body) = get_json(app(engine), "/api/recipes/ingredient-cf?id=5").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No ingredients found in the recipe");
    }

    #[tokio::test]
    async fn test_recipe_not_found() {
        let engine = Arc::new(FakeEngine::new().with_table(
            "from cutoff10_recipes_veg_non_veg_sm",
            RECIPE_HEADER,
            &[],
        ));
        let (status, body) = get_json(app(engine), "/api/recipes/ingredient-cf?id=5").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Recipe not found");
    }
}
