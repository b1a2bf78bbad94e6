use super::RecipePage;
use crate::api::params::{non_empty, page_request};
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use foodprint_core::sql::columns;
use foodprint_core::{paginate, IngredientFilter, PagedQuery};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ByIngredientParams {
    /// Filter expression, e.g. "@chicken !beef |rice |noodles".
    /// `@` = must have, `!` = must not have, `|` = at least one of.
    /// Unprefixed names count as must have.
    pub ingredient: Option<String>,
    /// Comma-separated must-have ingredients (alternative to `ingredient`)
    pub include: Option<String>,
    /// Comma-separated excluded ingredients (alternative to `ingredient`)
    pub exclude: Option<String>,
    /// Comma-separated alternatives (alternative to `ingredient`)
    pub any_of: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ByIngredientParams {
    fn filter(&self) -> Option<IngredientFilter> {
        if let Some(expression) = non_empty(self.ingredient.as_deref()) {
            return Some(IngredientFilter::parse(expression));
        }
        let filter = IngredientFilter::from_lists(
            self.include.as_deref(),
            self.exclude.as_deref(),
            self.any_of.as_deref(),
        );
        (!filter.is_empty()).then_some(filter)
    }
}

#[utoipa::path(
    get,
    path = "/api/recipes/by-ingredient",
    tag = "recipes",
    params(ByIngredientParams),
    responses(
        (status = 200, description = "Matching recipes", body = RecipePage),
        (status = 400, description = "Missing or conflicting conditions, or bad pagination", body = ErrorResponse),
        (status = 404, description = "No recipes found", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse)
    )
)]
pub async fn search_by_ingredient(
    State(state): State<AppState>,
    Query(params): Query<ByIngredientParams>,
) -> ApiResult<Json<RecipePage>> {
    let filter = params
        .filter()
        .ok_or_else(|| ApiError::bad_request("Ingredient parameter is required."))?;
    let request = page_request(params.page.as_deref(), params.limit.as_deref())?;
    let predicate = filter.compile(columns::RECIPE_INGREDIENT)?;

    let query = PagedQuery {
        table: &state.recipes_table,
        columns: columns::RECIPE_LISTING,
        predicate: Some(predicate),
        order_by: columns::RECIPE_ID,
        tie_breaker: None,
    };

    let page = paginate(&state.client, &query, request)
        .await
        .map_err(|e| ApiError::from_pagination(e, "No results found."))?;

    Ok(Json(page.into()))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, get_json, with_count};
    use axum::http::StatusCode;
    use foodprint_core::FakeEngine;
    use std::sync::Arc;

    fn engine_with_one_recipe() -> Arc<FakeEngine> {
        Arc::new(with_count(FakeEngine::new(), 1).with_table(
            "row_number()",
            &["Recipe ID", "Recipe Ingredient", "row_num"],
            &[&["7", "['chicken', 'rice']", "1"]],
        ))
    }

    #[tokio::test]
    async fn test_token_expression() {
        let engine = engine_with_one_recipe();
        let (status, body) = get_json(
            app(engine.clone()),
            "/api/recipes/by-ingredient?ingredient=%40chicken%20!beef%20%7Crice",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalResults"], 1);
        assert_eq!(body["recipes"][0]["Recipe ID"], "7");

        let count_sql = &engine.submitted_queries()[0];
        assert!(count_sql.contains(r#"LOWER("Recipe Ingredient") LIKE '%chicken%'"#));
        assert!(count_sql.contains(r#"LOWER("Recipe Ingredient") NOT LIKE '%beef%'"#));
        assert!(count_sql.contains(r#"LOWER("Recipe Ingredient") LIKE '%rice%'"#));
    }

    #[tokio::test]
    async fn test_trailing_slash_and_lists() {
        let engine = engine_with_one_recipe();
        let (status, _) = get_json(
            app(engine.clone()),
            "/api/recipes/by-ingredient/?include=chicken,rice&exclude=beef",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let count_sql = &engine.submitted_queries()[0];
        assert!(count_sql.contains("NOT LIKE '%beef%'"));
    }

    #[tokio::test]
    async fn test_conflict_is_rejected_before_querying() {
        let engine = Arc::new(FakeEngine::new());
        let (status, body) = get_json(
            app(engine.clone()),
            "/api/recipes/by-ingredient?ingredient=%40beef%20!beef",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Invalid query: Ingredient(s) beef cannot be in both AND (@) and NOT (!) conditions."
        );
        assert!(engine.submitted_queries().is_empty());
    }

    #[tokio::test]
    async fn test_missing_ingredient() {
        let engine = Arc::new(FakeEngine::new());
        let (status, body) = get_json(app(engine), "/api/recipes/by-ingredient").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Ingredient parameter is required.");
    }

    #[tokio::test]
    async fn test_only_prefixes_is_empty_filter() {
        let engine = Arc::new(FakeEngine::new());
        let (status, body) =
            get_json(app(engine), "/api/recipes/by-ingredient?ingredient=%40%20!").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "At least one ingredient condition is required.");
    }

    #[tokio::test]
    async fn test_zero_matches_is_not_found() {
        let engine = Arc::new(with_count(FakeEngine::new(), 0));
        let (status, body) =
            get_json(app(engine), "/api/recipes/by-ingredient?ingredient=unobtainium").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No results found.");
    }
}
