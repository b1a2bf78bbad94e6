use crate::api::params::recipe_id;
use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use foodprint_core::sql::columns;
use foodprint_core::Row;

#[utoipa::path(
    get,
    path = "/api/recipes/recipe/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Every column of the recipe row", body = Object),
        (status = 400, description = "ID is not an integer", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse)
    )
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let id = recipe_id(&id)?;

    let sql = format!(
        "SELECT * FROM {} WHERE {} = {}",
        state.recipes_table,
        columns::RECIPE_ID,
        id
    );
    let result = state.client.execute(&sql).await?;

    result
        .into_rows()
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Recipe not found"))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, get_json};
    use axum::http::StatusCode;
    use foodprint_core::{FakeEngine, FakeOutcome};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_recipe() {
        let engine = Arc::new(FakeEngine::new().with_table(
            r#""recipe id" = 42"#,
            &["Recipe ID", "Recipe Name", "region"],
            &[&["42", "Pad Thai", "Asian"]],
        ));

        let (status, body) = get_json(app(engine), "/api/recipes/recipe/42").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({"Recipe ID": "42", "Recipe Name": "Pad Thai", "region": "Asian"})
        );
    }

    #[tokio::test]
    async fn test_invalid_id() {
        let engine = Arc::new(FakeEngine::new());
        let (status, body) = get_json(app(engine.clone()), "/api/recipes/recipe/abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid Recipe ID");
        assert!(engine.submitted_queries().is_empty());
    }

    #[tokio::test]
    async fn test_missing_recipe() {
        let engine = Arc::new(
            FakeEngine::new().with_default_outcome(FakeOutcome::empty(&["Recipe ID"])),
        );
        let (status, body) = get_json(app(engine), "/api/recipes/recipe/9999").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Recipe not found");
    }
}
