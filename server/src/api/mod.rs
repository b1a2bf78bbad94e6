pub mod health;
pub mod ingredients;
pub mod params;
pub mod recipes;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use foodprint_core::{FilterError, FootprintError, PaginationError, QueryError};
use serde::Serialize;
use thiserror::Error;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::AppState;

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

/// Error returned by handlers, rendered as `{message}` JSON.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Stored data we could not interpret.
    #[error("{0}")]
    MalformedData(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MalformedData(_) | ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert a pagination failure, replacing the generic not-found text.
    pub fn from_pagination(err: PaginationError, not_found: &str) -> Self {
        match err {
            PaginationError::NotFound => ApiError::not_found(not_found),
            other => other.into(),
        }
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::InvalidParameters | PaginationError::PageOutOfRange { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            PaginationError::NotFound => ApiError::NotFound(err.to_string()),
            PaginationError::Query(e) => ApiError::Query(e),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<FootprintError> for ApiError {
    fn from(err: FootprintError) -> Self {
        match err {
            FootprintError::MalformedIngredientList => ApiError::MalformedData(err.to_string()),
            FootprintError::EmptyIngredientList => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(
        info(title = "Foodprint API", description = "Recipe and ingredient carbon footprints"),
        components(schemas(ErrorResponse))
    )]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        health::ApiDoc::openapi(),
        recipes::ApiDoc::openapi(),
        ingredients::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

/// All routes plus the Swagger UI, with state applied.
pub fn build_router(state: AppState) -> Router {
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi());

    Router::new()
        .nest("/api/recipes", recipes::router())
        .nest("/api/ingredients", ingredients::router())
        .merge(health::router())
        .merge(swagger_ui)
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PaginationError::PageOutOfRange { total_pages: 2 }).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PaginationError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(FootprintError::MalformedIngredientList).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(QueryError::Transport("down".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_pagination_not_found_message_is_replaced() {
        let err = ApiError::from_pagination(PaginationError::NotFound, "No recipes found");
        assert_eq!(err.to_string(), "No recipes found");

        let err = ApiError::from_pagination(PaginationError::InvalidParameters, "No recipes found");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = openapi();
        for path in [
            "/api/health",
            "/api/recipes/search",
            "/api/recipes/by-ingredient",
            "/api/recipes/advanced-search",
            "/api/recipes/recipe/{id}",
            "/api/recipes/ingredient-cf",
            "/api/recipes/carbon-footprint-sum",
            "/api/ingredients/carbon-footprint",
            "/api/ingredients/{name}/carbon-footprint",
        ] {
            assert!(spec.paths.paths.contains_key(path), "{path}");
        }
    }
}
