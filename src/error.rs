use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Conflict(_) => StatusCode::CONFLICT,
            CatalogError::Database(_)
            | CatalogError::Storage(_)
            | CatalogError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        // The schema's UNIQUE constraints back up the early duplicate checks.
        let unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            return CatalogError::Conflict("A record with the same unique key already exists".to_string());
        }
        CatalogError::Database(err)
    }
}

impl From<JsonRejection> for CatalogError {
    fn from(rejection: JsonRejection) -> Self {
        CatalogError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for CatalogError {
    fn from(err: MultipartError) -> Self {
        CatalogError::Validation(format!("Invalid multipart payload: {}", err.body_text()))
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(CatalogError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(CatalogError::NotFound("Subject").status(), StatusCode::NOT_FOUND);
        assert_eq!(CatalogError::Conflict("dup".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            CatalogError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(CatalogError::NotFound("Marks section").to_string(), "Marks section not found");
    }

    #[test]
    fn test_row_not_found_is_not_conflict() {
        let err: CatalogError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, CatalogError::Database(_)));
    }
}
