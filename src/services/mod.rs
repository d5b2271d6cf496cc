use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::sqlite::SqlitePool;
use std::path::PathBuf;

use crate::db::SqliteRepository;
use crate::error::{CatalogError, CatalogResult};

pub mod backup;
pub mod files;
pub mod folders;
pub mod marks_sections;
pub mod prelude;
pub mod questions;
pub mod seed;
pub mod statistics;
pub mod storage;
pub mod subjects;
pub mod systems;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub data_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn repo(&self) -> SqliteRepository {
        SqliteRepository {
            pool: self.pool.clone(),
        }
    }
}

/// Success envelope: `{"success": true, "data": ..., "message": ...}`.
pub struct ApiResponse<T> {
    data: T,
    message: Option<String>,
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            data,
            message: None,
        }
    }
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            data,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            data: self.data,
            message: self.message,
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

pub type ApiResult<T> = CatalogResult<ApiResponse<T>>;

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

impl IdQuery {
    pub fn require(&self, entity: &str) -> CatalogResult<&str> {
        require_id(self.id.as_deref(), entity)
    }
}

pub fn require_id<'a>(id: Option<&'a str>, entity: &str) -> CatalogResult<&'a str> {
    id.map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CatalogError::validation(format!("{} ID is required", entity)))
}

/// Lets a partial update tell an explicit `null` apart from a missing key.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(1024 * 1024);
    Router::new()
        .route(
            "/api/subjects",
            get(subjects::get_subjects)
                .post(subjects::create_subject)
                .put(subjects::update_subject)
                .delete(subjects::delete_subject),
        )
        .route(
            "/api/systems",
            get(systems::get_systems)
                .post(systems::create_system)
                .put(systems::update_system)
                .delete(systems::delete_system),
        )
        .route(
            "/api/marks-sections",
            get(marks_sections::get_marks_sections)
                .post(marks_sections::create_marks_section)
                .put(marks_sections::update_marks_section)
                .delete(marks_sections::delete_marks_section),
        )
        .route(
            "/api/questions",
            get(questions::get_questions)
                .post(questions::create_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .route("/api/featured", get(questions::get_featured))
        .route(
            "/api/folders",
            get(folders::get_folders)
                .post(folders::create_folder)
                .put(folders::update_folder)
                .delete(folders::delete_folder),
        )
        .route(
            "/api/files",
            get(files::get_files)
                .post(files::upload_file)
                .put(files::update_file)
                .delete(files::delete_file),
        )
        .route("/api/files/content", get(files::get_file_content))
        .route(
            "/api/statistics",
            get(statistics::get_statistics).put(statistics::refresh_statistics),
        )
        .route(
            "/api/backup",
            get(backup::export_backup).post(backup::import_backup),
        )
        .route("/api/seed", get(seed::seed_status).post(seed::seed_catalog))
        .route(
            "/api/seed-questions",
            get(seed::seed_questions_status).post(seed::seed_questions),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
