//! Exam question bank: a catalog of subjects, systems, marks sections and
//! questions with attachments, importance scoring and JSON backups, served as
//! a JSON API over SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod scoring;
pub mod services;

use std::path::Path;

pub use services::{router, AppState};

/// Opens (or creates) the database under `data_dir` and builds the shared state.
pub async fn open_state(data_dir: &Path, max_upload_bytes: usize) -> Result<AppState, sqlx::Error> {
    let pool = db::init_db(data_dir).await?;
    Ok(AppState {
        pool,
        data_dir: data_dir.to_path_buf(),
        max_upload_bytes,
    })
}

/// Seeds the catalog and the sample questions when no subject exists yet.
pub async fn seed_if_empty(state: &AppState) -> error::CatalogResult<bool> {
    let repo = state.repo();
    if repo.catalog_counts().await?.subjects > 0 {
        return Ok(false);
    }
    services::seed::run_catalog_seed(&repo).await?;
    services::seed::run_question_seed(&repo).await?;
    Ok(true)
}
