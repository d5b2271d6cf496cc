use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct SqliteRepository {
    pub pool: SqlitePool,
}

mod backup;
mod files;
mod folders;
mod marks_sections;
mod questions;
mod statistics;
mod subjects;
mod systems;

pub use backup::ImportMode;
pub use files::FileFolderFilter;
pub use questions::{QuestionFilter, QuestionOrder, QuestionSort};
