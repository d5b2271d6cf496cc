mod migrations;
mod models;
mod repo;
pub mod utils;

pub use migrations::{init_db, DB_FILE_NAME};
pub use models::{
    CatalogCounts, FileRecord, FileRef, FileWithFolder, Folder, FolderSummary, MarksBreakdownItem,
    MarksSection, MarksSectionRef, MarksSectionSummary, NamedRef, Question, QuestionActivity,
    QuestionListItem, QuestionRow, Statistics, Subject, SubjectBreakdownItem, SubjectRef,
    SubjectSummary, System, SystemSummary,
};
pub use repo::{
    FileFolderFilter, ImportMode, QuestionFilter, QuestionOrder, QuestionSort, SqliteRepository,
};
