pub use crate::db::utils::{clean_text, default_marks_label, file_type_for, new_id, now_ts};
pub use crate::db::{
    CatalogCounts, FileFolderFilter, FileRecord, FileRef, FileWithFolder, Folder, FolderSummary,
    ImportMode, MarksSection, MarksSectionRef, MarksSectionSummary, NamedRef, Question,
    QuestionFilter, QuestionListItem, QuestionOrder, QuestionSort, Statistics, Subject,
    SubjectRef, SubjectSummary, System, SystemSummary,
};
pub use crate::error::{CatalogError, CatalogResult};
pub use crate::scoring;
pub use axum::extract::rejection::JsonRejection;
pub use axum::extract::{Query, State};
pub use axum::Json;
pub use serde::{Deserialize, Serialize};
pub use serde_json::{json, Value};
pub use sha2::{Digest, Sha256};
pub use std::fs;
pub use std::path::{Path, PathBuf};
pub use std::sync::atomic::{AtomicU64, Ordering};
pub use std::time::{SystemTime, UNIX_EPOCH};
