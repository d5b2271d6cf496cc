use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::utils::{deserialize_years, parse_years};

fn default_global_importance() -> f64 {
    0.5
}

fn default_file_type() -> String {
    "other".to_string()
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "sort_order")]
    #[serde(default)]
    pub order: i64,
    pub subject_id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarksSection {
    pub id: String,
    pub marks: i64,
    pub label: String,
    pub system_id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Question as stored: `years` is a JSON array in a text column.
#[derive(Debug, FromRow, Clone)]
pub struct QuestionRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub years: String,
    pub repeat_count: i64,
    pub importance_score: f64,
    pub global_importance: f64,
    pub notes: Option<String>,
    pub is_bookmarked: bool,
    pub subject_id: String,
    pub system_id: String,
    pub marks_section_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_years")]
    pub years: Vec<String>,
    #[serde(default)]
    pub repeat_count: i64,
    #[serde(default)]
    pub importance_score: f64,
    #[serde(default = "default_global_importance")]
    pub global_importance: f64,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_bookmarked: bool,
    pub subject_id: String,
    pub system_id: String,
    pub marks_section_id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            years: parse_years(&row.years),
            id: row.id,
            title: row.title,
            description: row.description,
            repeat_count: row.repeat_count,
            importance_score: row.importance_score,
            global_importance: row.global_importance,
            notes: row.notes,
            is_bookmarked: row.is_bookmarked,
            subject_id: row.subject_id,
            system_id: row.system_id,
            marks_section_id: row.marks_section_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub question_id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_file_type")]
    pub file_type: String,
    pub url: String,
    #[serde(default)]
    pub size: i64,
    pub description: Option<String>,
    pub question_id: String,
    pub folder_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub id: String,
    pub total_subjects: i64,
    pub total_systems: i64,
    pub total_questions: i64,
    pub total_files: i64,
    pub updated_at: i64,
}

// --- Read models used by listings ---

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarksSectionRef {
    pub id: String,
    pub marks: i64,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub subject: Subject,
    pub system_count: i64,
    pub question_count: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SystemSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub system: System,
    pub question_count: i64,
    pub marks_section_count: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarksSectionSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub section: MarksSection,
    pub question_count: i64,
}

/// Question as it appears in listings, with its placement and attachment count.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListItem {
    #[serde(flatten)]
    pub question: Question,
    pub subject: SubjectRef,
    pub system: NamedRef,
    pub marks_section: MarksSectionRef,
    pub file_count: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FolderSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub folder: Folder,
    pub file_count: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileWithFolder {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub file: FileRecord,
    pub folder_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubjectBreakdownItem {
    pub id: String,
    pub name: String,
    pub color: String,
    pub system_count: i64,
    pub question_count: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MarksBreakdownItem {
    pub marks: i64,
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuestionActivity {
    pub bookmarked_questions: i64,
    pub total_repeat_count: i64,
    pub questions_with_files: i64,
    pub recent_questions: i64,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCounts {
    pub subjects: i64,
    pub systems: i64,
    pub marks_sections: i64,
    pub questions: i64,
    pub files: i64,
    pub folders: i64,
}
