use std::future::Future;

use serde::de::DeserializeOwned;

use super::*;
use crate::services::prelude::*;
use crate::services::questions::apply_score;

pub const BACKUP_VERSION: &str = "1.0";
pub const BACKUPS_DIR_NAME: &str = "backups";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    pub subjects: Vec<Subject>,
    pub systems: Vec<System>,
    pub marks_sections: Vec<MarksSection>,
    pub questions: Vec<Question>,
    pub files: Vec<FileRecord>,
    pub folders: Vec<Folder>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: String,
    pub exported_at: String,
    pub statistics: Option<Statistics>,
    pub counts: CatalogCounts,
    pub data: BackupData,
}

#[derive(Debug, Serialize)]
pub struct BackupFileInfo {
    pub filename: String,
    pub filepath: String,
}

#[derive(Debug, Serialize)]
pub struct BackupExport {
    #[serde(flatten)]
    pub document: BackupDocument,
    pub file: BackupFileInfo,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub data: Option<Value>,
    #[serde(default)]
    pub mode: ImportMode,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub subjects: usize,
    pub systems: usize,
    pub marks_sections: usize,
    pub questions: usize,
    pub files: usize,
    pub folders: usize,
    pub errors: Vec<String>,
}

pub async fn build_document(repo: &SqliteRepository) -> CatalogResult<BackupDocument> {
    let subjects = repo.all_subjects().await?;
    let systems = repo.all_systems().await?;
    let marks_sections = repo.all_marks_sections().await?;
    let questions = repo.all_questions().await?;
    let files = repo.all_files().await?;
    let folders = repo.all_folders().await?;
    let counts = CatalogCounts {
        subjects: subjects.len() as i64,
        systems: systems.len() as i64,
        marks_sections: marks_sections.len() as i64,
        questions: questions.len() as i64,
        files: files.len() as i64,
        folders: folders.len() as i64,
    };
    Ok(BackupDocument {
        version: BACKUP_VERSION.to_string(),
        exported_at: chrono::Utc::now().to_rfc3339(),
        statistics: repo.get_statistics().await?,
        counts,
        data: BackupData {
            subjects,
            systems,
            marks_sections,
            questions,
            files,
            folders,
        },
    })
}

fn write_backup_file(data_dir: &Path, document: &BackupDocument) -> CatalogResult<BackupFileInfo> {
    let dir = data_dir.join(BACKUPS_DIR_NAME);
    fs::create_dir_all(&dir)?;
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let filename = format!("question-bank-backup-{}.json", stamp);
    let path = dir.join(&filename);
    fs::write(&path, serde_json::to_vec_pretty(document)?)?;
    Ok(BackupFileInfo {
        filename,
        filepath: path.to_string_lossy().to_string(),
    })
}

pub async fn export_backup(State(state): State<AppState>) -> ApiResult<BackupExport> {
    let document = build_document(&state.repo()).await?;
    let file = write_backup_file(&state.data_dir, &document)?;
    tracing::info!(
        path = %file.filepath,
        subjects = document.counts.subjects,
        questions = document.counts.questions,
        "backup exported"
    );
    Ok(ApiResponse::with_message(
        BackupExport { document, file },
        "Backup created successfully",
    ))
}

fn record_label(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(|value| value.as_str().map(str::to_string).or_else(|| Some(value.to_string())))
        .filter(|label| label != "null")
        .unwrap_or_else(|| "<unnamed>".to_string())
}

fn fill_timestamps(created_at: &mut i64, updated_at: &mut i64, now: i64) {
    if *created_at <= 0 {
        *created_at = now;
    }
    if *updated_at <= 0 {
        *updated_at = *created_at;
    }
}

/// Decodes and writes each record on its own. A failing record is reported
/// as `"<kind>: <label> - <error>"` and the rest carry on.
async fn import_records<T, F, Fut>(
    records: Option<&Value>,
    kind: &str,
    label_key: &str,
    errors: &mut Vec<String>,
    mut write: F,
) -> usize
where
    T: DeserializeOwned,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = CatalogResult<()>>,
{
    let Some(records) = records.and_then(Value::as_array) else {
        return 0;
    };
    let mut imported = 0;
    for record in records {
        let result = match serde_json::from_value::<T>(record.clone()) {
            Ok(decoded) => write(decoded).await,
            Err(err) => Err(err.into()),
        };
        match result {
            Ok(()) => imported += 1,
            Err(err) => {
                let message = format!("{}: {} - {}", kind, record_label(record, label_key), err);
                tracing::warn!(error = %message, "backup record skipped");
                errors.push(message);
            }
        }
    }
    imported
}

pub async fn restore(
    repo: &SqliteRepository,
    data: &Value,
    mode: ImportMode,
) -> CatalogResult<ImportSummary> {
    if mode == ImportMode::Replace {
        repo.wipe_catalog().await?;
    }
    let now = now_ts();
    let mut summary = ImportSummary::default();
    let errors = &mut summary.errors;

    summary.subjects = import_records(
        data.get("subjects"),
        "Subject",
        "name",
        errors,
        |mut subject: Subject| async move {
            fill_timestamps(&mut subject.created_at, &mut subject.updated_at, now);
            repo.import_subject(&subject, mode)
                .await
                .map_err(CatalogError::from)
        },
    )
    .await;
    summary.systems = import_records(
        data.get("systems"),
        "System",
        "name",
        errors,
        |mut system: System| async move {
            fill_timestamps(&mut system.created_at, &mut system.updated_at, now);
            repo.import_system(&system, mode)
                .await
                .map_err(CatalogError::from)
        },
    )
    .await;
    summary.marks_sections = import_records(
        data.get("marksSections"),
        "MarksSection",
        "label",
        errors,
        |mut section: MarksSection| async move {
            fill_timestamps(&mut section.created_at, &mut section.updated_at, now);
            repo.import_marks_section(&section, mode)
                .await
                .map_err(CatalogError::from)
        },
    )
    .await;
    summary.questions = import_records(
        data.get("questions"),
        "Question",
        "title",
        errors,
        |mut question: Question| async move {
            fill_timestamps(&mut question.created_at, &mut question.updated_at, now);
            apply_score(&mut question);
            repo.import_question(&question, mode)
                .await
                .map_err(CatalogError::from)
        },
    )
    .await;
    summary.folders = import_records(
        data.get("folders"),
        "Folder",
        "name",
        errors,
        |mut folder: Folder| async move {
            fill_timestamps(&mut folder.created_at, &mut folder.updated_at, now);
            repo.import_folder(&folder, mode)
                .await
                .map_err(CatalogError::from)
        },
    )
    .await;
    summary.files = import_records(
        data.get("files"),
        "File",
        "name",
        errors,
        |mut file: FileRecord| async move {
            fill_timestamps(&mut file.created_at, &mut file.updated_at, now);
            repo.import_file(&file, mode)
                .await
                .map_err(CatalogError::from)
        },
    )
    .await;

    repo.refresh_statistics().await?;
    Ok(summary)
}

pub async fn import_backup(
    State(state): State<AppState>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> ApiResult<ImportSummary> {
    let Json(body) = payload?;
    let data = body
        .data
        .filter(|data| data.is_object())
        .ok_or_else(|| CatalogError::validation("No backup data provided"))?;
    let summary = restore(&state.repo(), &data, body.mode).await?;
    tracing::info!(
        mode = ?body.mode,
        subjects = summary.subjects,
        systems = summary.systems,
        marks_sections = summary.marks_sections,
        questions = summary.questions,
        folders = summary.folders,
        files = summary.files,
        errors = summary.errors.len(),
        "backup imported"
    );
    Ok(ApiResponse::with_message(summary, "Backup imported successfully"))
}
