use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::Multipart;
use http::header;

use super::*;
use crate::services::prelude::*;
use crate::services::utils::sanitize_filename;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPlacement {
    pub id: String,
    pub title: String,
    pub subject: SubjectRef,
    pub system: NamedRef,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    #[serde(flatten)]
    pub file: FileWithFolder,
    pub question: QuestionPlacement,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesQuery {
    pub id: Option<String>,
    pub question_id: Option<String>,
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub folder_id: Option<Option<String>>,
}

#[derive(Default)]
struct UploadForm {
    file_name: Option<String>,
    content_type: String,
    bytes: Option<Vec<u8>>,
    question_id: Option<String>,
    folder_id: Option<String>,
    description: Option<String>,
    name: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart, max_bytes: usize) -> CatalogResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        match field_name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if bytes.len() > max_bytes {
                    return Err(CatalogError::validation("File exceeds maximum size"));
                }
                form.bytes = Some(bytes.to_vec());
            }
            "questionId" => form.question_id = clean_text(Some(field.text().await?.as_str())),
            "folderId" => form.folder_id = clean_text(Some(field.text().await?.as_str())),
            "description" => form.description = clean_text(Some(field.text().await?.as_str())),
            "name" => form.name = clean_text(Some(field.text().await?.as_str())),
            _ => {}
        }
    }
    Ok(form)
}

/// A folder can only hold files of the question it belongs to.
async fn verify_folder(
    repo: &SqliteRepository,
    folder_id: &str,
    question_id: &str,
) -> CatalogResult<()> {
    let folder = repo
        .get_folder(folder_id)
        .await?
        .ok_or(CatalogError::NotFound("Folder"))?;
    if folder.question_id != question_id {
        return Err(CatalogError::validation(
            "Folder belongs to a different question",
        ));
    }
    Ok(())
}

async fn load_file(repo: &SqliteRepository, id: &str) -> CatalogResult<FileWithFolder> {
    repo.get_file(id).await?.ok_or(CatalogError::NotFound("File"))
}

pub async fn get_files(
    State(state): State<AppState>,
    Query(query): Query<FilesQuery>,
) -> CatalogResult<axum::response::Response> {
    let repo = state.repo();
    if let Some(id) = query.id.as_deref().filter(|id| !id.is_empty()) {
        let file = load_file(&repo, id).await?;
        let question = repo
            .get_question_item(&file.file.question_id)
            .await?
            .ok_or(CatalogError::NotFound("Question"))?;
        let detail = FileDetail {
            file,
            question: QuestionPlacement {
                id: question.question.id,
                title: question.question.title,
                subject: question.subject,
                system: question.system,
            },
        };
        return Ok(ApiResponse::ok(detail).into_response());
    }
    let question_filter = query.question_id.as_deref().filter(|id| !id.is_empty());
    let folder_filter = FileFolderFilter::from_query(query.folder_id.as_deref());
    let files = repo.list_files(question_filter, &folder_filter).await?;
    Ok(ApiResponse::ok(files).into_response())
}

pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<FileWithFolder> {
    let multipart = multipart.map_err(|rejection| CatalogError::validation(rejection.body_text()))?;
    let form = read_upload_form(multipart, state.max_upload_bytes).await?;
    let bytes = form
        .bytes
        .ok_or_else(|| CatalogError::validation("No file provided"))?;
    let question_id = require_id(form.question_id.as_deref(), "Question")?;
    let repo = state.repo();
    if repo.get_question(question_id).await?.is_none() {
        return Err(CatalogError::NotFound("Question"));
    }
    if let Some(folder_id) = form.folder_id.as_deref() {
        verify_folder(&repo, folder_id, question_id).await?;
    }
    let original_name = sanitize_filename(form.file_name.as_deref().unwrap_or_default());
    let stored = storage::store_bytes(&state.data_dir, &original_name, &form.content_type, &bytes)?;
    let now = now_ts();
    let record = FileRecord {
        id: new_id(),
        name: form.name.unwrap_or_else(|| original_name.clone()),
        file_type: file_type_for(&original_name).to_string(),
        url: stored.rel_path,
        size: stored.size,
        description: form.description,
        question_id: question_id.to_string(),
        folder_id: form.folder_id,
        created_at: now,
        updated_at: now,
    };
    if let Err(err) = repo.insert_file(&record).await {
        storage::remove_stored(&state.data_dir, &record.url);
        return Err(err.into());
    }
    repo.refresh_statistics().await?;
    tracing::info!(
        file_id = %record.id,
        question_id = %record.question_id,
        file_type = %record.file_type,
        size = record.size,
        "file uploaded"
    );
    let file = load_file(&repo, &record.id).await?;
    Ok(ApiResponse::with_message(file, "File uploaded successfully"))
}

pub async fn update_file(
    State(state): State<AppState>,
    payload: Result<Json<UpdateFileRequest>, JsonRejection>,
) -> ApiResult<FileWithFolder> {
    let Json(body) = payload?;
    let id = require_id(body.id.as_deref(), "File")?;
    let repo = state.repo();
    let mut record = load_file(&repo, id).await?.file;
    if let Some(name) = body.name.as_deref() {
        record.name = clean_text(Some(name))
            .ok_or_else(|| CatalogError::validation("File name cannot be empty"))?;
    }
    if let Some(description) = body.description.as_deref() {
        record.description = clean_text(Some(description));
    }
    match body.folder_id {
        None => {}
        Some(None) => record.folder_id = None,
        Some(Some(folder_id)) => {
            let folder_id = folder_id.trim().to_string();
            if folder_id.is_empty() {
                record.folder_id = None;
            } else {
                verify_folder(&repo, &folder_id, &record.question_id).await?;
                record.folder_id = Some(folder_id);
            }
        }
    }
    record.updated_at = now_ts();
    repo.update_file(&record).await?;
    tracing::info!(file_id = %record.id, "file updated");
    let file = load_file(&repo, &record.id).await?;
    Ok(ApiResponse::with_message(file, "File updated successfully"))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Value> {
    let id = query.require("File")?;
    let repo = state.repo();
    let Some(rel_path) = repo.delete_file(id).await? else {
        return Err(CatalogError::NotFound("File"));
    };
    storage::remove_stored(&state.data_dir, &rel_path);
    repo.refresh_statistics().await?;
    tracing::info!(file_id = %id, "file deleted");
    Ok(ApiResponse::with_message(
        json!({ "id": id }),
        "File deleted successfully",
    ))
}

pub async fn get_file_content(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> CatalogResult<axum::response::Response> {
    let id = query.require("File")?;
    let file = load_file(&state.repo(), id).await?.file;
    let bytes = storage::read_stored(&state.data_dir, &file.url)?;
    let mime = mime_guess::from_path(&file.name)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!(
        "inline; filename*=UTF-8''{}",
        urlencoding::encode(&file.name)
    );
    let response = (
        [
            (header::CONTENT_TYPE, mime),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(bytes),
    )
        .into_response();
    Ok(response)
}
