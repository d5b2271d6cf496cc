use super::*;
use crate::services::prelude::*;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTitleRef {
    pub id: String,
    pub title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDetail {
    #[serde(flatten)]
    pub folder: Folder,
    pub question: QuestionTitleRef,
    pub files: Vec<FileWithFolder>,
    pub file_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldersQuery {
    pub id: Option<String>,
    pub question_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub name: Option<String>,
    pub question_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFolderRequest {
    pub id: Option<String>,
    pub name: Option<String>,
}

fn folder_conflict() -> CatalogError {
    CatalogError::Conflict("Folder with this name already exists".to_string())
}

pub async fn get_folders(
    State(state): State<AppState>,
    Query(query): Query<FoldersQuery>,
) -> CatalogResult<axum::response::Response> {
    let repo = state.repo();
    if let Some(id) = query.id.as_deref().filter(|id| !id.is_empty()) {
        let folder = repo
            .get_folder(id)
            .await?
            .ok_or(CatalogError::NotFound("Folder"))?;
        let question = repo
            .get_question(&folder.question_id)
            .await?
            .ok_or(CatalogError::NotFound("Question"))?;
        let files = repo
            .list_files(None, &FileFolderFilter::Folder(folder.id.clone()))
            .await?;
        let detail = FolderDetail {
            file_count: files.len(),
            question: QuestionTitleRef {
                id: question.id,
                title: question.title,
            },
            folder,
            files,
        };
        return Ok(ApiResponse::ok(detail).into_response());
    }
    let question_filter = query.question_id.as_deref().filter(|id| !id.is_empty());
    let folders = repo.list_folders(question_filter).await?;
    Ok(ApiResponse::ok(folders).into_response())
}

pub async fn create_folder(
    State(state): State<AppState>,
    payload: Result<Json<CreateFolderRequest>, JsonRejection>,
) -> ApiResult<Folder> {
    let Json(body) = payload?;
    let name = clean_text(body.name.as_deref())
        .ok_or_else(|| CatalogError::validation("Folder name is required"))?;
    let question_id = require_id(body.question_id.as_deref(), "Question")?;
    let repo = state.repo();
    if repo.get_question(question_id).await?.is_none() {
        return Err(CatalogError::NotFound("Question"));
    }
    if repo.find_folder_by_name(question_id, &name).await?.is_some() {
        return Err(folder_conflict());
    }
    let folder = repo.create_folder(&name, question_id).await?;
    tracing::info!(folder_id = %folder.id, question_id = %question_id, "folder created");
    Ok(ApiResponse::with_message(folder, "Folder created successfully"))
}

pub async fn update_folder(
    State(state): State<AppState>,
    payload: Result<Json<UpdateFolderRequest>, JsonRejection>,
) -> ApiResult<Folder> {
    let Json(body) = payload?;
    let id = require_id(body.id.as_deref(), "Folder")?;
    let repo = state.repo();
    let folder = repo
        .get_folder(id)
        .await?
        .ok_or(CatalogError::NotFound("Folder"))?;
    let Some(name) = body.name.as_deref() else {
        return Ok(ApiResponse::with_message(folder, "Folder updated successfully"));
    };
    let name = clean_text(Some(name))
        .ok_or_else(|| CatalogError::validation("Folder name cannot be empty"))?;
    if name != folder.name
        && repo
            .find_folder_by_name(&folder.question_id, &name)
            .await?
            .is_some()
    {
        return Err(folder_conflict());
    }
    let folder = repo.rename_folder(&folder, &name).await?;
    tracing::info!(folder_id = %folder.id, "folder renamed");
    Ok(ApiResponse::with_message(folder, "Folder updated successfully"))
}

pub async fn delete_folder(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Value> {
    let id = query.require("Folder")?;
    let repo = state.repo();
    if repo.get_folder(id).await?.is_none() {
        return Err(CatalogError::NotFound("Folder"));
    }
    let released = repo.delete_folder(id).await?;
    tracing::info!(folder_id = %id, released_files = released, "folder deleted");
    Ok(ApiResponse::with_message(
        json!({ "id": id, "releasedFiles": released }),
        "Folder deleted successfully",
    ))
}
