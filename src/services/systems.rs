use std::collections::HashMap;

use super::*;
use crate::services::prelude::*;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDetail {
    #[serde(flatten)]
    pub summary: SystemSummary,
    pub subject: SubjectRef,
    pub marks_sections: Vec<MarksSectionSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemsQuery {
    pub id: Option<String>,
    pub subject_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSystemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub subject_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSystemRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub subject_id: Option<String>,
}

fn subject_ref(subject: &Subject) -> SubjectRef {
    SubjectRef {
        id: subject.id.clone(),
        name: subject.name.clone(),
        color: subject.color.clone(),
    }
}

async fn system_detail(
    repo: &SqliteRepository,
    summary: SystemSummary,
    subject: SubjectRef,
) -> CatalogResult<SystemDetail> {
    let marks_sections = repo.list_marks_sections(Some(&summary.system.id)).await?;
    Ok(SystemDetail {
        summary,
        subject,
        marks_sections,
    })
}

async fn load_system_detail(repo: &SqliteRepository, id: &str) -> CatalogResult<SystemDetail> {
    let summary = repo
        .get_system_summary(id)
        .await?
        .ok_or(CatalogError::NotFound("System"))?;
    let subject = repo
        .get_subject(&summary.system.subject_id)
        .await?
        .ok_or(CatalogError::NotFound("Subject"))?;
    system_detail(repo, summary, subject_ref(&subject)).await
}

pub async fn get_systems(
    State(state): State<AppState>,
    Query(query): Query<SystemsQuery>,
) -> CatalogResult<axum::response::Response> {
    let repo = state.repo();
    if let Some(id) = query.id.as_deref().filter(|id| !id.is_empty()) {
        let detail = load_system_detail(&repo, id).await?;
        return Ok(ApiResponse::ok(detail).into_response());
    }
    let subjects: HashMap<String, SubjectRef> = repo
        .all_subjects()
        .await?
        .iter()
        .map(|subject| (subject.id.clone(), subject_ref(subject)))
        .collect();
    let subject_filter = query.subject_id.as_deref().filter(|id| !id.is_empty());
    let systems = repo.list_systems(subject_filter).await?;
    let mut details = Vec::with_capacity(systems.len());
    for summary in systems {
        let Some(subject) = subjects.get(&summary.system.subject_id).cloned() else {
            continue;
        };
        details.push(system_detail(&repo, summary, subject).await?);
    }
    Ok(ApiResponse::ok(details).into_response())
}

pub async fn create_system(
    State(state): State<AppState>,
    payload: Result<Json<CreateSystemRequest>, JsonRejection>,
) -> ApiResult<SystemDetail> {
    let Json(body) = payload?;
    let name = clean_text(body.name.as_deref())
        .ok_or_else(|| CatalogError::validation("System name is required"))?;
    let subject_id = require_id(body.subject_id.as_deref(), "Subject")?;
    let repo = state.repo();
    if repo.get_subject(subject_id).await?.is_none() {
        return Err(CatalogError::NotFound("Subject"));
    }
    if repo.find_system_by_name(subject_id, &name).await?.is_some() {
        return Err(CatalogError::Conflict(
            "System with this name already exists in this subject".to_string(),
        ));
    }
    let order = match body.order {
        Some(order) => order,
        None => repo.next_system_order(subject_id).await?,
    };
    let system = repo
        .create_system(
            &name,
            clean_text(body.description.as_deref()).as_deref(),
            order,
            subject_id,
        )
        .await?;
    repo.refresh_statistics().await?;
    tracing::info!(system_id = %system.id, subject_id = %subject_id, "system created");
    let detail = load_system_detail(&repo, &system.id).await?;
    Ok(ApiResponse::with_message(detail, "System created successfully"))
}

pub async fn update_system(
    State(state): State<AppState>,
    payload: Result<Json<UpdateSystemRequest>, JsonRejection>,
) -> ApiResult<SystemDetail> {
    let Json(body) = payload?;
    let id = require_id(body.id.as_deref(), "System")?;
    let repo = state.repo();
    let mut system = repo
        .get_system(id)
        .await?
        .ok_or(CatalogError::NotFound("System"))?;
    if let Some(subject_id) = clean_text(body.subject_id.as_deref()) {
        if repo.get_subject(&subject_id).await?.is_none() {
            return Err(CatalogError::NotFound("Subject"));
        }
        system.subject_id = subject_id;
    }
    if let Some(name) = body.name.as_deref() {
        system.name = clean_text(Some(name))
            .ok_or_else(|| CatalogError::validation("System name cannot be empty"))?;
    }
    if let Some(existing) = repo.find_system_by_name(&system.subject_id, &system.name).await? {
        if existing.id != system.id {
            return Err(CatalogError::Conflict(
                "System with this name already exists in this subject".to_string(),
            ));
        }
    }
    if let Some(description) = body.description.as_deref() {
        system.description = clean_text(Some(description));
    }
    if let Some(order) = body.order {
        system.order = order;
    }
    repo.update_system(&system).await?;
    tracing::info!(system_id = %system.id, "system updated");
    let detail = load_system_detail(&repo, &system.id).await?;
    Ok(ApiResponse::with_message(detail, "System updated successfully"))
}

pub async fn delete_system(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Value> {
    let id = query.require("System")?;
    let repo = state.repo();
    if repo.get_system(id).await?.is_none() {
        return Err(CatalogError::NotFound("System"));
    }
    let removed_files = repo.delete_system(id).await?;
    storage::remove_all_stored(&state.data_dir, &removed_files);
    repo.refresh_statistics().await?;
    tracing::info!(system_id = %id, files = removed_files.len(), "system deleted");
    Ok(ApiResponse::with_message(
        json!({ "id": id }),
        "System deleted successfully",
    ))
}
