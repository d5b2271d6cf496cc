use super::*;
use crate::services::prelude::*;

pub const DEFAULT_SUBJECT_COLOR: &str = "#3b82f6";
const FEATURED_PER_SUBJECT: i64 = 5;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectOverview {
    #[serde(flatten)]
    pub summary: SubjectSummary,
    pub systems: Vec<NamedRef>,
    pub featured_questions: Vec<QuestionListItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubjectRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

pub async fn get_subjects(State(state): State<AppState>) -> ApiResult<Vec<SubjectOverview>> {
    let repo = state.repo();
    let subjects = repo.list_subjects().await?;
    let mut overview = Vec::with_capacity(subjects.len());
    for summary in subjects {
        let systems = repo.subject_system_refs(&summary.subject.id).await?;
        let featured_questions = repo
            .list_questions(&QuestionFilter {
                subject_id: Some(summary.subject.id.clone()),
                limit: Some(FEATURED_PER_SUBJECT),
                order: QuestionOrder::Featured,
                ..Default::default()
            })
            .await?;
        overview.push(SubjectOverview {
            summary,
            systems,
            featured_questions,
        });
    }
    Ok(ApiResponse::ok(overview))
}

pub async fn create_subject(
    State(state): State<AppState>,
    payload: Result<Json<CreateSubjectRequest>, JsonRejection>,
) -> ApiResult<Subject> {
    let Json(body) = payload?;
    let name = clean_text(body.name.as_deref())
        .ok_or_else(|| CatalogError::validation("Subject name is required"))?;
    let repo = state.repo();
    if repo.get_subject_by_name(&name).await?.is_some() {
        return Err(CatalogError::Conflict(
            "Subject with this name already exists".to_string(),
        ));
    }
    let color = clean_text(body.color.as_deref()).unwrap_or_else(|| DEFAULT_SUBJECT_COLOR.to_string());
    let subject = repo
        .create_subject(
            &name,
            clean_text(body.description.as_deref()).as_deref(),
            &color,
            clean_text(body.icon.as_deref()).as_deref(),
        )
        .await?;
    repo.refresh_statistics().await?;
    tracing::info!(subject_id = %subject.id, "subject created");
    Ok(ApiResponse::with_message(subject, "Subject created successfully"))
}

pub async fn update_subject(
    State(state): State<AppState>,
    payload: Result<Json<UpdateSubjectRequest>, JsonRejection>,
) -> ApiResult<Subject> {
    let Json(body) = payload?;
    let id = require_id(body.id.as_deref(), "Subject")?;
    let repo = state.repo();
    let mut subject = repo
        .get_subject(id)
        .await?
        .ok_or(CatalogError::NotFound("Subject"))?;
    if let Some(name) = body.name.as_deref() {
        let name = clean_text(Some(name))
            .ok_or_else(|| CatalogError::validation("Subject name cannot be empty"))?;
        if name != subject.name && repo.get_subject_by_name(&name).await?.is_some() {
            return Err(CatalogError::Conflict(
                "Subject with this name already exists".to_string(),
            ));
        }
        subject.name = name;
    }
    if let Some(description) = body.description.as_deref() {
        subject.description = clean_text(Some(description));
    }
    if let Some(color) = clean_text(body.color.as_deref()) {
        subject.color = color;
    }
    if let Some(icon) = body.icon.as_deref() {
        subject.icon = clean_text(Some(icon));
    }
    let subject = repo.update_subject(&subject).await?;
    tracing::info!(subject_id = %subject.id, "subject updated");
    Ok(ApiResponse::with_message(subject, "Subject updated successfully"))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Value> {
    let id = query.require("Subject")?;
    let repo = state.repo();
    if repo.get_subject(id).await?.is_none() {
        return Err(CatalogError::NotFound("Subject"));
    }
    let removed_files = repo.delete_subject(id).await?;
    storage::remove_all_stored(&state.data_dir, &removed_files);
    repo.refresh_statistics().await?;
    tracing::info!(subject_id = %id, files = removed_files.len(), "subject deleted");
    Ok(ApiResponse::with_message(
        json!({ "id": id }),
        "Subject deleted successfully",
    ))
}
