use super::*;
use crate::services::prelude::*;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionWithFiles {
    #[serde(flatten)]
    pub question: Question,
    pub files: Vec<FileRef>,
    pub file_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksSectionDetail {
    #[serde(flatten)]
    pub section: MarksSection,
    pub system: NamedRef,
    pub subject: SubjectRef,
    pub questions: Vec<QuestionWithFiles>,
    pub question_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksSectionListItem {
    #[serde(flatten)]
    pub summary: MarksSectionSummary,
    pub system: NamedRef,
    pub subject: SubjectRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksSectionsQuery {
    pub id: Option<String>,
    pub system_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarksSectionRequest {
    pub marks: Option<Value>,
    pub label: Option<String>,
    pub system_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMarksSectionRequest {
    pub id: Option<String>,
    pub marks: Option<Value>,
    pub label: Option<String>,
    pub system_id: Option<String>,
}

/// Marks may arrive as a JSON number or a numeric string.
fn parse_marks(value: &Value) -> CatalogResult<i64> {
    let marks = match value {
        Value::Number(num) => num.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    marks
        .filter(|marks| *marks > 0)
        .ok_or_else(|| CatalogError::validation("Marks must be a positive integer"))
}

async fn placement(
    repo: &SqliteRepository,
    system_id: &str,
) -> CatalogResult<(NamedRef, SubjectRef)> {
    let system = repo
        .get_system(system_id)
        .await?
        .ok_or(CatalogError::NotFound("System"))?;
    let subject = repo
        .get_subject(&system.subject_id)
        .await?
        .ok_or(CatalogError::NotFound("Subject"))?;
    Ok((
        NamedRef {
            id: system.id,
            name: system.name,
        },
        SubjectRef {
            id: subject.id,
            name: subject.name,
            color: subject.color,
        },
    ))
}

async fn load_detail(repo: &SqliteRepository, id: &str) -> CatalogResult<MarksSectionDetail> {
    let section = repo
        .get_marks_section(id)
        .await?
        .ok_or(CatalogError::NotFound("Marks section"))?;
    let (system, subject) = placement(repo, &section.system_id).await?;
    let mut questions = Vec::new();
    for question in repo.questions_for_marks_section(&section.id).await? {
        let files = repo.file_refs_for_question(&question.id).await?;
        questions.push(QuestionWithFiles {
            file_count: files.len(),
            question,
            files,
        });
    }
    Ok(MarksSectionDetail {
        question_count: questions.len(),
        section,
        system,
        subject,
        questions,
    })
}

pub async fn get_marks_sections(
    State(state): State<AppState>,
    Query(query): Query<MarksSectionsQuery>,
) -> CatalogResult<axum::response::Response> {
    let repo = state.repo();
    if let Some(id) = query.id.as_deref().filter(|id| !id.is_empty()) {
        let detail = load_detail(&repo, id).await?;
        return Ok(ApiResponse::ok(detail).into_response());
    }
    let system_filter = query.system_id.as_deref().filter(|id| !id.is_empty());
    let mut items = Vec::new();
    for summary in repo.list_marks_sections(system_filter).await? {
        let (system, subject) = placement(&repo, &summary.section.system_id).await?;
        items.push(MarksSectionListItem {
            summary,
            system,
            subject,
        });
    }
    Ok(ApiResponse::ok(items).into_response())
}

pub async fn create_marks_section(
    State(state): State<AppState>,
    payload: Result<Json<CreateMarksSectionRequest>, JsonRejection>,
) -> ApiResult<MarksSection> {
    let Json(body) = payload?;
    let marks = body
        .marks
        .as_ref()
        .filter(|value| !value.is_null())
        .ok_or_else(|| CatalogError::validation("Marks value is required"))
        .and_then(parse_marks)?;
    let system_id = require_id(body.system_id.as_deref(), "System")?;
    let repo = state.repo();
    if repo.get_system(system_id).await?.is_none() {
        return Err(CatalogError::NotFound("System"));
    }
    if repo.find_marks_section(system_id, marks).await?.is_some() {
        return Err(CatalogError::Conflict(format!(
            "A {} marks section already exists in this system",
            marks
        )));
    }
    let label = clean_text(body.label.as_deref()).unwrap_or_else(|| default_marks_label(marks));
    let section = repo.create_marks_section(marks, &label, system_id).await?;
    tracing::info!(marks_section_id = %section.id, marks, "marks section created");
    Ok(ApiResponse::with_message(
        section,
        "Marks section created successfully",
    ))
}

pub async fn update_marks_section(
    State(state): State<AppState>,
    payload: Result<Json<UpdateMarksSectionRequest>, JsonRejection>,
) -> ApiResult<MarksSection> {
    let Json(body) = payload?;
    let id = require_id(body.id.as_deref(), "Marks section")?;
    let repo = state.repo();
    let mut section = repo
        .get_marks_section(id)
        .await?
        .ok_or(CatalogError::NotFound("Marks section"))?;
    if let Some(system_id) = clean_text(body.system_id.as_deref()) {
        if repo.get_system(&system_id).await?.is_none() {
            return Err(CatalogError::NotFound("System"));
        }
        section.system_id = system_id;
    }
    if let Some(value) = body.marks.as_ref().filter(|value| !value.is_null()) {
        section.marks = parse_marks(value)?;
    }
    if let Some(existing) = repo.find_marks_section(&section.system_id, section.marks).await? {
        if existing.id != section.id {
            return Err(CatalogError::Conflict(format!(
                "A {} marks section already exists in this system",
                section.marks
            )));
        }
    }
    if let Some(label) = clean_text(body.label.as_deref()) {
        section.label = label;
    }
    let section = repo.update_marks_section(&section).await?;
    tracing::info!(marks_section_id = %section.id, "marks section updated");
    Ok(ApiResponse::with_message(
        section,
        "Marks section updated successfully",
    ))
}

pub async fn delete_marks_section(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Value> {
    let id = query.require("Marks section")?;
    let repo = state.repo();
    if repo.get_marks_section(id).await?.is_none() {
        return Err(CatalogError::NotFound("Marks section"));
    }
    let removed_files = repo.delete_marks_section(id).await?;
    storage::remove_all_stored(&state.data_dir, &removed_files);
    repo.refresh_statistics().await?;
    tracing::info!(marks_section_id = %id, files = removed_files.len(), "marks section deleted");
    Ok(ApiResponse::with_message(
        json!({ "id": id }),
        "Marks section deleted successfully",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_marks() {
        assert_eq!(parse_marks(&json!(10)).unwrap(), 10);
        assert_eq!(parse_marks(&json!(" 8 ")).unwrap(), 8);
        assert!(parse_marks(&json!(0)).is_err());
        assert!(parse_marks(&json!(-3)).is_err());
        assert!(parse_marks(&json!(2.5)).is_err());
        assert!(parse_marks(&json!("ten")).is_err());
    }
}
