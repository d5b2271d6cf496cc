use super::*;
use crate::services::prelude::*;
use crate::services::utils::normalize_years;

pub const DEFAULT_GLOBAL_IMPORTANCE: f64 = 0.5;
pub const DEFAULT_FEATURED_LIMIT: i64 = 30;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub item: QuestionListItem,
    pub files: Vec<FileWithFolder>,
    pub folders: Vec<FolderSummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsQuery {
    pub id: Option<String>,
    pub subject_id: Option<String>,
    pub system_id: Option<String>,
    pub marks_section_id: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedQuery {
    pub subject_id: Option<String>,
    pub system_id: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub years: Option<Vec<Value>>,
    pub global_importance: Option<f64>,
    pub notes: Option<String>,
    pub is_bookmarked: Option<bool>,
    pub subject_id: Option<String>,
    pub system_id: Option<String>,
    pub marks_section_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub years: Option<Vec<Value>>,
    pub global_importance: Option<f64>,
    pub notes: Option<String>,
    pub is_bookmarked: Option<bool>,
    pub subject_id: Option<String>,
    pub system_id: Option<String>,
    pub marks_section_id: Option<String>,
}

/// Derives `repeat_count` from the years and recomputes the importance score.
/// Callers never get to set either value directly.
pub fn apply_score(question: &mut Question) {
    question.repeat_count = question.years.len() as i64;
    question.importance_score = scoring::compute_score(
        question.repeat_count,
        &question.years,
        question.global_importance,
    );
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_limit(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|limit| *limit > 0)
}

fn listing_order(order_by: Option<&str>, order_dir: Option<&str>) -> QuestionOrder {
    let sort = match order_by {
        None => QuestionSort::ImportanceScore,
        // Unknown columns fall back to newest first.
        Some(raw) => QuestionSort::parse(raw).unwrap_or(QuestionSort::CreatedAt),
    };
    QuestionOrder::Listing {
        sort,
        ascending: order_dir == Some("asc"),
    }
}

/// Confirms that every supplied reference resolves.
async fn verify_references(
    repo: &SqliteRepository,
    subject_id: Option<&str>,
    system_id: Option<&str>,
    marks_section_id: Option<&str>,
) -> CatalogResult<()> {
    if let Some(id) = subject_id {
        repo.get_subject(id)
            .await?
            .ok_or(CatalogError::NotFound("Subject"))?;
    }
    if let Some(id) = system_id {
        repo.get_system(id)
            .await?
            .ok_or(CatalogError::NotFound("System"))?;
    }
    if let Some(id) = marks_section_id {
        repo.get_marks_section(id)
            .await?
            .ok_or(CatalogError::NotFound("Marks section"))?;
    }
    Ok(())
}

async fn load_item(repo: &SqliteRepository, id: &str) -> CatalogResult<QuestionListItem> {
    repo.get_question_item(id)
        .await?
        .ok_or(CatalogError::NotFound("Question"))
}

pub async fn get_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionsQuery>,
) -> CatalogResult<axum::response::Response> {
    let repo = state.repo();
    if let Some(id) = non_empty(&query.id) {
        let item = load_item(&repo, &id).await?;
        let files = repo
            .list_files(Some(&id), &FileFolderFilter::Any)
            .await?;
        let folders = repo.list_folders(Some(&id)).await?;
        let detail = QuestionDetail {
            item,
            files,
            folders,
        };
        return Ok(ApiResponse::ok(detail).into_response());
    }
    let filter = QuestionFilter {
        subject_id: non_empty(&query.subject_id),
        system_id: non_empty(&query.system_id),
        marks_section_id: non_empty(&query.marks_section_id),
        search: non_empty(&query.search),
        limit: parse_limit(query.limit.as_deref()),
        order: listing_order(query.order_by.as_deref(), query.order_dir.as_deref()),
    };
    let questions = repo.list_questions(&filter).await?;
    Ok(ApiResponse::ok(questions).into_response())
}

pub async fn get_featured(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> ApiResult<Vec<QuestionListItem>> {
    let filter = QuestionFilter {
        subject_id: non_empty(&query.subject_id),
        system_id: non_empty(&query.system_id),
        limit: Some(parse_limit(query.limit.as_deref()).unwrap_or(DEFAULT_FEATURED_LIMIT)),
        order: QuestionOrder::Featured,
        ..Default::default()
    };
    let questions = state.repo().list_questions(&filter).await?;
    Ok(ApiResponse::ok(questions))
}

pub async fn create_question(
    State(state): State<AppState>,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> ApiResult<QuestionListItem> {
    let Json(body) = payload?;
    let title = clean_text(body.title.as_deref())
        .ok_or_else(|| CatalogError::validation("Question title is required"))?;
    let (Some(subject_id), Some(system_id), Some(marks_section_id)) = (
        non_empty(&body.subject_id),
        non_empty(&body.system_id),
        non_empty(&body.marks_section_id),
    ) else {
        return Err(CatalogError::validation(
            "Subject, System, and Marks Section are required",
        ));
    };
    let repo = state.repo();
    verify_references(
        &repo,
        Some(&subject_id),
        Some(&system_id),
        Some(&marks_section_id),
    )
    .await?;
    let years = normalize_years(body.years.as_deref().unwrap_or_default())?;
    let now = now_ts();
    let mut question = Question {
        id: new_id(),
        title,
        description: clean_text(body.description.as_deref()),
        years,
        repeat_count: 0,
        importance_score: 0.0,
        global_importance: body.global_importance.unwrap_or(DEFAULT_GLOBAL_IMPORTANCE),
        notes: clean_text(body.notes.as_deref()),
        is_bookmarked: body.is_bookmarked.unwrap_or(false),
        subject_id,
        system_id,
        marks_section_id,
        created_at: now,
        updated_at: now,
    };
    apply_score(&mut question);
    repo.insert_question(&question).await?;
    repo.refresh_statistics().await?;
    tracing::info!(
        question_id = %question.id,
        score = question.importance_score,
        "question created"
    );
    let item = load_item(&repo, &question.id).await?;
    Ok(ApiResponse::with_message(item, "Question created successfully"))
}

pub async fn update_question(
    State(state): State<AppState>,
    payload: Result<Json<UpdateQuestionRequest>, JsonRejection>,
) -> ApiResult<QuestionListItem> {
    let Json(body) = payload?;
    let id = require_id(body.id.as_deref(), "Question")?;
    let repo = state.repo();
    let mut question = repo
        .get_question(id)
        .await?
        .ok_or(CatalogError::NotFound("Question"))?;
    let subject_id = non_empty(&body.subject_id);
    let system_id = non_empty(&body.system_id);
    let marks_section_id = non_empty(&body.marks_section_id);
    verify_references(
        &repo,
        subject_id.as_deref(),
        system_id.as_deref(),
        marks_section_id.as_deref(),
    )
    .await?;
    if let Some(title) = body.title.as_deref() {
        question.title = clean_text(Some(title))
            .ok_or_else(|| CatalogError::validation("Question title cannot be empty"))?;
    }
    if let Some(description) = body.description.as_deref() {
        question.description = clean_text(Some(description));
    }
    if let Some(years) = body.years.as_deref() {
        question.years = normalize_years(years)?;
    }
    if let Some(global_importance) = body.global_importance {
        question.global_importance = global_importance;
    }
    if let Some(notes) = body.notes.as_deref() {
        question.notes = clean_text(Some(notes));
    }
    if let Some(is_bookmarked) = body.is_bookmarked {
        question.is_bookmarked = is_bookmarked;
    }
    if let Some(subject_id) = subject_id {
        question.subject_id = subject_id;
    }
    if let Some(system_id) = system_id {
        question.system_id = system_id;
    }
    if let Some(marks_section_id) = marks_section_id {
        question.marks_section_id = marks_section_id;
    }
    apply_score(&mut question);
    question.updated_at = now_ts();
    repo.update_question(&question).await?;
    tracing::info!(
        question_id = %question.id,
        score = question.importance_score,
        "question updated"
    );
    let item = load_item(&repo, &question.id).await?;
    Ok(ApiResponse::with_message(item, "Question updated successfully"))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Value> {
    let id = query.require("Question")?;
    let repo = state.repo();
    if repo.get_question(id).await?.is_none() {
        return Err(CatalogError::NotFound("Question"));
    }
    let removed_files = repo.delete_question(id).await?;
    storage::remove_all_stored(&state.data_dir, &removed_files);
    repo.refresh_statistics().await?;
    tracing::info!(question_id = %id, files = removed_files.len(), "question deleted");
    Ok(ApiResponse::with_message(
        json!({ "id": id }),
        "Question deleted successfully",
    ))
}
