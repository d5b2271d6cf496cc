use super::*;
use crate::db::{MarksBreakdownItem, QuestionActivity, SubjectBreakdownItem};
use crate::services::prelude::*;

const RECENT_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    #[serde(flatten)]
    pub statistics: Statistics,
    #[serde(flatten)]
    pub activity: QuestionActivity,
    pub subject_breakdown: Vec<SubjectBreakdownItem>,
    pub marks_breakdown: Vec<MarksBreakdownItem>,
}

pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<StatisticsReport> {
    let repo = state.repo();
    let statistics = repo.refresh_statistics().await?;
    let activity = repo.question_activity(now_ts() - RECENT_WINDOW_SECS).await?;
    let subject_breakdown = repo.subject_breakdown().await?;
    let marks_breakdown = repo.marks_breakdown().await?;
    Ok(ApiResponse::ok(StatisticsReport {
        statistics,
        activity,
        subject_breakdown,
        marks_breakdown,
    }))
}

pub async fn refresh_statistics(State(state): State<AppState>) -> ApiResult<Statistics> {
    let statistics = state.repo().refresh_statistics().await?;
    tracing::info!(
        subjects = statistics.total_subjects,
        questions = statistics.total_questions,
        "statistics refreshed on request"
    );
    Ok(ApiResponse::with_message(
        statistics,
        "Statistics updated successfully",
    ))
}
