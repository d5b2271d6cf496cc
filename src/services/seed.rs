use super::*;
use crate::services::prelude::*;
use crate::services::questions::apply_score;

const SEED_CATALOG: &str = include_str!("../../resources/seed_catalog.json");
const SEED_QUESTIONS: &str = include_str!("../../resources/seed_questions.json");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedCatalog {
    marks_options: Vec<i64>,
    subjects: Vec<SeedSubject>,
}

#[derive(Debug, Deserialize)]
struct SeedSubject {
    name: String,
    description: Option<String>,
    color: String,
    icon: Option<String>,
    systems: Vec<SeedSystem>,
}

#[derive(Debug, Deserialize)]
struct SeedSystem {
    name: String,
    description: Option<String>,
    order: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedQuestion {
    subject: String,
    system: String,
    marks: i64,
    title: String,
    description: Option<String>,
    years: Vec<String>,
    global_importance: f64,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSeedSummary {
    pub subjects: usize,
    pub systems: usize,
    pub marks_sections: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSeedSummary {
    pub questions_added: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCounts {
    pub subjects: i64,
    pub systems: i64,
    pub marks_sections: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStatus {
    pub is_seeded: bool,
    pub counts: SeedCounts,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSeedStatus {
    pub has_questions: bool,
    pub questions_count: i64,
}

async fn seed_subject(
    repo: &SqliteRepository,
    info: &SeedSubject,
    marks_options: &[i64],
    summary: &mut CatalogSeedSummary,
) -> CatalogResult<()> {
    let subject = match repo.get_subject_by_name(&info.name).await? {
        Some(subject) => subject,
        None => {
            let subject = repo
                .create_subject(
                    &info.name,
                    info.description.as_deref(),
                    &info.color,
                    info.icon.as_deref(),
                )
                .await?;
            summary.subjects += 1;
            subject
        }
    };
    for system_info in &info.systems {
        let system = match repo.find_system_by_name(&subject.id, &system_info.name).await {
            Ok(Some(system)) => system,
            Ok(None) => match repo
                .create_system(
                    &system_info.name,
                    system_info.description.as_deref(),
                    system_info.order,
                    &subject.id,
                )
                .await
            {
                Ok(system) => {
                    summary.systems += 1;
                    system
                }
                Err(err) => {
                    summary
                        .errors
                        .push(format!("System {}: {}", system_info.name, err));
                    continue;
                }
            },
            Err(err) => {
                summary
                    .errors
                    .push(format!("System {}: {}", system_info.name, err));
                continue;
            }
        };
        for &marks in marks_options {
            let created = match repo.find_marks_section(&system.id, marks).await {
                Ok(Some(_)) => Ok(false),
                Ok(None) => repo
                    .create_marks_section(marks, &default_marks_label(marks), &system.id)
                    .await
                    .map(|_| true),
                Err(err) => Err(err),
            };
            match created {
                Ok(true) => summary.marks_sections += 1,
                Ok(false) => {}
                Err(err) => summary.errors.push(format!(
                    "Marks section {} for {}: {}",
                    marks, system.name, err
                )),
            }
        }
    }
    Ok(())
}

async fn seed_catalog_entries(repo: &SqliteRepository, catalog: &SeedCatalog) -> CatalogSeedSummary {
    let mut summary = CatalogSeedSummary::default();
    for info in &catalog.subjects {
        if let Err(err) = seed_subject(repo, info, &catalog.marks_options, &mut summary).await {
            summary.errors.push(format!("Subject {}: {}", info.name, err));
        }
    }
    summary
}

/// Creates the fixed subject, system and marks section catalog. Existing rows
/// are matched by name or marks and left untouched.
pub async fn run_catalog_seed(repo: &SqliteRepository) -> CatalogResult<CatalogSeedSummary> {
    let catalog: SeedCatalog = serde_json::from_str(SEED_CATALOG)?;
    let summary = seed_catalog_entries(repo, &catalog).await;
    repo.refresh_statistics().await?;
    for err in &summary.errors {
        tracing::warn!(error = %err, "catalog seed error");
    }
    tracing::info!(
        subjects = summary.subjects,
        systems = summary.systems,
        marks_sections = summary.marks_sections,
        "catalog seeded"
    );
    Ok(summary)
}

async fn seed_question(repo: &SqliteRepository, info: &SeedQuestion) -> CatalogResult<bool> {
    let Some(subject) = repo.get_subject_by_name(&info.subject).await? else {
        return Ok(false);
    };
    let Some(system) = repo.find_system_by_name(&subject.id, &info.system).await? else {
        return Ok(false);
    };
    let Some(section) = repo.find_marks_section(&system.id, info.marks).await? else {
        return Ok(false);
    };
    if repo
        .find_question_by_title(&section.id, &info.title)
        .await?
        .is_some()
    {
        return Ok(false);
    }
    let now = now_ts();
    let mut question = Question {
        id: new_id(),
        title: info.title.clone(),
        description: info.description.clone(),
        years: info.years.clone(),
        repeat_count: 0,
        importance_score: 0.0,
        global_importance: info.global_importance,
        notes: None,
        is_bookmarked: false,
        subject_id: subject.id,
        system_id: system.id,
        marks_section_id: section.id,
        created_at: now,
        updated_at: now,
    };
    apply_score(&mut question);
    repo.insert_question(&question).await?;
    Ok(true)
}

/// Inserts the sample questions into matching sections. A question whose
/// title already exists in its section is skipped.
pub async fn run_question_seed(repo: &SqliteRepository) -> CatalogResult<QuestionSeedSummary> {
    let questions: Vec<SeedQuestion> = serde_json::from_str(SEED_QUESTIONS)?;
    let mut summary = QuestionSeedSummary::default();
    for info in &questions {
        match seed_question(repo, info).await {
            Ok(true) => summary.questions_added += 1,
            Ok(false) => summary.skipped += 1,
            Err(err) => {
                let message = format!("Question: {} - {}", info.title, err);
                tracing::warn!(error = %message, "question seed error");
                summary.errors.push(message);
            }
        }
    }
    repo.refresh_statistics().await?;
    tracing::info!(
        added = summary.questions_added,
        skipped = summary.skipped,
        "questions seeded"
    );
    Ok(summary)
}

pub async fn seed_status(State(state): State<AppState>) -> ApiResult<SeedStatus> {
    let counts = state.repo().catalog_counts().await?;
    Ok(ApiResponse::ok(SeedStatus {
        is_seeded: counts.subjects > 0,
        counts: SeedCounts {
            subjects: counts.subjects,
            systems: counts.systems,
            marks_sections: counts.marks_sections,
        },
    }))
}

pub async fn seed_catalog(State(state): State<AppState>) -> ApiResult<CatalogSeedSummary> {
    let summary = run_catalog_seed(&state.repo()).await?;
    Ok(ApiResponse::with_message(
        summary,
        "Database seeded successfully",
    ))
}

pub async fn seed_questions_status(
    State(state): State<AppState>,
) -> ApiResult<QuestionSeedStatus> {
    let counts = state.repo().catalog_counts().await?;
    Ok(ApiResponse::ok(QuestionSeedStatus {
        has_questions: counts.questions > 0,
        questions_count: counts.questions,
    }))
}

pub async fn seed_questions(State(state): State<AppState>) -> ApiResult<QuestionSeedSummary> {
    let summary = run_question_seed(&state.repo()).await?;
    let message = format!("Successfully added {} questions", summary.questions_added);
    Ok(ApiResponse::with_message(summary, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_catalog_parses() {
        let catalog: SeedCatalog = serde_json::from_str(SEED_CATALOG).unwrap();
        assert_eq!(catalog.marks_options, vec![10, 8, 5, 4, 3, 2, 1]);
        assert_eq!(catalog.subjects.len(), 3);
        assert!(catalog.subjects.iter().all(|s| !s.systems.is_empty()));
    }

    #[tokio::test]
    async fn test_failed_subject_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepository {
            pool: crate::db::init_db(dir.path()).await.unwrap(),
        };
        sqlx::query(
            "CREATE TRIGGER reject_locked BEFORE INSERT ON subjects
             WHEN NEW.name = 'Locked'
             BEGIN SELECT RAISE(ABORT, 'subject locked'); END",
        )
        .execute(&repo.pool)
        .await
        .unwrap();
        let catalog: SeedCatalog = serde_json::from_value(json!({
            "marksOptions": [10, 5],
            "subjects": [
                { "name": "Locked", "color": "#000000", "systems": [{ "name": "A", "order": 0 }] },
                { "name": "Open", "color": "#ffffff", "systems": [{ "name": "B", "order": 0 }] }
            ]
        }))
        .unwrap();

        let summary = seed_catalog_entries(&repo, &catalog).await;
        assert_eq!(summary.subjects, 1);
        assert_eq!(summary.systems, 1);
        assert_eq!(summary.marks_sections, 2);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Subject Locked: "));
    }

    #[test]
    fn test_seed_questions_reference_catalog() {
        let catalog: SeedCatalog = serde_json::from_str(SEED_CATALOG).unwrap();
        let questions: Vec<SeedQuestion> = serde_json::from_str(SEED_QUESTIONS).unwrap();
        assert_eq!(questions.len(), 120);
        for question in &questions {
            let subject = catalog
                .subjects
                .iter()
                .find(|s| s.name == question.subject)
                .unwrap();
            assert!(subject.systems.iter().any(|s| s.name == question.system));
            assert!(catalog.marks_options.contains(&question.marks));
        }
    }
}
