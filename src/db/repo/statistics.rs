use super::SqliteRepository;
use crate::db::models::{
    CatalogCounts, MarksBreakdownItem, QuestionActivity, Statistics, SubjectBreakdownItem,
};
use crate::db::utils::{default_marks_label, now_ts};

const STATISTICS_ID: &str = "global";

impl SqliteRepository {
    async fn count_rows(&self, table: &'static str) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", table);
        let (count,): (i64,) = sqlx::query_as(&query).fetch_one(&self.pool).await?;
        Ok(count)
    }
    /// Recounts subjects, systems, questions and files and overwrites the
    /// singleton row. Counters are never adjusted incrementally.
    pub async fn refresh_statistics(&self) -> Result<Statistics, sqlx::Error> {
        let (total_subjects, total_systems, total_questions, total_files) = futures::try_join!(
            self.count_rows("subjects"),
            self.count_rows("systems"),
            self.count_rows("questions"),
            self.count_rows("files"),
        )?;
        let stats = Statistics {
            id: STATISTICS_ID.to_string(),
            total_subjects,
            total_systems,
            total_questions,
            total_files,
            updated_at: now_ts(),
        };
        sqlx::query(
            "INSERT INTO statistics (id, total_subjects, total_systems, total_questions, total_files, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                total_subjects = excluded.total_subjects,
                total_systems = excluded.total_systems,
                total_questions = excluded.total_questions,
                total_files = excluded.total_files,
                updated_at = excluded.updated_at",
        )
        .bind(&stats.id)
        .bind(stats.total_subjects)
        .bind(stats.total_systems)
        .bind(stats.total_questions)
        .bind(stats.total_files)
        .bind(stats.updated_at)
        .execute(&self.pool)
        .await?;
        tracing::debug!(
            subjects = total_subjects,
            systems = total_systems,
            questions = total_questions,
            files = total_files,
            "statistics refreshed"
        );
        Ok(stats)
    }
    pub async fn get_statistics(&self) -> Result<Option<Statistics>, sqlx::Error> {
        sqlx::query_as::<_, Statistics>("SELECT * FROM statistics WHERE id = ?")
            .bind(STATISTICS_ID)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn statistics_row_count(&self) -> Result<i64, sqlx::Error> {
        self.count_rows("statistics").await
    }
    /// `recent_since` is a unix timestamp; questions created at or after it count as recent.
    pub async fn question_activity(
        &self,
        recent_since: i64,
    ) -> Result<QuestionActivity, sqlx::Error> {
        sqlx::query_as::<_, QuestionActivity>(
            "SELECT
                COALESCE(SUM(CASE WHEN is_bookmarked THEN 1 ELSE 0 END), 0) AS bookmarked_questions,
                COALESCE(SUM(repeat_count), 0) AS total_repeat_count,
                COALESCE(SUM(CASE WHEN EXISTS (SELECT 1 FROM files WHERE question_id = q.id) THEN 1 ELSE 0 END), 0)
                    AS questions_with_files,
                COALESCE(SUM(CASE WHEN created_at >= ? THEN 1 ELSE 0 END), 0) AS recent_questions
             FROM questions q",
        )
        .bind(recent_since)
        .fetch_one(&self.pool)
        .await
    }
    pub async fn subject_breakdown(&self) -> Result<Vec<SubjectBreakdownItem>, sqlx::Error> {
        sqlx::query_as::<_, SubjectBreakdownItem>(
            "SELECT s.id, s.name, s.color,
                    (SELECT COUNT(*) FROM systems WHERE subject_id = s.id) AS system_count,
                    (SELECT COUNT(*) FROM questions WHERE subject_id = s.id) AS question_count
             FROM subjects s
             ORDER BY s.created_at ASC, s.rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
    }
    /// One entry per distinct marks value across all systems, highest first.
    pub async fn marks_breakdown(&self) -> Result<Vec<MarksBreakdownItem>, sqlx::Error> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT ms.marks, COUNT(q.id)
             FROM marks_sections ms
             LEFT JOIN questions q ON q.marks_section_id = ms.id
             GROUP BY ms.marks
             ORDER BY ms.marks DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(marks, count)| MarksBreakdownItem {
                marks,
                label: default_marks_label(marks),
                count,
            })
            .collect())
    }
    pub async fn catalog_counts(&self) -> Result<CatalogCounts, sqlx::Error> {
        let (subjects, systems, marks_sections, questions, files, folders) = futures::try_join!(
            self.count_rows("subjects"),
            self.count_rows("systems"),
            self.count_rows("marks_sections"),
            self.count_rows("questions"),
            self.count_rows("files"),
            self.count_rows("folders"),
        )?;
        Ok(CatalogCounts {
            subjects,
            systems,
            marks_sections,
            questions,
            files,
            folders,
        })
    }
}
