use super::SqliteRepository;
use crate::db::models::{MarksSection, MarksSectionSummary};
use crate::db::utils::{new_id, now_ts};

impl SqliteRepository {
    pub async fn list_marks_sections(
        &self,
        system_id: Option<&str>,
    ) -> Result<Vec<MarksSectionSummary>, sqlx::Error> {
        let query = match system_id {
            Some(_) => {
                "SELECT ms.*,
                        (SELECT COUNT(*) FROM questions WHERE marks_section_id = ms.id) AS question_count
                 FROM marks_sections ms
                 WHERE ms.system_id = ?
                 ORDER BY ms.marks DESC"
            }
            None => {
                "SELECT ms.*,
                        (SELECT COUNT(*) FROM questions WHERE marks_section_id = ms.id) AS question_count
                 FROM marks_sections ms
                 ORDER BY ms.marks DESC"
            }
        };
        let mut q = sqlx::query_as::<_, MarksSectionSummary>(query);
        if let Some(id) = system_id {
            q = q.bind(id);
        }
        q.fetch_all(&self.pool).await
    }
    pub async fn get_marks_section(&self, id: &str) -> Result<Option<MarksSection>, sqlx::Error> {
        sqlx::query_as::<_, MarksSection>("SELECT * FROM marks_sections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn find_marks_section(
        &self,
        system_id: &str,
        marks: i64,
    ) -> Result<Option<MarksSection>, sqlx::Error> {
        sqlx::query_as::<_, MarksSection>(
            "SELECT * FROM marks_sections WHERE system_id = ? AND marks = ?",
        )
        .bind(system_id)
        .bind(marks)
        .fetch_optional(&self.pool)
        .await
    }
    pub async fn create_marks_section(
        &self,
        marks: i64,
        label: &str,
        system_id: &str,
    ) -> Result<MarksSection, sqlx::Error> {
        let now = now_ts();
        let section = MarksSection {
            id: new_id(),
            marks,
            label: label.to_string(),
            system_id: system_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO marks_sections (id, marks, label, system_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&section.id)
        .bind(section.marks)
        .bind(&section.label)
        .bind(&section.system_id)
        .bind(section.created_at)
        .bind(section.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(section)
    }
    pub async fn update_marks_section(
        &self,
        section: &MarksSection,
    ) -> Result<MarksSection, sqlx::Error> {
        let now = now_ts();
        sqlx::query(
            "UPDATE marks_sections SET marks = ?, label = ?, system_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(section.marks)
        .bind(&section.label)
        .bind(&section.system_id)
        .bind(now)
        .bind(&section.id)
        .execute(&self.pool)
        .await?;
        Ok(MarksSection {
            updated_at: now,
            ..section.clone()
        })
    }
    pub async fn delete_marks_section(&self, id: &str) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let urls: Vec<(String,)> = sqlx::query_as(
            "SELECT f.url FROM files f
             JOIN questions q ON q.id = f.question_id
             WHERE q.marks_section_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM marks_sections WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(urls.into_iter().map(|(url,)| url).collect())
    }
}
