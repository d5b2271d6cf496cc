use super::SqliteRepository;
use crate::db::models::{NamedRef, Subject, SubjectSummary};
use crate::db::utils::{new_id, now_ts};

impl SqliteRepository {
    pub async fn list_subjects(&self) -> Result<Vec<SubjectSummary>, sqlx::Error> {
        sqlx::query_as::<_, SubjectSummary>(
            "SELECT s.*,
                    (SELECT COUNT(*) FROM systems WHERE subject_id = s.id) AS system_count,
                    (SELECT COUNT(*) FROM questions WHERE subject_id = s.id) AS question_count
             FROM subjects s
             ORDER BY s.created_at ASC, s.rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
    }
    pub async fn get_subject(&self, id: &str) -> Result<Option<Subject>, sqlx::Error> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn get_subject_by_name(&self, name: &str) -> Result<Option<Subject>, sqlx::Error> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn subject_system_refs(&self, subject_id: &str) -> Result<Vec<NamedRef>, sqlx::Error> {
        sqlx::query_as::<_, NamedRef>(
            "SELECT id, name FROM systems WHERE subject_id = ? ORDER BY sort_order ASC, created_at ASC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
    }
    pub async fn create_subject(
        &self,
        name: &str,
        description: Option<&str>,
        color: &str,
        icon: Option<&str>,
    ) -> Result<Subject, sqlx::Error> {
        let now = now_ts();
        let subject = Subject {
            id: new_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            color: color.to_string(),
            icon: icon.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO subjects (id, name, description, color, icon, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&subject.id)
        .bind(&subject.name)
        .bind(&subject.description)
        .bind(&subject.color)
        .bind(&subject.icon)
        .bind(subject.created_at)
        .bind(subject.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(subject)
    }
    pub async fn update_subject(&self, subject: &Subject) -> Result<Subject, sqlx::Error> {
        let now = now_ts();
        sqlx::query(
            "UPDATE subjects SET name = ?, description = ?, color = ?, icon = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&subject.name)
        .bind(&subject.description)
        .bind(&subject.color)
        .bind(&subject.icon)
        .bind(now)
        .bind(&subject.id)
        .execute(&self.pool)
        .await?;
        Ok(Subject {
            updated_at: now,
            ..subject.clone()
        })
    }
    /// Deletes the subject and everything under it. Returns the storage paths
    /// of the attachments removed by the cascade.
    pub async fn delete_subject(&self, id: &str) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let urls: Vec<(String,)> = sqlx::query_as(
            "SELECT f.url FROM files f
             JOIN questions q ON q.id = f.question_id
             WHERE q.subject_id = ?
                OR q.system_id IN (SELECT id FROM systems WHERE subject_id = ?)
                OR q.marks_section_id IN (
                    SELECT ms.id FROM marks_sections ms
                    JOIN systems s ON s.id = ms.system_id
                    WHERE s.subject_id = ?
                )",
        )
        .bind(id)
        .bind(id)
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM subjects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(urls.into_iter().map(|(url,)| url).collect())
    }
}
