use super::SqliteRepository;
use crate::db::models::{System, SystemSummary};
use crate::db::utils::{new_id, now_ts};

impl SqliteRepository {
    pub async fn list_systems(
        &self,
        subject_id: Option<&str>,
    ) -> Result<Vec<SystemSummary>, sqlx::Error> {
        let query = match subject_id {
            Some(_) => {
                "SELECT s.*,
                        (SELECT COUNT(*) FROM questions WHERE system_id = s.id) AS question_count,
                        (SELECT COUNT(*) FROM marks_sections WHERE system_id = s.id) AS marks_section_count
                 FROM systems s
                 WHERE s.subject_id = ?
                 ORDER BY s.sort_order ASC, s.created_at ASC, s.rowid ASC"
            }
            None => {
                "SELECT s.*,
                        (SELECT COUNT(*) FROM questions WHERE system_id = s.id) AS question_count,
                        (SELECT COUNT(*) FROM marks_sections WHERE system_id = s.id) AS marks_section_count
                 FROM systems s
                 ORDER BY s.sort_order ASC, s.created_at ASC, s.rowid ASC"
            }
        };
        let mut q = sqlx::query_as::<_, SystemSummary>(query);
        if let Some(id) = subject_id {
            q = q.bind(id);
        }
        q.fetch_all(&self.pool).await
    }
    pub async fn get_system(&self, id: &str) -> Result<Option<System>, sqlx::Error> {
        sqlx::query_as::<_, System>("SELECT * FROM systems WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn get_system_summary(&self, id: &str) -> Result<Option<SystemSummary>, sqlx::Error> {
        sqlx::query_as::<_, SystemSummary>(
            "SELECT s.*,
                    (SELECT COUNT(*) FROM questions WHERE system_id = s.id) AS question_count,
                    (SELECT COUNT(*) FROM marks_sections WHERE system_id = s.id) AS marks_section_count
             FROM systems s
             WHERE s.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
    pub async fn find_system_by_name(
        &self,
        subject_id: &str,
        name: &str,
    ) -> Result<Option<System>, sqlx::Error> {
        sqlx::query_as::<_, System>("SELECT * FROM systems WHERE subject_id = ? AND name = ?")
            .bind(subject_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn next_system_order(&self, subject_id: &str) -> Result<i64, sqlx::Error> {
        let max_order: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT MAX(sort_order) FROM systems WHERE subject_id = ?")
                .bind(subject_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(max_order.and_then(|(v,)| v).unwrap_or(-1) + 1)
    }
    pub async fn create_system(
        &self,
        name: &str,
        description: Option<&str>,
        order: i64,
        subject_id: &str,
    ) -> Result<System, sqlx::Error> {
        let now = now_ts();
        let system = System {
            id: new_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            order,
            subject_id: subject_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO systems (id, name, description, sort_order, subject_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&system.id)
        .bind(&system.name)
        .bind(&system.description)
        .bind(system.order)
        .bind(&system.subject_id)
        .bind(system.created_at)
        .bind(system.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(system)
    }
    pub async fn update_system(&self, system: &System) -> Result<System, sqlx::Error> {
        let now = now_ts();
        sqlx::query(
            "UPDATE systems
             SET name = ?, description = ?, sort_order = ?, subject_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&system.name)
        .bind(&system.description)
        .bind(system.order)
        .bind(&system.subject_id)
        .bind(now)
        .bind(&system.id)
        .execute(&self.pool)
        .await?;
        Ok(System {
            updated_at: now,
            ..system.clone()
        })
    }
    pub async fn delete_system(&self, id: &str) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let urls: Vec<(String,)> = sqlx::query_as(
            "SELECT f.url FROM files f
             JOIN questions q ON q.id = f.question_id
             WHERE q.system_id = ?
                OR q.marks_section_id IN (SELECT id FROM marks_sections WHERE system_id = ?)",
        )
        .bind(id)
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM systems WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(urls.into_iter().map(|(url,)| url).collect())
    }
}
