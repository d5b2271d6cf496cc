use super::SqliteRepository;
use crate::db::models::{Folder, FolderSummary};
use crate::db::utils::{new_id, now_ts};

impl SqliteRepository {
    pub async fn list_folders(
        &self,
        question_id: Option<&str>,
    ) -> Result<Vec<FolderSummary>, sqlx::Error> {
        let query = match question_id {
            Some(_) => {
                "SELECT f.*, (SELECT COUNT(*) FROM files WHERE folder_id = f.id) AS file_count
                 FROM folders f
                 WHERE f.question_id = ?
                 ORDER BY f.name ASC"
            }
            None => {
                "SELECT f.*, (SELECT COUNT(*) FROM files WHERE folder_id = f.id) AS file_count
                 FROM folders f
                 ORDER BY f.name ASC"
            }
        };
        let mut q = sqlx::query_as::<_, FolderSummary>(query);
        if let Some(id) = question_id {
            q = q.bind(id);
        }
        q.fetch_all(&self.pool).await
    }
    pub async fn get_folder(&self, id: &str) -> Result<Option<Folder>, sqlx::Error> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn find_folder_by_name(
        &self,
        question_id: &str,
        name: &str,
    ) -> Result<Option<Folder>, sqlx::Error> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE question_id = ? AND name = ?")
            .bind(question_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn create_folder(&self, name: &str, question_id: &str) -> Result<Folder, sqlx::Error> {
        let now = now_ts();
        let folder = Folder {
            id: new_id(),
            name: name.to_string(),
            question_id: question_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO folders (id, name, question_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&folder.id)
        .bind(&folder.name)
        .bind(&folder.question_id)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(folder)
    }
    pub async fn rename_folder(&self, folder: &Folder, name: &str) -> Result<Folder, sqlx::Error> {
        let now = now_ts();
        sqlx::query("UPDATE folders SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(now)
            .bind(&folder.id)
            .execute(&self.pool)
            .await?;
        Ok(Folder {
            name: name.to_string(),
            updated_at: now,
            ..folder.clone()
        })
    }
    /// Files inside the folder stay attached to the question with no folder.
    pub async fn delete_folder(&self, id: &str) -> Result<u64, sqlx::Error> {
        let now = now_ts();
        let mut tx = self.pool.begin().await?;
        let released = sqlx::query("UPDATE files SET folder_id = NULL, updated_at = ? WHERE folder_id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(released)
    }
}
