use super::SqliteRepository;
use crate::db::models::{FileRecord, FileRef, FileWithFolder};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FileFolderFilter {
    #[default]
    Any,
    /// Files that sit directly on the question.
    Unfiled,
    Folder(String),
}

impl FileFolderFilter {
    /// `"null"` is how clients ask for folder-less files.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => FileFolderFilter::Any,
            Some("null") => FileFolderFilter::Unfiled,
            Some(id) => FileFolderFilter::Folder(id.to_string()),
        }
    }
}

const FILE_SELECT: &str = "SELECT f.*, fo.name AS folder_name
     FROM files f
     LEFT JOIN folders fo ON fo.id = f.folder_id";

impl SqliteRepository {
    pub async fn list_files(
        &self,
        question_id: Option<&str>,
        folder: &FileFolderFilter,
    ) -> Result<Vec<FileWithFolder>, sqlx::Error> {
        let mut query = format!("{} WHERE 1 = 1", FILE_SELECT);
        if question_id.is_some() {
            query.push_str(" AND f.question_id = ?");
        }
        match folder {
            FileFolderFilter::Any => {}
            FileFolderFilter::Unfiled => query.push_str(" AND f.folder_id IS NULL"),
            FileFolderFilter::Folder(_) => query.push_str(" AND f.folder_id = ?"),
        }
        query.push_str(" ORDER BY f.created_at DESC, f.rowid DESC");
        let mut q = sqlx::query_as::<_, FileWithFolder>(&query);
        if let Some(id) = question_id {
            q = q.bind(id);
        }
        if let FileFolderFilter::Folder(id) = folder {
            q = q.bind(id);
        }
        q.fetch_all(&self.pool).await
    }
    pub async fn get_file(&self, id: &str) -> Result<Option<FileWithFolder>, sqlx::Error> {
        let query = format!("{} WHERE f.id = ?", FILE_SELECT);
        sqlx::query_as::<_, FileWithFolder>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
    pub async fn file_refs_for_question(
        &self,
        question_id: &str,
    ) -> Result<Vec<FileRef>, sqlx::Error> {
        sqlx::query_as::<_, FileRef>(
            "SELECT id, name, file_type FROM files WHERE question_id = ? ORDER BY created_at DESC",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
    }
    pub async fn insert_file(&self, file: &FileRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO files (
                id, name, file_type, url, size, description, question_id, folder_id, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.id)
        .bind(&file.name)
        .bind(&file.file_type)
        .bind(&file.url)
        .bind(file.size)
        .bind(&file.description)
        .bind(&file.question_id)
        .bind(&file.folder_id)
        .bind(file.created_at)
        .bind(file.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
    pub async fn update_file(&self, file: &FileRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE files SET name = ?, description = ?, folder_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&file.name)
        .bind(&file.description)
        .bind(&file.folder_id)
        .bind(file.updated_at)
        .bind(&file.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
    /// Returns the storage path of the removed row.
    pub async fn delete_file(&self, id: &str) -> Result<Option<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let row: Option<(String,)> = sqlx::query_as("SELECT url FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.map(|(url,)| url))
    }
}
