use serde::Deserialize;

use super::SqliteRepository;
use crate::db::models::{FileRecord, Folder, MarksSection, Question, QuestionRow, Subject, System};
use crate::db::utils::encode_years;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Merge,
    Replace,
}

impl ImportMode {
    /// Replace imports into freshly wiped tables, so a repeated id is an error
    /// there rather than an update.
    fn conflict_clause(self, assignments: &str) -> String {
        match self {
            ImportMode::Merge => format!(" ON CONFLICT(id) DO UPDATE SET {}", assignments),
            ImportMode::Replace => String::new(),
        }
    }
}

impl SqliteRepository {
    pub async fn all_subjects(&self) -> Result<Vec<Subject>, sqlx::Error> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await
    }
    pub async fn all_systems(&self) -> Result<Vec<System>, sqlx::Error> {
        sqlx::query_as::<_, System>("SELECT * FROM systems ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await
    }
    pub async fn all_marks_sections(&self) -> Result<Vec<MarksSection>, sqlx::Error> {
        sqlx::query_as::<_, MarksSection>(
            "SELECT * FROM marks_sections ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await
    }
    pub async fn all_questions(&self) -> Result<Vec<Question>, sqlx::Error> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM questions ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Question::from).collect())
    }
    pub async fn all_folders(&self) -> Result<Vec<Folder>, sqlx::Error> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await
    }
    pub async fn all_files(&self) -> Result<Vec<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM files ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await
    }

    /// Removes every catalog row, children first. Statistics are left for the
    /// caller to refresh.
    pub async fn wipe_catalog(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for table in ["files", "folders", "questions", "marks_sections", "systems", "subjects"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn import_subject(&self, subject: &Subject, mode: ImportMode) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO subjects (id, name, description, color, icon, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?){}",
            mode.conflict_clause(
                "name = excluded.name, description = excluded.description, color = excluded.color,
                 icon = excluded.icon, updated_at = excluded.updated_at"
            )
        );
        sqlx::query(&query)
            .bind(&subject.id)
            .bind(&subject.name)
            .bind(&subject.description)
            .bind(&subject.color)
            .bind(&subject.icon)
            .bind(subject.created_at)
            .bind(subject.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
    pub async fn import_system(&self, system: &System, mode: ImportMode) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO systems (id, name, description, sort_order, subject_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?){}",
            mode.conflict_clause(
                "name = excluded.name, description = excluded.description,
                 sort_order = excluded.sort_order, subject_id = excluded.subject_id,
                 updated_at = excluded.updated_at"
            )
        );
        sqlx::query(&query)
            .bind(&system.id)
            .bind(&system.name)
            .bind(&system.description)
            .bind(system.order)
            .bind(&system.subject_id)
            .bind(system.created_at)
            .bind(system.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
    pub async fn import_marks_section(
        &self,
        section: &MarksSection,
        mode: ImportMode,
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO marks_sections (id, marks, label, system_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?){}",
            mode.conflict_clause(
                "marks = excluded.marks, label = excluded.label, system_id = excluded.system_id,
                 updated_at = excluded.updated_at"
            )
        );
        sqlx::query(&query)
            .bind(&section.id)
            .bind(section.marks)
            .bind(&section.label)
            .bind(&section.system_id)
            .bind(section.created_at)
            .bind(section.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
    pub async fn import_question(
        &self,
        question: &Question,
        mode: ImportMode,
    ) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO questions (
                id, title, description, years, repeat_count, importance_score, global_importance,
                notes, is_bookmarked, subject_id, system_id, marks_section_id, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?){}",
            mode.conflict_clause(
                "title = excluded.title, description = excluded.description, years = excluded.years,
                 repeat_count = excluded.repeat_count, importance_score = excluded.importance_score,
                 global_importance = excluded.global_importance, notes = excluded.notes,
                 is_bookmarked = excluded.is_bookmarked, subject_id = excluded.subject_id,
                 system_id = excluded.system_id, marks_section_id = excluded.marks_section_id,
                 updated_at = excluded.updated_at"
            )
        );
        sqlx::query(&query)
            .bind(&question.id)
            .bind(&question.title)
            .bind(&question.description)
            .bind(encode_years(&question.years))
            .bind(question.repeat_count)
            .bind(question.importance_score)
            .bind(question.global_importance)
            .bind(&question.notes)
            .bind(question.is_bookmarked)
            .bind(&question.subject_id)
            .bind(&question.system_id)
            .bind(&question.marks_section_id)
            .bind(question.created_at)
            .bind(question.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
    pub async fn import_folder(&self, folder: &Folder, mode: ImportMode) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO folders (id, name, question_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?){}",
            mode.conflict_clause(
                "name = excluded.name, question_id = excluded.question_id, updated_at = excluded.updated_at"
            )
        );
        sqlx::query(&query)
            .bind(&folder.id)
            .bind(&folder.name)
            .bind(&folder.question_id)
            .bind(folder.created_at)
            .bind(folder.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
    pub async fn import_file(&self, file: &FileRecord, mode: ImportMode) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO files (
                id, name, file_type, url, size, description, question_id, folder_id, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?){}",
            mode.conflict_clause(
                "name = excluded.name, file_type = excluded.file_type, url = excluded.url,
                 size = excluded.size, description = excluded.description,
                 question_id = excluded.question_id, folder_id = excluded.folder_id,
                 updated_at = excluded.updated_at"
            )
        );
        sqlx::query(&query)
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
}
