use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::SqliteRepository;
use crate::db::models::{
    MarksSectionRef, NamedRef, Question, QuestionListItem, QuestionRow, SubjectRef,
};
use crate::db::utils::encode_years;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionSort {
    #[default]
    ImportanceScore,
    RepeatCount,
    CreatedAt,
    Title,
}

impl QuestionSort {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "importanceScore" => Some(QuestionSort::ImportanceScore),
            "repeatCount" => Some(QuestionSort::RepeatCount),
            "createdAt" => Some(QuestionSort::CreatedAt),
            "title" => Some(QuestionSort::Title),
            _ => None,
        }
    }
    fn column(self) -> &'static str {
        match self {
            QuestionSort::ImportanceScore => "q.importance_score",
            QuestionSort::RepeatCount => "q.repeat_count",
            QuestionSort::CreatedAt => "q.created_at",
            QuestionSort::Title => "q.title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOrder {
    Listing { sort: QuestionSort, ascending: bool },
    /// Importance, then repeat count, then newest.
    Featured,
}

impl Default for QuestionOrder {
    fn default() -> Self {
        QuestionOrder::Listing {
            sort: QuestionSort::ImportanceScore,
            ascending: false,
        }
    }
}

impl QuestionOrder {
    fn sql(self) -> String {
        match self {
            QuestionOrder::Listing { sort, ascending } => format!(
                "{} {}, q.created_at DESC, q.rowid DESC",
                sort.column(),
                if ascending { "ASC" } else { "DESC" }
            ),
            QuestionOrder::Featured => {
                "q.importance_score DESC, q.repeat_count DESC, q.created_at DESC, q.rowid DESC"
                    .to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub subject_id: Option<String>,
    pub system_id: Option<String>,
    pub marks_section_id: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub order: QuestionOrder,
}

#[derive(Debug, FromRow)]
struct QuestionListRow {
    #[sqlx(flatten)]
    question: QuestionRow,
    subject_name: String,
    subject_color: String,
    system_name: String,
    marks: i64,
    marks_label: String,
    file_count: i64,
}

impl From<QuestionListRow> for QuestionListItem {
    fn from(row: QuestionListRow) -> Self {
        let question = Question::from(row.question);
        QuestionListItem {
            subject: SubjectRef {
                id: question.subject_id.clone(),
                name: row.subject_name,
                color: row.subject_color,
            },
            system: NamedRef {
                id: question.system_id.clone(),
                name: row.system_name,
            },
            marks_section: MarksSectionRef {
                id: question.marks_section_id.clone(),
                marks: row.marks,
                label: row.marks_label,
            },
            file_count: row.file_count,
            question,
        }
    }
}

const LIST_SELECT: &str = "SELECT q.*,
        s.name AS subject_name,
        s.color AS subject_color,
        sy.name AS system_name,
        ms.marks AS marks,
        ms.label AS marks_label,
        (SELECT COUNT(*) FROM files WHERE question_id = q.id) AS file_count
     FROM questions q
     JOIN subjects s ON s.id = q.subject_id
     JOIN systems sy ON sy.id = q.system_id
     JOIN marks_sections ms ON ms.id = q.marks_section_id
     WHERE 1 = 1";

/// Makes `%`, `_` and `\` match literally under `ESCAPE '\'`.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

impl SqliteRepository {
    pub async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<QuestionListItem>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(LIST_SELECT);
        if let Some(id) = &filter.subject_id {
            qb.push(" AND q.subject_id = ").push_bind(id.clone());
        }
        if let Some(id) = &filter.system_id {
            qb.push(" AND q.system_id = ").push_bind(id.clone());
        }
        if let Some(id) = &filter.marks_section_id {
            qb.push(" AND q.marks_section_id = ").push_bind(id.clone());
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (q.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR q.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        qb.push(" ORDER BY ").push(filter.order.sql());
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit.max(0));
        }
        let rows = qb
            .build_query_as::<QuestionListRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(QuestionListItem::from).collect())
    }
    pub async fn get_question(&self, id: &str) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuestionRow>("SELECT * FROM questions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Question::from))
    }
    pub async fn get_question_item(
        &self,
        id: &str,
    ) -> Result<Option<QuestionListItem>, sqlx::Error> {
        let query = format!("{} AND q.id = ?", LIST_SELECT);
        let row = sqlx::query_as::<_, QuestionListRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(QuestionListItem::from))
    }
    pub async fn find_question_by_title(
        &self,
        marks_section_id: &str,
        title: &str,
    ) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM questions WHERE marks_section_id = ? AND title = ? LIMIT 1",
        )
        .bind(marks_section_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Question::from))
    }
    pub async fn questions_for_marks_section(
        &self,
        marks_section_id: &str,
    ) -> Result<Vec<Question>, sqlx::Error> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM questions
             WHERE marks_section_id = ?
             ORDER BY importance_score DESC, repeat_count DESC, created_at DESC",
        )
        .bind(marks_section_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Question::from).collect())
    }
    pub async fn insert_question(&self, question: &Question) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO questions (
                id, title, description, years, repeat_count, importance_score, global_importance,
                notes, is_bookmarked, subject_id, system_id, marks_section_id, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
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
    pub async fn update_question(&self, question: &Question) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE questions
             SET title = ?, description = ?, years = ?, repeat_count = ?, importance_score = ?,
                 global_importance = ?, notes = ?, is_bookmarked = ?, subject_id = ?,
                 system_id = ?, marks_section_id = ?, updated_at = ?
             WHERE id = ?",
        )
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
        .bind(question.updated_at)
        .bind(&question.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
    pub async fn delete_question(&self, id: &str) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let urls: Vec<(String,)> = sqlx::query_as("SELECT url FROM files WHERE question_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM questions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(urls.into_iter().map(|(url,)| url).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse_whitelist() {
        assert_eq!(QuestionSort::parse("title"), Some(QuestionSort::Title));
        assert_eq!(QuestionSort::parse("repeatCount"), Some(QuestionSort::RepeatCount));
        assert_eq!(QuestionSort::parse("id; DROP TABLE questions"), None);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_order_sql() {
        let order = QuestionOrder::Listing {
            sort: QuestionSort::Title,
            ascending: true,
        };
        assert_eq!(order.sql(), "q.title ASC, q.created_at DESC, q.rowid DESC");
        assert!(QuestionOrder::default().sql().starts_with("q.importance_score DESC"));
        assert!(QuestionOrder::Featured.sql().contains("q.repeat_count DESC"));
    }
}
