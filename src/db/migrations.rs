use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "question_bank.db";
const SCHEMA_VERSION: i64 = 1;

async fn table_exists(pool: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

async fn ensure_schema_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await?;
    let existing: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
        .fetch_optional(pool)
        .await?;
    if let Some((version,)) = existing {
        return Ok(version);
    }
    let initial = if table_exists(pool, "questions").await? { 1 } else { 0 };
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(initial)
        .execute(pool)
        .await?;
    Ok(initial)
}

async fn set_schema_version(pool: &SqlitePool, version: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_schema_v1(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS subjects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            color TEXT NOT NULL DEFAULT '#3b82f6',
            icon TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS systems (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            subject_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(subject_id, name),
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS marks_sections (
            id TEXT PRIMARY KEY,
            marks INTEGER NOT NULL,
            label TEXT NOT NULL,
            system_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(system_id, marks),
            FOREIGN KEY(system_id) REFERENCES systems(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            years TEXT NOT NULL DEFAULT '[]',
            repeat_count INTEGER NOT NULL DEFAULT 0,
            importance_score REAL NOT NULL DEFAULT 0,
            global_importance REAL NOT NULL DEFAULT 0.5,
            notes TEXT,
            is_bookmarked INTEGER NOT NULL DEFAULT 0,
            subject_id TEXT NOT NULL,
            system_id TEXT NOT NULL,
            marks_section_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
            FOREIGN KEY(system_id) REFERENCES systems(id) ON DELETE CASCADE,
            FOREIGN KEY(marks_section_id) REFERENCES marks_sections(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS folders (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            question_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(question_id, name),
            FOREIGN KEY(question_id) REFERENCES questions(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            file_type TEXT NOT NULL DEFAULT 'other',
            url TEXT NOT NULL,
            size INTEGER NOT NULL DEFAULT 0,
            description TEXT,
            question_id TEXT NOT NULL,
            folder_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY(question_id) REFERENCES questions(id) ON DELETE CASCADE,
            FOREIGN KEY(folder_id) REFERENCES folders(id) ON DELETE SET NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS statistics (
            id TEXT PRIMARY KEY CHECK (id = 'global'),
            total_subjects INTEGER NOT NULL DEFAULT 0,
            total_systems INTEGER NOT NULL DEFAULT 0,
            total_questions INTEGER NOT NULL DEFAULT 0,
            total_files INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_systems_subject_id ON systems(subject_id)",
        "CREATE INDEX IF NOT EXISTS idx_marks_sections_system_id ON marks_sections(system_id)",
        "CREATE INDEX IF NOT EXISTS idx_questions_subject_id ON questions(subject_id)",
        "CREATE INDEX IF NOT EXISTS idx_questions_system_id ON questions(system_id)",
        "CREATE INDEX IF NOT EXISTS idx_questions_marks_section_id ON questions(marks_section_id)",
        "CREATE INDEX IF NOT EXISTS idx_questions_importance ON questions(importance_score DESC, repeat_count DESC)",
        "CREATE INDEX IF NOT EXISTS idx_folders_question_id ON folders(question_id)",
        "CREATE INDEX IF NOT EXISTS idx_files_question_id ON files(question_id)",
        "CREATE INDEX IF NOT EXISTS idx_files_folder_id ON files(folder_id)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

pub async fn init_db(data_dir: &Path) -> Result<SqlitePool, sqlx::Error> {
    if !data_dir.exists() {
        fs::create_dir_all(data_dir)?;
    }
    let db_path = data_dir.join(DB_FILE_NAME);
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    let version = ensure_schema_version(&pool).await?;
    if version < SCHEMA_VERSION {
        create_schema_v1(&pool).await?;
        set_schema_version(&pool, SCHEMA_VERSION).await?;
        tracing::info!(from = version, to = SCHEMA_VERSION, "database schema migrated");
    }
    tracing::info!(path = %db_path.display(), "database ready");
    Ok(pool)
}
