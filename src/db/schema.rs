//! Database schema and migrations.
//!
//! ## Migration System
//!
//! Migrations are version-gated. Each migration:
//! 1. Checks if the current schema version is less than the target version
//! 2. Runs the migration SQL within a transaction (for atomicity)
//! 3. Records the new version in `db_version` table
//!
//! Migrations only run once - the version check ensures idempotency.

use chrono::Utc;
use rusqlite::{params, Connection, Result};

/// Current schema version
/// Increment this when adding a new migration
pub const DB_VERSION: i32 = 5;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Bootstrap: ensure db_version table exists (needed to check version)
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS db_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL,
            description TEXT
        );
        "#,
    )?;

    let current_version = get_schema_version(conn)?;
    tracing::debug!("schema version: {}", current_version);

    if current_version < 1 {
        migrate(conn, migrate_v0_to_v1)?;
    }
    if current_version < 2 {
        migrate(conn, migrate_v1_to_v2)?;
    }
    if current_version < 3 {
        migrate(conn, migrate_v2_to_v3)?;
    }
    if current_version < 4 {
        migrate(conn, migrate_v3_to_v4)?;
    }
    if current_version < 5 {
        migrate(conn, migrate_v4_to_v5)?;
    }

    Ok(())
}

/// Run one migration step inside its own transaction
fn migrate(conn: &Connection, step: fn(&Connection) -> Result<()>) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    step(&tx)?;
    tx.commit()
}

// ============================================================
// VERSION-GATED MIGRATIONS
// Each migration runs exactly once based on version check
// ============================================================

/// v0→v1: Accounts and bearer-token sessions
fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v0→v1: Create users and sessions");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            full_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_login TEXT
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
    )?;

    record_version(conn, 1, "Create base tables (users, sessions)")?;
    Ok(())
}

/// v1→v2: Study goals, study sessions and per-user gamification stats
fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v1→v2: Add study tracking tables");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS study_goals (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            goal_name TEXT NOT NULL,
            topic TEXT NOT NULL,
            study_time INTEGER,
            is_completed INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS study_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            study_goal_id TEXT,
            goal_name TEXT NOT NULL,
            topic TEXT NOT NULL,
            mode TEXT NOT NULL,
            study_time INTEGER,
            xp_earned INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (study_goal_id) REFERENCES study_goals(id) ON DELETE SET NULL
        );

        -- Counters are nullable: rows written by older clients may hold NULL
        CREATE TABLE IF NOT EXISTS user_stats (
            user_id TEXT PRIMARY KEY,
            total_xp INTEGER DEFAULT 0,
            current_level INTEGER DEFAULT 1,
            plant_stage INTEGER DEFAULT 1,
            current_streak INTEGER DEFAULT 0,
            longest_streak INTEGER DEFAULT 0,
            total_sessions INTEGER DEFAULT 0,
            total_study_time INTEGER DEFAULT 0,
            last_study_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_study_goals_user ON study_goals(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_study_sessions_user ON study_sessions(user_id, created_at);
        "#,
    )?;

    record_version(conn, 2, "Add study goals, study sessions and user stats")?;
    Ok(())
}

/// v2→v3: Flashcards and quizzes
fn migrate_v2_to_v3(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v2→v3: Add flashcards and quizzes");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS flashcards (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            study_session_id TEXT,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            topic TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS flashcard_reviews (
            id TEXT PRIMARY KEY,
            flashcard_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            learned INTEGER NOT NULL,
            reviewed_at TEXT NOT NULL,
            FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS quiz_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            study_session_id TEXT,
            topic TEXT NOT NULL,
            total_questions INTEGER NOT NULL,
            correct_answers INTEGER NOT NULL DEFAULT 0,
            score REAL,
            completed_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS quiz_questions (
            id TEXT PRIMARY KEY,
            quiz_session_id TEXT NOT NULL,
            question TEXT NOT NULL,
            correct_answer TEXT NOT NULL,
            options TEXT NOT NULL,
            question_order INTEGER NOT NULL,
            FOREIGN KEY (quiz_session_id) REFERENCES quiz_sessions(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS quiz_answers (
            id TEXT PRIMARY KEY,
            quiz_question_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            user_answer TEXT,
            is_correct INTEGER NOT NULL,
            answered_at TEXT NOT NULL,
            FOREIGN KEY (quiz_question_id) REFERENCES quiz_questions(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_flashcards_user ON flashcards(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_quiz_sessions_user ON quiz_sessions(user_id, completed_at);
        CREATE INDEX IF NOT EXISTS idx_quiz_questions_session ON quiz_questions(quiz_session_id);
        "#,
    )?;

    record_version(conn, 3, "Add flashcards and quizzes")?;
    Ok(())
}

/// v3→v4: Generated study content (concept maps, Feynman, audio, video, voice tutor)
fn migrate_v3_to_v4(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v3→v4: Add generated content tables");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS concept_maps (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            study_session_id TEXT,
            topic TEXT NOT NULL,
            mermaid_graph TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS feynman_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            study_session_id TEXT,
            topic TEXT NOT NULL,
            ai_explanation TEXT NOT NULL,
            user_explanation TEXT,
            feedback_gaps TEXT,
            feedback_simplifications TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS audio_generations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            study_session_id TEXT,
            text_content TEXT NOT NULL,
            audio_url TEXT,
            audio_data BLOB,
            duration_seconds INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS educational_videos (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            study_session_id TEXT,
            topic TEXT NOT NULL,
            duration TEXT NOT NULL,
            script TEXT NOT NULL,
            title TEXT NOT NULL,
            key_points TEXT,
            video_url TEXT NOT NULL,
            video_id TEXT NOT NULL,
            thumbnail_url TEXT,
            estimated_duration TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS voice_conversations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            study_session_id TEXT,
            topic TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_message_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (study_session_id) REFERENCES study_sessions(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS voice_conversation_messages (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            audio_url TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (conversation_id) REFERENCES voice_conversations(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_concept_maps_user ON concept_maps(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_feynman_sessions_user ON feynman_sessions(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_audio_generations_user ON audio_generations(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_educational_videos_user ON educational_videos(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_voice_conversations_user ON voice_conversations(user_id, last_message_at);
        CREATE INDEX IF NOT EXISTS idx_voice_messages_conversation ON voice_conversation_messages(conversation_id, created_at);
        "#,
    )?;

    record_version(conn, 4, "Add concept maps, Feynman, audio, video and voice tutor tables")?;
    Ok(())
}

/// v4→v5: Per-card review counters
fn migrate_v4_to_v5(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v4→v5: Add flashcard review counters");

    add_column_if_missing(conn, "flashcards", "times_reviewed", "INTEGER NOT NULL DEFAULT 0")?;
    add_column_if_missing(conn, "flashcards", "times_correct", "INTEGER NOT NULL DEFAULT 0")?;

    // Backfill from review history
    conn.execute_batch(
        r#"
        UPDATE flashcards SET
            times_reviewed = (SELECT COUNT(*) FROM flashcard_reviews r WHERE r.flashcard_id = flashcards.id),
            times_correct = (SELECT COUNT(*) FROM flashcard_reviews r WHERE r.flashcard_id = flashcards.id AND r.learned = 1);
        "#,
    )?;

    record_version(conn, 5, "Add flashcard review counters (times_reviewed, times_correct)")?;
    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        params![version, now, description],
    )?;
    tracing::info!("Recorded schema version {} - {}", version, description);
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM db_version",
        [],
        |row| row.get(0),
    )
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    conn
        .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
        .is_ok()
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    column_def: &str,
) -> Result<()> {
    if !column_exists(conn, table, column) {
        conn.execute(
            &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
            [],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), DB_VERSION);

        for table in [
            "users",
            "sessions",
            "study_goals",
            "study_sessions",
            "user_stats",
            "flashcards",
            "flashcard_reviews",
            "quiz_sessions",
            "quiz_questions",
            "quiz_answers",
            "concept_maps",
            "feynman_sessions",
            "audio_generations",
            "educational_videos",
            "voice_conversations",
            "voice_conversation_messages",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
        assert!(column_exists(&conn, "flashcards", "times_reviewed"));
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM db_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, DB_VERSION as i64);
    }

    #[test]
    fn test_add_column_if_missing_twice() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER);").unwrap();
        add_column_if_missing(&conn, "t", "b", "TEXT").unwrap();
        add_column_if_missing(&conn, "t", "b", "TEXT").unwrap();
        assert!(column_exists(&conn, "t", "b"));
    }
}
