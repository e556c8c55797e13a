//! Flashcards and their review history

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{new_id, now_timestamp, timestamp_column};

#[derive(Debug, Clone, Serialize)]
pub struct Flashcard {
    pub id: String,
    pub user_id: String,
    pub study_session_id: Option<String>,
    pub question: String,
    pub answer: String,
    pub topic: Option<String>,
    pub times_reviewed: i64,
    pub times_correct: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlashcardReview {
    pub id: String,
    pub flashcard_id: String,
    pub user_id: String,
    pub learned: bool,
    pub reviewed_at: DateTime<Utc>,
}

const SELECT_FLASHCARD: &str = r#"
    SELECT id, user_id, study_session_id, question, answer, topic,
           times_reviewed, times_correct, created_at
    FROM flashcards
"#;

fn row_to_flashcard(row: &rusqlite::Row) -> Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        user_id: row.get(1)?,
        study_session_id: row.get(2)?,
        question: row.get(3)?,
        answer: row.get(4)?,
        topic: row.get(5)?,
        times_reviewed: row.get(6)?,
        times_correct: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

pub fn create_flashcard(
    conn: &Connection,
    user_id: &str,
    question: &str,
    answer: &str,
    topic: Option<&str>,
    study_session_id: Option<&str>,
) -> Result<Flashcard> {
    let id = new_id();
    conn.execute(
        r#"
        INSERT INTO flashcards (id, user_id, study_session_id, question, answer, topic, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![id, user_id, study_session_id, question, answer, topic, now_timestamp()],
    )?;
    get_flashcard(conn, user_id, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Save a generated deck in one transaction
pub fn create_flashcards(
    conn: &Connection,
    user_id: &str,
    topic: &str,
    cards: &[(String, String)],
    study_session_id: Option<&str>,
) -> Result<Vec<Flashcard>> {
    let tx = conn.unchecked_transaction()?;
    let saved = cards
        .iter()
        .map(|(question, answer)| {
            create_flashcard(&tx, user_id, question, answer, Some(topic), study_session_id)
        })
        .collect::<Result<Vec<_>>>()?;
    tx.commit()?;
    Ok(saved)
}

pub fn get_flashcard(conn: &Connection, user_id: &str, flashcard_id: &str) -> Result<Option<Flashcard>> {
    conn.query_row(
        &format!("{} WHERE id = ?1 AND user_id = ?2", SELECT_FLASHCARD),
        params![flashcard_id, user_id],
        row_to_flashcard,
    )
    .optional()
}

/// List a user's flashcards, newest first. `topic` matches case-insensitively
/// anywhere in the card's topic.
pub fn list_flashcards(
    conn: &Connection,
    user_id: &str,
    topic: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Flashcard>> {
    let pattern = topic.map(|t| format!("%{}%", escape_like(t)));
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 AND (?2 IS NULL OR topic LIKE ?2 ESCAPE '\\')
         ORDER BY created_at DESC, rowid DESC LIMIT ?3 OFFSET ?4",
        SELECT_FLASHCARD
    ))?;
    let cards = stmt
        .query_map(params![user_id, pattern, limit, skip], row_to_flashcard)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Record a review and bump the card's counters.
/// Returns None if the card does not belong to `user_id`.
pub fn review_flashcard(
    conn: &Connection,
    user_id: &str,
    flashcard_id: &str,
    learned: bool,
) -> Result<Option<FlashcardReview>> {
    let tx = conn.unchecked_transaction()?;

    let updated = tx.execute(
        r#"
        UPDATE flashcards
        SET times_reviewed = times_reviewed + 1,
            times_correct = times_correct + ?1
        WHERE id = ?2 AND user_id = ?3
        "#,
        params![learned as i64, flashcard_id, user_id],
    )?;
    if updated == 0 {
        return Ok(None);
    }

    let id = new_id();
    let now = now_timestamp();
    tx.execute(
        "INSERT INTO flashcard_reviews (id, flashcard_id, user_id, learned, reviewed_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, flashcard_id, user_id, learned, now],
    )?;
    let review = tx.query_row(
        "SELECT id, flashcard_id, user_id, learned, reviewed_at FROM flashcard_reviews WHERE id = ?1",
        params![id],
        |row| {
            Ok(FlashcardReview {
                id: row.get(0)?,
                flashcard_id: row.get(1)?,
                user_id: row.get(2)?,
                learned: row.get(3)?,
                reviewed_at: timestamp_column(row, 4)?,
            })
        },
    )?;

    tx.commit()?;
    Ok(Some(review))
}

pub fn delete_flashcard(conn: &Connection, user_id: &str, flashcard_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM flashcards WHERE id = ?1 AND user_id = ?2",
        params![flashcard_id, user_id],
    )?;
    Ok(deleted > 0)
}
