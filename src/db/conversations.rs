//! Voice tutor conversations and their messages

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{new_id, now_timestamp, timestamp_column};

#[derive(Debug, Clone, Serialize)]
pub struct VoiceConversation {
    pub id: String,
    pub user_id: String,
    pub study_session_id: Option<String>,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

const SELECT_CONVERSATION: &str = r#"
    SELECT id, user_id, study_session_id, topic, created_at, last_message_at
    FROM voice_conversations
"#;

const SELECT_MESSAGE: &str = r#"
    SELECT id, conversation_id, role, content, audio_url, created_at
    FROM voice_conversation_messages
"#;

fn row_to_conversation(row: &rusqlite::Row) -> Result<VoiceConversation> {
    Ok(VoiceConversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        study_session_id: row.get(2)?,
        topic: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
        last_message_at: timestamp_column(row, 5)?,
    })
}

fn row_to_message(row: &rusqlite::Row) -> Result<VoiceMessage> {
    Ok(VoiceMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        audio_url: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

pub fn create_conversation(
    conn: &Connection,
    user_id: &str,
    topic: &str,
    study_session_id: Option<&str>,
) -> Result<VoiceConversation> {
    let id = new_id();
    let now = now_timestamp();
    conn.execute(
        r#"
        INSERT INTO voice_conversations (id, user_id, study_session_id, topic, created_at, last_message_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        "#,
        params![id, user_id, study_session_id, topic, now],
    )?;
    get_conversation(conn, user_id, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_conversation(conn: &Connection, user_id: &str, conversation_id: &str) -> Result<Option<VoiceConversation>> {
    conn.query_row(
        &format!("{} WHERE id = ?1 AND user_id = ?2", SELECT_CONVERSATION),
        params![conversation_id, user_id],
        row_to_conversation,
    )
    .optional()
}

/// List conversations, most recently active first
pub fn list_conversations(conn: &Connection, user_id: &str, skip: i64, limit: i64) -> Result<Vec<VoiceConversation>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 ORDER BY last_message_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        SELECT_CONVERSATION
    ))?;
    let conversations = stmt
        .query_map(params![user_id, limit, skip], row_to_conversation)?
        .collect::<Result<Vec<_>>>()?;
    Ok(conversations)
}

/// Append a message and bump the conversation's `last_message_at`.
/// Returns None if the conversation does not belong to `user_id`.
pub fn add_message(
    conn: &Connection,
    user_id: &str,
    conversation_id: &str,
    role: &str,
    content: &str,
    audio_url: Option<&str>,
) -> Result<Option<VoiceMessage>> {
    let tx = conn.unchecked_transaction()?;

    let now = now_timestamp();
    let touched = tx.execute(
        "UPDATE voice_conversations SET last_message_at = ?1 WHERE id = ?2 AND user_id = ?3",
        params![now, conversation_id, user_id],
    )?;
    if touched == 0 {
        return Ok(None);
    }

    let id = new_id();
    tx.execute(
        r#"
        INSERT INTO voice_conversation_messages (id, conversation_id, role, content, audio_url, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![id, conversation_id, role, content, audio_url, now],
    )?;
    let message = tx.query_row(&format!("{} WHERE id = ?1", SELECT_MESSAGE), params![id], row_to_message)?;

    tx.commit()?;
    Ok(Some(message))
}

/// Messages of a conversation in the order they were sent.
/// Returns None if the conversation does not belong to `user_id`.
pub fn list_messages(conn: &Connection, user_id: &str, conversation_id: &str) -> Result<Option<Vec<VoiceMessage>>> {
    if get_conversation(conn, user_id, conversation_id)?.is_none() {
        return Ok(None);
    }
    let mut stmt = conn.prepare(&format!(
        "{} WHERE conversation_id = ?1 ORDER BY created_at, rowid",
        SELECT_MESSAGE
    ))?;
    let messages = stmt
        .query_map(params![conversation_id], row_to_message)?
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(messages))
}
