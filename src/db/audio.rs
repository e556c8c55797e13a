//! Saved text-to-speech generations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{new_id, now_timestamp, timestamp_column};

/// Audio history entry. The stored audio bytes are not loaded.
#[derive(Debug, Clone, Serialize)]
pub struct AudioGeneration {
    pub id: String,
    pub user_id: String,
    pub study_session_id: Option<String>,
    pub text_content: String,
    pub audio_url: Option<String>,
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
}

const SELECT_AUDIO: &str = r#"
    SELECT id, user_id, study_session_id, text_content, audio_url, duration_seconds, created_at
    FROM audio_generations
"#;

fn row_to_audio(row: &rusqlite::Row) -> Result<AudioGeneration> {
    Ok(AudioGeneration {
        id: row.get(0)?,
        user_id: row.get(1)?,
        study_session_id: row.get(2)?,
        text_content: row.get(3)?,
        audio_url: row.get(4)?,
        duration_seconds: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}

pub fn save_audio_generation(
    conn: &Connection,
    user_id: &str,
    text_content: &str,
    audio_data: Option<&[u8]>,
    duration_seconds: Option<i64>,
    study_session_id: Option<&str>,
) -> Result<AudioGeneration> {
    let id = new_id();
    conn.execute(
        r#"
        INSERT INTO audio_generations (id, user_id, study_session_id, text_content, audio_data, duration_seconds, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![id, user_id, study_session_id, text_content, audio_data, duration_seconds, now_timestamp()],
    )?;
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_AUDIO), params![id], row_to_audio)
        .optional()?
        .ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn list_audio_generations(conn: &Connection, user_id: &str, skip: i64, limit: i64) -> Result<Vec<AudioGeneration>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        SELECT_AUDIO
    ))?;
    let audios = stmt
        .query_map(params![user_id, limit, skip], row_to_audio)?
        .collect::<Result<Vec<_>>>()?;
    Ok(audios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    #[test]
    fn test_audio_bytes_are_stored() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("audio.user@gmail.com").unwrap();

        let saved =
            save_audio_generation(&env.conn, &user, "Hola mundo", Some(&[1, 2, 3, 4]), Some(2), None).unwrap();
        assert_eq!(saved.duration_seconds, Some(2));

        let bytes: Vec<u8> = env
            .conn
            .query_row("SELECT audio_data FROM audio_generations WHERE id = ?1", params![saved.id], |r| r.get(0))
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_history_newest_first() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("audio.history@gmail.com").unwrap();
        save_audio_generation(&env.conn, &user, "primero", None, None, None).unwrap();
        let second = save_audio_generation(&env.conn, &user, "segundo", None, None, None).unwrap();

        let history = list_audio_generations(&env.conn, &user, 0, 1).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, second.id);
    }
}
