//! Saved Feynman-technique sessions

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{new_id, now_timestamp, timestamp_column};

#[derive(Debug, Clone, Serialize)]
pub struct FeynmanSession {
    pub id: String,
    pub user_id: String,
    pub study_session_id: Option<String>,
    pub topic: String,
    pub ai_explanation: String,
    pub user_explanation: Option<String>,
    pub feedback_gaps: Option<String>,
    pub feedback_simplifications: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewFeynmanSession<'a> {
    pub study_session_id: Option<&'a str>,
    pub topic: &'a str,
    pub ai_explanation: &'a str,
    pub user_explanation: Option<&'a str>,
    pub feedback_gaps: Option<&'a str>,
    pub feedback_simplifications: Option<&'a str>,
}

const SELECT_FEYNMAN: &str = r#"
    SELECT id, user_id, study_session_id, topic, ai_explanation, user_explanation,
           feedback_gaps, feedback_simplifications, created_at
    FROM feynman_sessions
"#;

fn row_to_feynman(row: &rusqlite::Row) -> Result<FeynmanSession> {
    Ok(FeynmanSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        study_session_id: row.get(2)?,
        topic: row.get(3)?,
        ai_explanation: row.get(4)?,
        user_explanation: row.get(5)?,
        feedback_gaps: row.get(6)?,
        feedback_simplifications: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

pub fn save_feynman_session(conn: &Connection, user_id: &str, session: &NewFeynmanSession) -> Result<FeynmanSession> {
    let id = new_id();
    conn.execute(
        r#"
        INSERT INTO feynman_sessions (id, user_id, study_session_id, topic, ai_explanation,
                                      user_explanation, feedback_gaps, feedback_simplifications, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            id,
            user_id,
            session.study_session_id,
            session.topic,
            session.ai_explanation,
            session.user_explanation,
            session.feedback_gaps,
            session.feedback_simplifications,
            now_timestamp()
        ],
    )?;
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_FEYNMAN), params![id], row_to_feynman)
        .optional()?
        .ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn list_feynman_sessions(conn: &Connection, user_id: &str, skip: i64, limit: i64) -> Result<Vec<FeynmanSession>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        SELECT_FEYNMAN
    ))?;
    let sessions = stmt
        .query_map(params![user_id, limit, skip], row_to_feynman)?
        .collect::<Result<Vec<_>>>()?;
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    #[test]
    fn test_save_and_list() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("feynman.user@gmail.com").unwrap();

        let saved = save_feynman_session(
            &env.conn,
            &user,
            &NewFeynmanSession {
                topic: "Gravedad",
                ai_explanation: "La gravedad atrae los objetos entre sí.",
                user_explanation: Some("Las cosas se caen."),
                feedback_gaps: Some("Falta hablar de la masa."),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(saved.topic, "Gravedad");
        assert!(saved.feedback_simplifications.is_none());

        let listed = list_feynman_sessions(&env.conn, &user, 0, 100).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_explanation.as_deref(), Some("Las cosas se caen."));
    }
}
