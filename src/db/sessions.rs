//! Study sessions (one row per completed study activity)

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::stats::{apply_activity, UserStats};
use super::{new_id, now_timestamp, timestamp_column};

#[derive(Debug, Clone, Serialize)]
pub struct StudySession {
    pub id: String,
    pub user_id: String,
    pub study_goal_id: Option<String>,
    pub goal_name: String,
    pub topic: String,
    pub mode: String,
    pub study_time: Option<i64>,
    pub xp_earned: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudySession<'a> {
    pub study_goal_id: Option<&'a str>,
    pub goal_name: &'a str,
    pub topic: &'a str,
    pub mode: &'a str,
    pub study_time: Option<i64>,
    pub xp_earned: i64,
}

const SELECT_SESSION: &str = r#"
    SELECT id, user_id, study_goal_id, goal_name, topic, mode, study_time, xp_earned, created_at
    FROM study_sessions
"#;

fn row_to_session(row: &rusqlite::Row) -> Result<StudySession> {
    Ok(StudySession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        study_goal_id: row.get(2)?,
        goal_name: row.get(3)?,
        topic: row.get(4)?,
        mode: row.get(5)?,
        study_time: row.get(6)?,
        xp_earned: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

/// Insert a session and fold its XP and minutes into the user's stats, as
/// one transaction.
pub fn record_session(
    conn: &Connection,
    user_id: &str,
    session: &NewStudySession,
    today: NaiveDate,
) -> Result<(StudySession, UserStats)> {
    let tx = conn.unchecked_transaction()?;

    let id = new_id();
    tx.execute(
        r#"
        INSERT INTO study_sessions (id, user_id, study_goal_id, goal_name, topic, mode, study_time, xp_earned, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            id,
            user_id,
            session.study_goal_id,
            session.goal_name,
            session.topic,
            session.mode,
            session.study_time,
            session.xp_earned,
            now_timestamp()
        ],
    )?;

    let stats = apply_activity(
        &tx,
        user_id,
        session.xp_earned,
        session.study_time.unwrap_or(0),
        today,
    )?;
    let created = get_session(&tx, user_id, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;

    tx.commit()?;
    Ok((created, stats))
}

/// Get a session owned by `user_id`
pub fn get_session(conn: &Connection, user_id: &str, session_id: &str) -> Result<Option<StudySession>> {
    conn.query_row(
        &format!("{} WHERE id = ?1 AND user_id = ?2", SELECT_SESSION),
        params![session_id, user_id],
        row_to_session,
    )
    .optional()
}

/// Whether `session_id` exists and belongs to `user_id`
pub fn session_belongs_to(conn: &Connection, user_id: &str, session_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM study_sessions WHERE id = ?1 AND user_id = ?2",
        params![session_id, user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// List a user's sessions, newest first
pub fn list_sessions(
    conn: &Connection,
    user_id: &str,
    mode: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<StudySession>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 AND (?2 IS NULL OR mode = ?2)
         ORDER BY created_at DESC, rowid DESC LIMIT ?3 OFFSET ?4",
        SELECT_SESSION
    ))?;
    let sessions = stmt
        .query_map(params![user_id, mode, limit, skip], row_to_session)?
        .collect::<Result<Vec<_>>>()?;
    Ok(sessions)
}

/// Delete a session. Stats already earned are kept.
pub fn delete_session(conn: &Connection, user_id: &str, session_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM study_sessions WHERE id = ?1 AND user_id = ?2",
        params![session_id, user_id],
    )?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::goals::create_goal;
    use crate::db::stats::get_user_stats;
    use crate::testing::TestEnv;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn pomodoro<'a>(goal_id: Option<&'a str>) -> NewStudySession<'a> {
        NewStudySession {
            study_goal_id: goal_id,
            goal_name: "Álgebra",
            topic: "Ecuaciones lineales con dos incógnitas y sus gráficas",
            mode: "pomodoro",
            study_time: Some(25),
            xp_earned: 20,
        }
    }

    #[test]
    fn test_record_session_updates_stats() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("session.stats@gmail.com").unwrap();

        let (session, stats) = record_session(&env.conn, &user, &pomodoro(None), today()).unwrap();
        assert_eq!(session.xp_earned, 20);
        assert_eq!(session.mode, "pomodoro");
        assert_eq!(stats.total_xp, 20);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_study_time, 25);
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn test_failed_insert_leaves_stats_untouched() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("session.atomic@gmail.com").unwrap();

        // Unknown goal id violates the foreign key
        let result = record_session(&env.conn, &user, &pomodoro(Some("missing-goal")), today());
        assert!(result.is_err());
        assert!(get_user_stats(&env.conn, &user).unwrap().is_none());
        assert!(list_sessions(&env.conn, &user, None, 0, 100).unwrap().is_empty());
    }

    #[test]
    fn test_deleting_goal_keeps_session() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("session.goal@gmail.com").unwrap();
        let goal = create_goal(
            &env.conn,
            &user,
            "Álgebra",
            "Ecuaciones lineales con dos incógnitas y sus gráficas",
            None,
        )
        .unwrap();

        let (session, _) = record_session(&env.conn, &user, &pomodoro(Some(&goal.id)), today()).unwrap();
        assert_eq!(session.study_goal_id.as_deref(), Some(goal.id.as_str()));

        crate::db::goals::delete_goal(&env.conn, &user, &goal.id).unwrap();
        let session = get_session(&env.conn, &user, &session.id).unwrap().unwrap();
        assert!(session.study_goal_id.is_none());
    }

    #[test]
    fn test_list_by_mode_and_delete() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("session.modes@gmail.com").unwrap();

        record_session(&env.conn, &user, &pomodoro(None), today()).unwrap();
        let text = NewStudySession { mode: "text", xp_earned: 5, ..pomodoro(None) };
        let (text_session, _) = record_session(&env.conn, &user, &text, today()).unwrap();

        assert_eq!(list_sessions(&env.conn, &user, None, 0, 100).unwrap().len(), 2);
        let only_text = list_sessions(&env.conn, &user, Some("text"), 0, 100).unwrap();
        assert_eq!(only_text.len(), 1);
        assert_eq!(only_text[0].id, text_session.id);

        assert!(session_belongs_to(&env.conn, &user, &text_session.id).unwrap());
        assert!(delete_session(&env.conn, &user, &text_session.id).unwrap());
        assert!(!session_belongs_to(&env.conn, &user, &text_session.id).unwrap());

        // XP stays after deletion
        let stats = get_user_stats(&env.conn, &user).unwrap().unwrap();
        assert_eq!(stats.total_xp, 25);
    }
}
