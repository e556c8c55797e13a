//! Study goals

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{new_id, now_timestamp, optional_timestamp_column, timestamp_column};

#[derive(Debug, Clone, Serialize)]
pub struct StudyGoal {
    pub id: String,
    pub user_id: String,
    pub goal_name: String,
    pub topic: String,
    pub study_time: Option<i64>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Default, Clone)]
pub struct GoalChanges {
    pub goal_name: Option<String>,
    pub topic: Option<String>,
    pub study_time: Option<i64>,
    pub is_completed: Option<bool>,
}

const SELECT_GOAL: &str = r#"
    SELECT id, user_id, goal_name, topic, study_time, is_completed,
           completed_at, created_at, updated_at
    FROM study_goals
"#;

fn row_to_goal(row: &rusqlite::Row) -> Result<StudyGoal> {
    Ok(StudyGoal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        goal_name: row.get(2)?,
        topic: row.get(3)?,
        study_time: row.get(4)?,
        is_completed: row.get(5)?,
        completed_at: optional_timestamp_column(row, 6)?,
        created_at: timestamp_column(row, 7)?,
        updated_at: timestamp_column(row, 8)?,
    })
}

pub fn create_goal(
    conn: &Connection,
    user_id: &str,
    goal_name: &str,
    topic: &str,
    study_time: Option<i64>,
) -> Result<StudyGoal> {
    let id = new_id();
    let now = now_timestamp();
    conn.execute(
        r#"
        INSERT INTO study_goals (id, user_id, goal_name, topic, study_time, is_completed, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
        "#,
        params![id, user_id, goal_name, topic, study_time, now],
    )?;
    get_goal(conn, user_id, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Get a goal owned by `user_id`
pub fn get_goal(conn: &Connection, user_id: &str, goal_id: &str) -> Result<Option<StudyGoal>> {
    conn.query_row(
        &format!("{} WHERE id = ?1 AND user_id = ?2", SELECT_GOAL),
        params![goal_id, user_id],
        row_to_goal,
    )
    .optional()
}

/// List a user's goals, newest first
pub fn list_goals(
    conn: &Connection,
    user_id: &str,
    completed: Option<bool>,
    skip: i64,
    limit: i64,
) -> Result<Vec<StudyGoal>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 AND (?2 IS NULL OR is_completed = ?2)
         ORDER BY created_at DESC, rowid DESC LIMIT ?3 OFFSET ?4",
        SELECT_GOAL
    ))?;
    let goals = stmt
        .query_map(params![user_id, completed, limit, skip], row_to_goal)?
        .collect::<Result<Vec<_>>>()?;
    Ok(goals)
}

/// Apply changes to a goal. Marking a goal completed stamps `completed_at`
/// the first time; reopening it clears the stamp.
pub fn update_goal(
    conn: &Connection,
    user_id: &str,
    goal_id: &str,
    changes: &GoalChanges,
) -> Result<Option<StudyGoal>> {
    let now = now_timestamp();
    let updated = conn.execute(
        r#"
        UPDATE study_goals
        SET goal_name = COALESCE(?1, goal_name),
            topic = COALESCE(?2, topic),
            study_time = COALESCE(?3, study_time),
            completed_at = CASE
                WHEN ?4 = 1 AND is_completed = 0 THEN ?5
                WHEN ?4 = 0 THEN NULL
                ELSE completed_at
            END,
            is_completed = COALESCE(?4, is_completed),
            updated_at = ?5
        WHERE id = ?6 AND user_id = ?7
        "#,
        params![
            changes.goal_name,
            changes.topic,
            changes.study_time,
            changes.is_completed,
            now,
            goal_id,
            user_id
        ],
    )?;
    if updated == 0 {
        return Ok(None);
    }
    get_goal(conn, user_id, goal_id)
}

/// Delete a goal, returns whether it existed
pub fn delete_goal(conn: &Connection, user_id: &str, goal_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM study_goals WHERE id = ?1 AND user_id = ?2",
        params![goal_id, user_id],
    )?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    const TOPIC: &str = "Fundamentos de la programación funcional en Rust";

    #[test]
    fn test_create_and_get() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("goal.owner@gmail.com").unwrap();

        let goal = create_goal(&env.conn, &user, "Rust", TOPIC, Some(30)).unwrap();
        assert!(!goal.is_completed);
        assert!(goal.completed_at.is_none());

        let found = get_goal(&env.conn, &user, &goal.id).unwrap().unwrap();
        assert_eq!(found.topic, TOPIC);
        assert_eq!(found.study_time, Some(30));
    }

    #[test]
    fn test_goals_are_private() {
        let env = TestEnv::new().unwrap();
        let owner = env.create_user("goal.owner@gmail.com").unwrap();
        let other = env.create_user("goal.other@gmail.com").unwrap();

        let goal = create_goal(&env.conn, &owner, "Rust", TOPIC, None).unwrap();
        assert!(get_goal(&env.conn, &other, &goal.id).unwrap().is_none());
        assert!(!delete_goal(&env.conn, &other, &goal.id).unwrap());
        assert!(list_goals(&env.conn, &other, None, 0, 100).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters_and_pages() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("goal.pager@gmail.com").unwrap();

        let first = create_goal(&env.conn, &user, "Uno", TOPIC, None).unwrap();
        let second = create_goal(&env.conn, &user, "Dos", TOPIC, None).unwrap();
        let third = create_goal(&env.conn, &user, "Tres", TOPIC, None).unwrap();
        update_goal(
            &env.conn,
            &user,
            &second.id,
            &GoalChanges { is_completed: Some(true), ..Default::default() },
        )
        .unwrap();

        let all = list_goals(&env.conn, &user, None, 0, 100).unwrap();
        let ids: Vec<_> = all.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);

        let done = list_goals(&env.conn, &user, Some(true), 0, 100).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, second.id);

        let open = list_goals(&env.conn, &user, Some(false), 0, 100).unwrap();
        assert_eq!(open.len(), 2);

        let page = list_goals(&env.conn, &user, None, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, second.id);
    }

    #[test]
    fn test_completion_stamp() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("goal.done@gmail.com").unwrap();
        let goal = create_goal(&env.conn, &user, "Rust", TOPIC, None).unwrap();

        let complete = GoalChanges { is_completed: Some(true), ..Default::default() };
        let done = update_goal(&env.conn, &user, &goal.id, &complete).unwrap().unwrap();
        assert!(done.is_completed);
        let stamp = done.completed_at.unwrap();

        // Completing again keeps the original stamp
        let again = update_goal(&env.conn, &user, &goal.id, &complete).unwrap().unwrap();
        assert_eq!(again.completed_at, Some(stamp));

        let reopen = GoalChanges { is_completed: Some(false), ..Default::default() };
        let open = update_goal(&env.conn, &user, &goal.id, &reopen).unwrap().unwrap();
        assert!(!open.is_completed);
        assert!(open.completed_at.is_none());
    }

    #[test]
    fn test_partial_update_and_delete() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("goal.edit@gmail.com").unwrap();
        let goal = create_goal(&env.conn, &user, "Rust", TOPIC, Some(25)).unwrap();

        let changes = GoalChanges { goal_name: Some("Rust avanzado".into()), ..Default::default() };
        let updated = update_goal(&env.conn, &user, &goal.id, &changes).unwrap().unwrap();
        assert_eq!(updated.goal_name, "Rust avanzado");
        assert_eq!(updated.topic, TOPIC);
        assert_eq!(updated.study_time, Some(25));

        assert!(delete_goal(&env.conn, &user, &goal.id).unwrap());
        assert!(update_goal(&env.conn, &user, &goal.id, &changes).unwrap().is_none());
    }
}
