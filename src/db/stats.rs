//! Per-user gamification stats (XP, level, streak, totals)

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{now_timestamp, optional_date_column, timestamp_column};
use crate::gamification::{advance_streak, calculate_level, Streak, StreakChange};

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub user_id: String,
    pub total_xp: i64,
    pub current_level: i64,
    pub plant_stage: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_sessions: i64,
    pub total_study_time: i64,
    pub last_study_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dashboard view of a user's progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_xp: i64,
    pub current_level: i64,
    pub level_name: &'static str,
    pub plant_stage: i64,
    pub progress_percentage: i64,
    pub xp_for_next_level: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_sessions: i64,
    pub total_study_time: i64,
    pub last_study_date: Option<NaiveDate>,
}

impl Dashboard {
    /// Build the dashboard; a user without stats sees a zeroed row
    pub fn from_stats(stats: Option<&UserStats>) -> Self {
        let total_xp = stats.map_or(0, |s| s.total_xp);
        let level = calculate_level(total_xp);
        Self {
            total_xp,
            current_level: level.current_level,
            level_name: level.level_name,
            plant_stage: level.plant_stage,
            progress_percentage: level.progress_percentage,
            xp_for_next_level: level.xp_for_next_level,
            current_streak: stats.map_or(0, |s| s.current_streak),
            longest_streak: stats.map_or(0, |s| s.longest_streak),
            total_sessions: stats.map_or(0, |s| s.total_sessions),
            total_study_time: stats.map_or(0, |s| s.total_study_time),
            last_study_date: stats.and_then(|s| s.last_study_date),
        }
    }
}

const SELECT_STATS: &str = r#"
    SELECT user_id, total_xp, current_level, plant_stage, current_streak, longest_streak,
           total_sessions, total_study_time, last_study_date, created_at, updated_at
    FROM user_stats
"#;

/// Get stats for a user, None if they never recorded an activity
pub fn get_user_stats(conn: &Connection, user_id: &str) -> Result<Option<UserStats>> {
    conn.query_row(
        &format!("{} WHERE user_id = ?1", SELECT_STATS),
        params![user_id],
        row_to_user_stats,
    )
    .optional()
}

/// Record one completed study activity in its own transaction.
pub fn record_activity(
    conn: &Connection,
    user_id: &str,
    xp_earned: i64,
    study_minutes: i64,
    today: NaiveDate,
) -> Result<UserStats> {
    let tx = conn.unchecked_transaction()?;
    let stats = apply_activity(&tx, user_id, xp_earned, study_minutes, today)?;
    tx.commit()?;
    Ok(stats)
}

/// Fold one activity into the user's stats row, creating it if needed.
///
/// Does not open a transaction; callers that combine this with other writes
/// run it inside theirs.
pub fn apply_activity(
    conn: &Connection,
    user_id: &str,
    xp_earned: i64,
    study_minutes: i64,
    today: NaiveDate,
) -> Result<UserStats> {
    let now = now_timestamp();
    conn.execute(
        r#"
    INSERT OR IGNORE INTO user_stats
      (user_id, total_xp, current_level, plant_stage, current_streak, longest_streak,
       total_sessions, total_study_time, last_study_date, created_at, updated_at)
    VALUES (?1, 0, 1, 1, 0, 0, 0, 0, NULL, ?2, ?2)
    "#,
        params![user_id, now],
    )?;

    let stats = get_user_stats(conn, user_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;

    let total_xp = stats.total_xp.saturating_add(xp_earned.max(0));
    let level = calculate_level(total_xp);
    let (streak, change) = advance_streak(
        Streak {
            current: stats.current_streak,
            longest: stats.longest_streak,
            last_study_date: stats.last_study_date,
        },
        today,
    );

    match change {
        StreakChange::Extended => tracing::debug!(user_id, streak = streak.current, "Streak extended"),
        StreakChange::Reset if stats.current_streak > 1 => {
            tracing::debug!(user_id, previous = stats.current_streak, "Streak reset")
        }
        _ => {}
    }

    conn.execute(
        r#"
    UPDATE user_stats
    SET total_xp = ?1,
        current_level = ?2,
        plant_stage = ?3,
        current_streak = ?4,
        longest_streak = ?5,
        total_sessions = ?6,
        total_study_time = ?7,
        last_study_date = ?8,
        updated_at = ?9
    WHERE user_id = ?10
    "#,
        params![
            total_xp,
            level.current_level,
            level.plant_stage,
            streak.current,
            streak.longest,
            stats.total_sessions.saturating_add(1),
            stats.total_study_time.saturating_add(study_minutes.max(0)),
            today.format("%Y-%m-%d").to_string(),
            now,
            user_id,
        ],
    )?;

    get_user_stats(conn, user_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Convert a database row to UserStats; NULL counters read as zero
fn row_to_user_stats(row: &rusqlite::Row) -> Result<UserStats> {
    let counter = |idx: usize| -> Result<i64> { Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0)) };

    let total_xp = counter(1)?;
    let level = calculate_level(total_xp);

    Ok(UserStats {
        user_id: row.get(0)?,
        total_xp,
        // Derived from XP, never trusted from storage
        current_level: level.current_level,
        plant_stage: level.plant_stage,
        current_streak: counter(4)?,
        longest_streak: counter(5)?,
        total_sessions: counter(6)?,
        total_study_time: counter(7)?,
        last_study_date: optional_date_column(row, 8)?,
        created_at: timestamp_column(row, 9)?,
        updated_at: timestamp_column(row, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_no_stats_until_first_activity() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("stats_none@gmail.com").unwrap();
        assert!(get_user_stats(&env.conn, &user).unwrap().is_none());
    }

    #[test]
    fn test_first_activity_creates_row() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("stats_first@gmail.com").unwrap();

        let stats = record_activity(&env.conn, &user, 20, 25, day(10)).unwrap();
        assert_eq!(stats.total_xp, 20);
        assert_eq!(stats.current_level, 1);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_study_time, 25);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
        assert_eq!(stats.last_study_date, Some(day(10)));
    }

    #[test]
    fn test_activities_accumulate_and_level_up() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("stats_level@gmail.com").unwrap();

        record_activity(&env.conn, &user, 20, 10, day(10)).unwrap();
        record_activity(&env.conn, &user, 20, 10, day(10)).unwrap();
        let stats = record_activity(&env.conn, &user, 15, 5, day(11)).unwrap();

        assert_eq!(stats.total_xp, 55);
        assert_eq!(stats.current_level, 2);
        assert_eq!(stats.plant_stage, 2);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_study_time, 25);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
    }

    #[test]
    fn test_huge_totals_saturate() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("stats_huge@gmail.com").unwrap();

        record_activity(&env.conn, &user, 20, i64::MAX, day(10)).unwrap();
        let stats = record_activity(&env.conn, &user, 20, 1, day(10)).unwrap();
        assert_eq!(stats.total_study_time, i64::MAX);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_xp, 40);
    }

    #[test]
    fn test_gap_resets_streak() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("stats_gap@gmail.com").unwrap();

        record_activity(&env.conn, &user, 5, 0, day(1)).unwrap();
        record_activity(&env.conn, &user, 5, 0, day(2)).unwrap();
        let stats = record_activity(&env.conn, &user, 5, 0, day(5)).unwrap();
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 2);
    }

    #[test]
    fn test_null_counters_are_normalized() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("stats_legacy@gmail.com").unwrap();
        let now = now_timestamp();
        env.conn
            .execute(
                r#"
        INSERT INTO user_stats (user_id, total_xp, current_level, plant_stage, current_streak,
                                longest_streak, total_sessions, total_study_time, created_at, updated_at)
        VALUES (?1, NULL, NULL, NULL, NULL, NULL, NULL, NULL, ?2, ?2)
        "#,
                params![user, now],
            )
            .unwrap();

        let stats = record_activity(&env.conn, &user, 10, 30, day(3)).unwrap();
        assert_eq!(stats.total_xp, 10);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_study_time, 30);
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn test_dashboard_defaults_without_stats() {
        let dashboard = Dashboard::from_stats(None);
        assert_eq!(dashboard.total_xp, 0);
        assert_eq!(dashboard.current_level, 1);
        assert_eq!(dashboard.level_name, "Semilla");
        assert_eq!(dashboard.progress_percentage, 0);
        assert_eq!(dashboard.xp_for_next_level, 50);
        assert_eq!(dashboard.last_study_date, None);
    }

    #[test]
    fn test_dashboard_from_stats() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("stats_dash@gmail.com").unwrap();
        let stats = record_activity(&env.conn, &user, 85, 40, day(7)).unwrap();

        let dashboard = Dashboard::from_stats(Some(&stats));
        assert_eq!(dashboard.current_level, 2);
        assert_eq!(dashboard.level_name, "Brote");
        assert_eq!(dashboard.progress_percentage, 50);
        assert_eq!(dashboard.xp_for_next_level, 35);
        assert_eq!(dashboard.total_study_time, 40);
    }
}
