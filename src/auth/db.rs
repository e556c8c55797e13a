//! Account and session queries (users, sessions tables).

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use crate::db::{format_timestamp, new_id, now_timestamp, optional_timestamp_column, timestamp_column};

/// Public view of an account (never carries the password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

const SELECT_USER: &str = r#"
    SELECT u.id, u.email, u.full_name, u.is_active, u.is_verified,
           u.created_at, u.updated_at, u.last_login
    FROM users u
"#;

fn row_to_user(row: &rusqlite::Row) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        is_active: row.get(3)?,
        is_verified: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
        last_login: optional_timestamp_column(row, 7)?,
    })
}

/// Create a new user, returns the stored row
pub fn create_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
) -> Result<User> {
    let id = new_id();
    let now = now_timestamp();
    conn.execute(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, is_active, is_verified, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 1, 0, ?5, ?5)
        "#,
        params![id, email, password_hash, full_name, now],
    )?;
    get_user_by_id(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Get user by email along with their password hash
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<(User, String)>> {
    conn.query_row(
        r#"
        SELECT u.id, u.email, u.full_name, u.is_active, u.is_verified,
               u.created_at, u.updated_at, u.last_login, u.password_hash
        FROM users u
        WHERE u.email = ?1
        "#,
        params![email],
        |row| Ok((row_to_user(row)?, row.get(8)?)),
    )
    .optional()
}

pub fn get_user_by_id(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("{} WHERE u.id = ?1", SELECT_USER),
        params![user_id],
        row_to_user,
    )
    .optional()
}

/// Check if email exists (case-insensitive)
pub fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn set_user_active(conn: &Connection, user_id: &str, active: bool) -> Result<()> {
    conn.execute(
        "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
        params![active, now_timestamp(), user_id],
    )?;
    Ok(())
}

/// Update user's last login timestamp
pub fn update_last_login(conn: &Connection, user_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET last_login = ?1 WHERE id = ?2",
        params![now_timestamp(), user_id],
    )?;
    Ok(())
}

/// Create a new session keyed by the token digest
pub fn create_session(
    conn: &Connection,
    user_id: &str,
    token_hash: &str,
    duration_minutes: i64,
) -> Result<()> {
    let now = Utc::now();
    let expires = now + Duration::minutes(duration_minutes);
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![token_hash, user_id, format_timestamp(now), format_timestamp(expires)],
    )?;
    Ok(())
}

/// Resolve an unexpired session to its user
pub fn get_session_user(conn: &Connection, token_hash: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!(
            "{} JOIN sessions s ON s.user_id = u.id WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            SELECT_USER
        ),
        params![token_hash, now_timestamp()],
        row_to_user,
    )
    .optional()
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE token_hash = ?1", params![token_hash])?;
    Ok(())
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expires_at < ?1",
        params![now_timestamp()],
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    #[test]
    fn test_create_and_find_user() {
        let env = TestEnv::new().unwrap();
        let user = create_user(&env.conn, "maria.lopez@gmail.com", "hash", Some("María")).unwrap();
        assert!(user.is_active);
        assert!(!user.is_verified);
        assert_eq!(user.full_name.as_deref(), Some("María"));

        let (found, hash) = get_user_by_email(&env.conn, "maria.lopez@gmail.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "hash");
    }

    #[test]
    fn test_email_is_case_insensitive() {
        let env = TestEnv::new().unwrap();
        create_user(&env.conn, "carlos.ruiz@gmail.com", "hash", None).unwrap();
        assert!(email_exists(&env.conn, "Carlos.Ruiz@Gmail.com").unwrap());
        assert!(create_user(&env.conn, "CARLOS.RUIZ@gmail.com", "hash", None).is_err());
    }

    #[test]
    fn test_session_lifecycle() {
        let env = TestEnv::new().unwrap();
        let user = create_user(&env.conn, "session.user@gmail.com", "hash", None).unwrap();

        create_session(&env.conn, &user.id, "digest", 60).unwrap();
        let found = get_session_user(&env.conn, "digest").unwrap().unwrap();
        assert_eq!(found.id, user.id);

        delete_session(&env.conn, "digest").unwrap();
        assert!(get_session_user(&env.conn, "digest").unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_rejected_and_cleaned() {
        let env = TestEnv::new().unwrap();
        let user = create_user(&env.conn, "expired.user@gmail.com", "hash", None).unwrap();

        create_session(&env.conn, &user.id, "old", -5).unwrap();
        assert!(get_session_user(&env.conn, "old").unwrap().is_none());
        assert_eq!(cleanup_expired_sessions(&env.conn).unwrap(), 1);
    }

    #[test]
    fn test_last_login_and_active_flag() {
        let env = TestEnv::new().unwrap();
        let user = create_user(&env.conn, "flags.user@gmail.com", "hash", None).unwrap();
        assert!(user.last_login.is_none());

        update_last_login(&env.conn, &user.id).unwrap();
        set_user_active(&env.conn, &user.id, false).unwrap();

        let user = get_user_by_id(&env.conn, &user.id).unwrap().unwrap();
        assert!(user.last_login.is_some());
        assert!(!user.is_active);
    }
}
