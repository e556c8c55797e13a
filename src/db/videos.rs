//! Saved educational videos

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{new_id, now_timestamp, string_list_column, timestamp_column};

#[derive(Debug, Clone, Serialize)]
pub struct EducationalVideo {
    pub id: String,
    pub user_id: String,
    pub study_session_id: Option<String>,
    pub topic: String,
    pub duration: String,
    pub script: String,
    pub title: String,
    pub key_points: Vec<String>,
    pub video_url: String,
    pub video_id: String,
    pub thumbnail_url: Option<String>,
    pub estimated_duration: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo<'a> {
    pub study_session_id: Option<&'a str>,
    pub topic: &'a str,
    pub duration: &'a str,
    pub script: &'a str,
    pub title: &'a str,
    pub key_points: &'a [String],
    pub video_url: &'a str,
    pub video_id: &'a str,
    pub thumbnail_url: Option<&'a str>,
    pub estimated_duration: &'a str,
    pub status: &'a str,
}

const SELECT_VIDEO: &str = r#"
    SELECT id, user_id, study_session_id, topic, duration, script, title, key_points,
           video_url, video_id, thumbnail_url, estimated_duration, status, created_at
    FROM educational_videos
"#;

fn row_to_video(row: &rusqlite::Row) -> Result<EducationalVideo> {
    Ok(EducationalVideo {
        id: row.get(0)?,
        user_id: row.get(1)?,
        study_session_id: row.get(2)?,
        topic: row.get(3)?,
        duration: row.get(4)?,
        script: row.get(5)?,
        title: row.get(6)?,
        key_points: string_list_column(row, 7)?,
        video_url: row.get(8)?,
        video_id: row.get(9)?,
        thumbnail_url: row.get(10)?,
        estimated_duration: row.get(11)?,
        status: row.get(12)?,
        created_at: timestamp_column(row, 13)?,
    })
}

pub fn save_video(conn: &Connection, user_id: &str, video: &NewVideo) -> Result<EducationalVideo> {
    let id = new_id();
    let key_points = serde_json::to_string(video.key_points)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        r#"
        INSERT INTO educational_videos (id, user_id, study_session_id, topic, duration, script, title, key_points,
                                        video_url, video_id, thumbnail_url, estimated_duration, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
        params![
            id,
            user_id,
            video.study_session_id,
            video.topic,
            video.duration,
            video.script,
            video.title,
            key_points,
            video.video_url,
            video.video_id,
            video.thumbnail_url,
            video.estimated_duration,
            video.status,
            now_timestamp()
        ],
    )?;
    get_video(conn, user_id, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_video(conn: &Connection, user_id: &str, video_id: &str) -> Result<Option<EducationalVideo>> {
    conn.query_row(
        &format!("{} WHERE id = ?1 AND user_id = ?2", SELECT_VIDEO),
        params![video_id, user_id],
        row_to_video,
    )
    .optional()
}

pub fn list_videos(conn: &Connection, user_id: &str, skip: i64, limit: i64) -> Result<Vec<EducationalVideo>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        SELECT_VIDEO
    ))?;
    let videos = stmt
        .query_map(params![user_id, limit, skip], row_to_video)?
        .collect::<Result<Vec<_>>>()?;
    Ok(videos)
}
