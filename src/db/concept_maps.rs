//! Saved concept maps

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{new_id, now_timestamp, timestamp_column};

#[derive(Debug, Clone, Serialize)]
pub struct ConceptMap {
    pub id: String,
    pub user_id: String,
    pub study_session_id: Option<String>,
    pub topic: String,
    pub mermaid_graph: String,
    pub created_at: DateTime<Utc>,
}

const SELECT_MAP: &str = r#"
    SELECT id, user_id, study_session_id, topic, mermaid_graph, created_at
    FROM concept_maps
"#;

fn row_to_map(row: &rusqlite::Row) -> Result<ConceptMap> {
    Ok(ConceptMap {
        id: row.get(0)?,
        user_id: row.get(1)?,
        study_session_id: row.get(2)?,
        topic: row.get(3)?,
        mermaid_graph: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

/// Save a map. An absent graph is stored as an empty string.
pub fn save_concept_map(
    conn: &Connection,
    user_id: &str,
    topic: &str,
    mermaid_graph: Option<&str>,
    study_session_id: Option<&str>,
) -> Result<ConceptMap> {
    let id = new_id();
    conn.execute(
        r#"
        INSERT INTO concept_maps (id, user_id, study_session_id, topic, mermaid_graph, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![id, user_id, study_session_id, topic, mermaid_graph.unwrap_or(""), now_timestamp()],
    )?;
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_MAP), params![id], row_to_map)
        .optional()?
        .ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn list_concept_maps(conn: &Connection, user_id: &str, skip: i64, limit: i64) -> Result<Vec<ConceptMap>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        SELECT_MAP
    ))?;
    let maps = stmt
        .query_map(params![user_id, limit, skip], row_to_map)?
        .collect::<Result<Vec<_>>>()?;
    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    #[test]
    fn test_save_with_and_without_graph() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("maps.owner@gmail.com").unwrap();

        let empty = save_concept_map(&env.conn, &user, "Célula", None, None).unwrap();
        assert_eq!(empty.mermaid_graph, "");

        let graph = "graph TD\n  A[Célula] --> B[Núcleo]";
        let full = save_concept_map(&env.conn, &user, "Célula", Some(graph), None).unwrap();
        assert_eq!(full.mermaid_graph, graph);

        let listed = list_concept_maps(&env.conn, &user, 0, 100).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, full.id);
    }

    #[test]
    fn test_list_is_per_user() {
        let env = TestEnv::new().unwrap();
        let owner = env.create_user("maps.mine@gmail.com").unwrap();
        let other = env.create_user("maps.yours@gmail.com").unwrap();
        save_concept_map(&env.conn, &owner, "Célula", None, None).unwrap();

        assert!(list_concept_maps(&env.conn, &other, 0, 100).unwrap().is_empty());
        assert!(list_concept_maps(&env.conn, &owner, 1, 100).unwrap().is_empty());
    }
}
