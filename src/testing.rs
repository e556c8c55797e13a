//! Test utilities: a migrated database and scripted AI providers.

use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

/// Test environment with a file-backed database using the authoritative schema.
///
/// The database lives in a temporary directory that is removed on drop.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    /// Connection with the full schema (all migrations)
    pub conn: Connection,
}

impl TestEnv {
    /// Create a test environment using `crate::db::schema::run_migrations()`.
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("study_blossom.db"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        crate::db::schema::run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    /// Insert an active user with a throwaway password hash, returning its id
    pub fn create_user(&self, email: &str) -> rusqlite::Result<String> {
        crate::auth::db::create_user(&self.conn, email, "not-a-real-hash", None)
            .map(|user| user.id)
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

// ==================== Provider doubles ====================

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ai::{AiError, AvatarVideo, LanguageModel, TalkStatus};

/// Language model that replays canned responses in order.
///
/// `Err` entries fail the call with [`AiError::Rejected`]; an exhausted
/// script fails with [`AiError::InvalidResponse`]. Prompts are recorded.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    pub prompts: Mutex<Vec<String>>,
    pub speech: Vec<u8>,
}

impl ScriptedModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    pub fn with_results(responses: impl IntoIterator<Item = Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            speech: vec![0, 0, 1, 0],
        }
    }

    pub fn with_speech(mut self, speech: Vec<u8>) -> Self {
        self.speech = speech;
        self
    }

    pub fn prompt(&self, idx: usize) -> String {
        self.prompts.lock().unwrap()[idx].clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_text(&self, prompt: &str, _: Option<&str>, _: f32) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AiError::Rejected(message)),
            None => Err(AiError::InvalidResponse("no scripted response left".into())),
        }
    }

    async fn synthesize_speech(&self, _: &str) -> Result<Vec<u8>, AiError> {
        Ok(self.speech.clone())
    }
}

/// Avatar video provider that reports the given statuses, one per check
#[derive(Default)]
pub struct ScriptedVideo {
    statuses: Mutex<VecDeque<TalkStatus>>,
    pub credits: Option<i64>,
    pub scripts: Mutex<Vec<String>>,
}

impl ScriptedVideo {
    pub fn new(statuses: impl IntoIterator<Item = TalkStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            credits: Some(20),
            scripts: Mutex::new(Vec::new()),
        }
    }

    pub fn status(status: &str) -> TalkStatus {
        TalkStatus {
            status: status.to_string(),
            ..Default::default()
        }
    }

    pub fn done(url: &str) -> TalkStatus {
        TalkStatus {
            status: "done".to_string(),
            result_url: Some(url.to_string()),
            thumbnail_url: Some(format!("{}.jpg", url)),
            error: None,
        }
    }
}

#[async_trait]
impl AvatarVideo for ScriptedVideo {
    async fn create_talk(&self, script: &str) -> Result<String, AiError> {
        self.scripts.lock().unwrap().push(script.to_string());
        Ok("tlk_scripted".to_string())
    }

    async fn talk_status(&self, _: &str) -> Result<TalkStatus, AiError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::status("started")))
    }

    async fn remaining_credits(&self) -> Result<Option<i64>, AiError> {
        Ok(self.credits)
    }
}
