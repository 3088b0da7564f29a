//! File-backed implementation of the `SessionRepository` trait.
//!
//! One `<session_id>.json` document per session. Saves write a temporary
//! sibling file and rename it into place, so a concurrent `load` sees either
//! the old snapshot or the new one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use parley_core::error::EngineError;
use parley_core::repository::{SessionRepository, StoredSession};

/// Directory-backed session repository.
#[derive(Debug, Clone)]
pub struct JsonFileSessionRepository {
    dir: PathBuf,
}

impl JsonFileSessionRepository {
    /// Opens `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Infrastructure` if the directory cannot be
    /// created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create", &dir, &e))?;
        Ok(Self { dir })
    }

    /// The directory snapshots are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> EngineError {
    EngineError::Infrastructure(format!("cannot {action} {}: {err}", path.display()))
}

#[async_trait]
impl SessionRepository for JsonFileSessionRepository {
    async fn save(&self, session: &StoredSession) -> Result<(), EngineError> {
        let target = self.path_for(session.session_id);
        let tmp = self
            .dir
            .join(format!("{}.{}.tmp", session.session_id, Uuid::new_v4()));
        let bytes = serde_json::to_vec_pretty(session).map_err(|e| {
            EngineError::Infrastructure(format!("cannot serialize session snapshot: {e}"))
        })?;

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error("write", &tmp, &e))?;
        if let Err(err) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error("replace", &target, &err));
        }
        debug!(session_id = %session.session_id, path = %target.display(), "session saved");
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<StoredSession>, EngineError> {
        let path = self.path_for(session_id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error("read", &path, &err)),
        };
        let stored: StoredSession =
            serde_json::from_str(&text).map_err(|e| EngineError::CorruptedSession {
                session_id,
                reason: format!("{}: {e}", path.display()),
            })?;
        if stored.session_id != session_id {
            return Err(EngineError::CorruptedSession {
                session_id,
                reason: format!("{} holds session {}", path.display(), stored.session_id),
            });
        }
        Ok(Some(stored))
    }
}
