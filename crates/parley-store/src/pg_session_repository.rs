//! `PostgreSQL` implementation of the `SessionRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use parley_core::error::EngineError;
use parley_core::repository::{SessionRepository, StoredSession};

use crate::schema::CREATE_SESSIONS_TABLE;

type SessionRow = (Uuid, String, i64, String, serde_json::Value, DateTime<Utc>);

/// PostgreSQL-backed session repository.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Creates a new `PgSessionRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `sessions` table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Infrastructure` if the statement fails.
    pub async fn ensure_schema(&self) -> Result<(), EngineError> {
        sqlx::raw_sql(CREATE_SESSIONS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(())
    }
}

fn infrastructure(err: sqlx::Error) -> EngineError {
    EngineError::Infrastructure(format!("session store: {err}"))
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn save(&self, session: &StoredSession) -> Result<(), EngineError> {
        let turn_count = i64::try_from(session.turn_count).map_err(|_| {
            EngineError::Infrastructure(format!(
                "turn count {} does not fit the store",
                session.turn_count
            ))
        })?;

        // A snapshot with fewer turns than the stored one is stale.
        let result = sqlx::query(
            r"
            INSERT INTO sessions (session_id, scenario_id, turn_count, status, payload, saved_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_id) DO UPDATE SET
                scenario_id = EXCLUDED.scenario_id,
                turn_count  = EXCLUDED.turn_count,
                status      = EXCLUDED.status,
                payload     = EXCLUDED.payload,
                saved_at    = EXCLUDED.saved_at
            WHERE sessions.turn_count <= EXCLUDED.turn_count
            ",
        )
        .bind(session.session_id)
        .bind(&session.scenario_id)
        .bind(turn_count)
        .bind(&session.status)
        .bind(&session.payload)
        .bind(session.saved_at)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::Infrastructure(format!(
                "stale snapshot for session {} rejected",
                session.session_id
            )));
        }
        debug!(session_id = %session.session_id, turn_count, "session saved");
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<StoredSession>, EngineError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r"
            SELECT session_id, scenario_id, turn_count, status, payload, saved_at
            FROM sessions
            WHERE session_id = $1
            ",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        let Some((session_id, scenario_id, turn_count, status, payload, saved_at)) = row else {
            return Ok(None);
        };
        let turn_count = u64::try_from(turn_count).map_err(|_| EngineError::CorruptedSession {
            session_id,
            reason: format!("negative turn count {turn_count}"),
        })?;

        Ok(Some(StoredSession {
            session_id,
            scenario_id,
            turn_count,
            status,
            payload,
            saved_at,
        }))
    }
}
