//! Session store database schema.

/// SQL to create the sessions table. Mirrors `migrations/0001_create_sessions.sql`.
pub const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    session_id  UUID PRIMARY KEY,
    scenario_id VARCHAR(255) NOT NULL,
    turn_count  BIGINT NOT NULL CHECK (turn_count >= 0),
    status      VARCHAR(32) NOT NULL,
    payload     JSONB NOT NULL,
    saved_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_sessions_scenario_id
    ON sessions (scenario_id);

CREATE INDEX IF NOT EXISTS idx_sessions_status
    ON sessions (status);
";
