//! SQL DDL for initializing the database schema.

/// SQLite schema includes:
/// - `users` table (one row per registered account, unique email)
/// - `containers` table (one row per engine container, owned by a user)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Accounts
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT NULL,
    hashed_password TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL -- RFC3339
);

-- ---------------------------------------------------------------------------
-- Workspace containers (engine id is unique, owner cascade-deletes rows)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS containers (
    id INTEGER PRIMARY KEY NOT NULL,
    container_id TEXT NOT NULL UNIQUE,
    container_name TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_containers_user_id ON containers(user_id);
"#;
