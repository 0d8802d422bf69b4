//! SQL schema for the hookline SQLite store.
//!
//! Mirrors the subset of the Postgres `claude` schema the hooks touch, with
//! the schema prefix dropped. Executed once at connection startup.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Enumerated-value constraints consulted by the write interceptor.
CREATE TABLE IF NOT EXISTS column_registry (
    table_name   TEXT NOT NULL,
    column_name  TEXT NOT NULL,
    valid_values TEXT,            -- JSON array of strings, NULL = unconstrained
    PRIMARY KEY (table_name, column_name)
);

CREATE TABLE IF NOT EXISTS projects (
    project_id   TEXT PRIMARY KEY,
    project_name TEXT NOT NULL UNIQUE,
    phase        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS features (
    feature_id   TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL REFERENCES projects(project_id),
    feature_name TEXT
);

-- One row per project, replaced wholesale on every save.
CREATE TABLE IF NOT EXISTS session_state (
    project_name   TEXT PRIMARY KEY,
    todo_list      TEXT NOT NULL DEFAULT '[]',
    current_focus  TEXT NOT NULL DEFAULT '',
    next_steps     TEXT NOT NULL DEFAULT '[]',
    files_modified TEXT NOT NULL DEFAULT '[]',
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id      TEXT PRIMARY KEY,
    project_name    TEXT NOT NULL,
    session_start   TEXT NOT NULL,  -- fixed-width RFC 3339, sorts lexically
    session_end     TEXT,
    session_summary TEXT
);

CREATE TABLE IF NOT EXISTS todos (
    todo_id    TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(project_id),
    content    TEXT NOT NULL,
    status     TEXT NOT NULL,      -- 'pending' | 'in_progress' | 'completed'
    is_deleted INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS mcp_usage (
    usage_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    mcp_server        TEXT NOT NULL,
    tool_name         TEXT NOT NULL,
    execution_time_ms INTEGER NOT NULL,
    success           INTEGER NOT NULL,
    error_message     TEXT,
    input_size_bytes  INTEGER NOT NULL,
    output_size_bytes INTEGER NOT NULL,
    session_id        TEXT,
    project_name      TEXT,
    called_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_sessions (
    session_id        TEXT PRIMARY KEY,
    agent_type        TEXT NOT NULL,
    task_description  TEXT NOT NULL,
    workspace_dir     TEXT NOT NULL,
    parent_session_id TEXT,
    spawned_at        TEXT NOT NULL,
    success           INTEGER
);

CREATE INDEX IF NOT EXISTS sessions_project_idx ON sessions(project_name, session_start);
CREATE INDEX IF NOT EXISTS todos_project_idx    ON todos(project_id, status);

PRAGMA user_version = 1;
";
