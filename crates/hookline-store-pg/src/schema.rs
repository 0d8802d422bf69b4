//! DDL for the tables the hooks read and write.
//!
//! Production databases already carry these tables; this exists to stand up
//! a scratch database. Idempotent.

pub const SCHEMA: &str = "
CREATE SCHEMA IF NOT EXISTS claude;

CREATE TABLE IF NOT EXISTS claude.column_registry (
    table_name   text NOT NULL,
    column_name  text NOT NULL,
    valid_values jsonb,
    PRIMARY KEY (table_name, column_name)
);

CREATE TABLE IF NOT EXISTS claude.projects (
    project_id   uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    project_name text NOT NULL UNIQUE,
    phase        text NOT NULL
);

CREATE TABLE IF NOT EXISTS claude.features (
    feature_id   uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    project_id   uuid NOT NULL REFERENCES claude.projects(project_id),
    feature_name text
);

CREATE TABLE IF NOT EXISTS claude.session_state (
    project_name   text PRIMARY KEY,
    todo_list      jsonb NOT NULL DEFAULT '[]',
    current_focus  text,
    next_steps     jsonb NOT NULL DEFAULT '[]',
    files_modified text[] NOT NULL DEFAULT '{}',
    updated_at     timestamptz NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS claude.sessions (
    session_id      uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    project_name    text NOT NULL,
    session_start   timestamptz NOT NULL DEFAULT now(),
    session_end     timestamptz,
    session_summary text
);

CREATE TABLE IF NOT EXISTS claude.todos (
    todo_id    uuid PRIMARY KEY DEFAULT gen_random_uuid(),
    project_id uuid NOT NULL REFERENCES claude.projects(project_id),
    content    text NOT NULL,
    status     text NOT NULL,
    is_deleted boolean NOT NULL DEFAULT false,
    updated_at timestamptz
);

CREATE TABLE IF NOT EXISTS claude.mcp_usage (
    usage_id          bigserial PRIMARY KEY,
    mcp_server        text NOT NULL,
    tool_name         text NOT NULL,
    execution_time_ms bigint NOT NULL,
    success           boolean NOT NULL,
    error_message     text,
    input_size_bytes  bigint NOT NULL,
    output_size_bytes bigint NOT NULL,
    session_id        uuid,
    project_name      text,
    called_at         timestamptz NOT NULL
);

CREATE TABLE IF NOT EXISTS claude.agent_sessions (
    session_id        text PRIMARY KEY,
    agent_type        text NOT NULL,
    task_description  text NOT NULL,
    workspace_dir     text NOT NULL,
    parent_session_id uuid,
    spawned_at        timestamptz NOT NULL,
    success           boolean
);
";
