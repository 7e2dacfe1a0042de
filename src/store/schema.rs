pub const SCHEMA: &str = r#"
-- Accounts known to the control plane
CREATE TABLE IF NOT EXISTS principals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    login TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL DEFAULT '',
    admin INTEGER NOT NULL DEFAULT 0,
    machine INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,

    -- Remote credentials, handed to the remote authority
    token TEXT NOT NULL DEFAULT '',
    refresh TEXT NOT NULL DEFAULT '',
    expiry TEXT,

    -- Permission refresh cursor
    syncing INTEGER NOT NULL DEFAULT 0,
    synced TEXT,              -- NULL = never synchronized

    last_login TEXT,
    token_digest TEXT,        -- sha256 of the API token
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Repositories
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT NOT NULL UNIQUE,
    user_id INTEGER NOT NULL REFERENCES principals(id),
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    visibility TEXT NOT NULL DEFAULT 'private',
    branch TEXT NOT NULL DEFAULT 'master',
    config TEXT NOT NULL DEFAULT '.drone.yml',
    timeout INTEGER NOT NULL DEFAULT 60,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(namespace, name)
);

-- Cached permissions per (repository, principal)
CREATE TABLE IF NOT EXISTS permissions (
    repo_uid TEXT NOT NULL REFERENCES repositories(uid) ON DELETE CASCADE ON UPDATE CASCADE,
    user_id INTEGER NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
    bits INTEGER NOT NULL DEFAULT 0,
    pinned INTEGER NOT NULL DEFAULT 0,  -- If 1, never rewritten by synchronization
    synced_at TEXT,                     -- NULL when pinned
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (repo_uid, user_id)
);

CREATE INDEX IF NOT EXISTS idx_permissions_user ON permissions(user_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_principals_token_digest ON principals(token_digest);
"#;
