use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const PRINCIPAL_COLUMNS: &str = "id, login, email, admin, machine, active, token, refresh, expiry, \
     syncing, synced, last_login, token_digest, created_at, updated_at";

const REPOSITORY_COLUMNS: &str =
    "id, uid, user_id, namespace, name, visibility, branch, config, timeout, created_at, updated_at";

const PERMISSION_COLUMNS: &str = "repo_uid, user_id, bits, pinned, synced_at, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width so stored timestamps compare correctly as text.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|s| parse_datetime(&s))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn principal_from_row(row: &Row<'_>) -> rusqlite::Result<Principal> {
    Ok(Principal {
        id: row.get(0)?,
        login: row.get(1)?,
        email: row.get(2)?,
        admin: row.get(3)?,
        machine: row.get(4)?,
        active: row.get(5)?,
        token: row.get(6)?,
        refresh: row.get(7)?,
        expiry: parse_optional_datetime(row.get(8)?),
        syncing: row.get(9)?,
        synced: parse_optional_datetime(row.get(10)?),
        last_login: parse_optional_datetime(row.get(11)?),
        token_digest: row.get(12)?,
        created_at: parse_datetime(&row.get::<_, String>(13)?),
        updated_at: parse_datetime(&row.get::<_, String>(14)?),
    })
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    let visibility: String = row.get(5)?;
    Ok(Repository {
        id: row.get(0)?,
        uid: row.get(1)?,
        user_id: row.get(2)?,
        namespace: row.get(3)?,
        name: row.get(4)?,
        visibility: Visibility::parse(&visibility).unwrap_or_default(),
        branch: row.get(6)?,
        config: row.get(7)?,
        timeout: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn permission_from_row(row: &Row<'_>) -> rusqlite::Result<PermissionRecord> {
    let pinned: bool = row.get(3)?;
    let synced_at = parse_optional_datetime(row.get(4)?);
    let sync = match (pinned, synced_at) {
        (false, Some(at)) => SyncState::Synced(at),
        (false, None) => SyncState::Synced(DateTime::<Utc>::default()),
        (true, _) => SyncState::Pinned,
    };
    Ok(PermissionRecord {
        repo_uid: row.get(0)?,
        user_id: row.get(1)?,
        permission: Permission::from(row.get::<_, i64>(2)?).expand_implied(),
        sync,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn synced_at(record: &PermissionRecord) -> Option<String> {
    match &record.sync {
        SyncState::Pinned => None,
        SyncState::Synced(at) => Some(format_datetime(at)),
    }
}

fn insert_permission(conn: &Connection, record: &PermissionRecord) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO permissions (repo_uid, user_id, bits, pinned, synced_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (repo_uid, user_id) DO UPDATE SET
            bits = excluded.bits,
            pinned = excluded.pinned,
            synced_at = excluded.synced_at,
            updated_at = excluded.updated_at",
        params![
            record.repo_uid,
            record.user_id,
            i64::from(record.permission.expand_implied()),
            record.is_pinned(),
            synced_at(record),
            format_datetime(&record.created_at),
            format_datetime(&record.updated_at),
        ],
    )
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Principal operations

    fn create_principal(&self, principal: &Principal) -> Result<Principal> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO principals (login, email, admin, machine, active, token, refresh, expiry,
                                     syncing, synced, last_login, token_digest, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                principal.login,
                principal.email,
                principal.admin,
                principal.machine,
                principal.active,
                principal.token,
                principal.refresh,
                principal.expiry.as_ref().map(format_datetime),
                principal.syncing,
                principal.synced.as_ref().map(format_datetime),
                principal.last_login.as_ref().map(format_datetime),
                principal.token_digest,
                format_datetime(&principal.created_at),
                format_datetime(&principal.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(Principal {
                id: conn.last_insert_rowid(),
                ..principal.clone()
            }),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn find_principal(&self, id: i64) -> Result<Option<Principal>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = ?1"),
            params![id],
            principal_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_principal_by_login(&self, login: &str) -> Result<Option<Principal>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE login = ?1"),
            params![login],
            principal_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_principal_by_token_digest(&self, digest: &str) -> Result<Option<Principal>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE token_digest = ?1"),
            params![digest],
            principal_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_principal(&self, principal: &Principal) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE principals SET login = ?1, email = ?2, admin = ?3, machine = ?4, active = ?5,
                    token = ?6, refresh = ?7, expiry = ?8, last_login = ?9, token_digest = ?10,
                    updated_at = ?11
             WHERE id = ?12",
            params![
                principal.login,
                principal.email,
                principal.admin,
                principal.machine,
                principal.active,
                principal.token,
                principal.refresh,
                principal.expiry.as_ref().map(format_datetime),
                principal.last_login.as_ref().map(format_datetime),
                principal.token_digest,
                format_datetime(&Utc::now()),
                principal.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn update_principal_sync(
        &self,
        id: i64,
        syncing: bool,
        synced: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE principals SET syncing = ?1, synced = COALESCE(?2, synced), updated_at = ?3
             WHERE id = ?4",
            params![
                syncing,
                synced.as_ref().map(format_datetime),
                format_datetime(&Utc::now()),
                id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn has_admin_principal(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM principals WHERE admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Repository operations

    fn create_repository(
        &self,
        repo: &Repository,
        owner_grant: &PermissionRecord,
    ) -> Result<Repository> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO repositories (uid, user_id, namespace, name, visibility, branch, config, timeout, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                repo.uid,
                repo.user_id,
                repo.namespace,
                repo.name,
                repo.visibility.as_str(),
                repo.branch,
                repo.config,
                repo.timeout,
                format_datetime(&repo.created_at),
                format_datetime(&repo.updated_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Err(Error::AlreadyExists),
            Err(e) => return Err(Error::from(e)),
        }
        let id = tx.last_insert_rowid();

        let grant = PermissionRecord {
            repo_uid: repo.uid.clone(),
            ..owner_grant.clone()
        };
        insert_permission(&tx, &grant)?;
        tx.commit()?;

        Ok(Repository { id, ..repo.clone() })
    }

    fn find_repository_by_uid(&self, uid: &str) -> Result<Option<Repository>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE uid = ?1"),
            params![uid],
            repository_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_repository_by_name(&self, namespace: &str, name: &str) -> Result<Option<Repository>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE namespace = ?1 AND name = ?2"
            ),
            params![namespace, name],
            repository_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_repository(&self, repo: &Repository) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE repositories SET namespace = ?1, name = ?2, visibility = ?3, branch = ?4,
                    config = ?5, timeout = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                repo.namespace,
                repo.name,
                repo.visibility.as_str(),
                repo.branch,
                repo.config,
                repo.timeout,
                format_datetime(&Utc::now()),
                repo.id,
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_repository(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM repositories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Permission operations

    fn find_permission(&self, user_id: i64, repo_uid: &str) -> Result<Option<PermissionRecord>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE user_id = ?1 AND repo_uid = ?2"
            ),
            params![user_id, repo_uid],
            permission_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_permission(&self, record: &PermissionRecord) -> Result<()> {
        insert_permission(&self.conn(), record)?;
        Ok(())
    }

    fn upsert_synced_permission(&self, record: &PermissionRecord) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT INTO permissions (repo_uid, user_id, bits, pinned, synced_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)
             ON CONFLICT (repo_uid, user_id) DO UPDATE SET
                bits = excluded.bits,
                synced_at = excluded.synced_at,
                updated_at = excluded.updated_at
             WHERE permissions.pinned = 0
               AND (permissions.synced_at IS NULL OR permissions.synced_at <= excluded.synced_at)",
            params![
                record.repo_uid,
                record.user_id,
                i64::from(record.permission.expand_implied()),
                synced_at(record).unwrap_or_else(|| format_datetime(&record.updated_at)),
                format_datetime(&record.created_at),
                format_datetime(&record.updated_at),
            ],
        )?;
        Ok(rows > 0)
    }

    fn delete_permission(&self, user_id: i64, repo_uid: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM permissions WHERE user_id = ?1 AND repo_uid = ?2",
            params![user_id, repo_uid],
        )?;
        Ok(rows > 0)
    }

    fn delete_unpinned_permission(&self, user_id: i64, repo_uid: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM permissions WHERE user_id = ?1 AND repo_uid = ?2 AND pinned = 0",
            params![user_id, repo_uid],
        )?;
        Ok(rows > 0)
    }

    fn list_repo_permissions(&self, repo_uid: &str) -> Result<Vec<PermissionRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE repo_uid = ?1
             ORDER BY pinned DESC, user_id"
        ))?;

        let rows = stmt.query_map(params![repo_uid], permission_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_permissions(&self, user_id: i64) -> Result<Vec<PermissionRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE user_id = ?1 ORDER BY repo_uid"
        ))?;

        let rows = stmt.query_map(params![user_id], permission_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
