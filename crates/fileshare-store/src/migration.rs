//! SQLite schema versions.
//!
//! [`MIGRATIONS`] is append-only: entry `i` takes the schema from version
//! `i` to `i + 1`. Applied versions are recorded in `schema_migrations`.

use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};

/// Schema steps, oldest first.
const MIGRATIONS: &[&str] = &[V1_FILES_GRANTS_LINKS];

pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring `conn` up to [`CURRENT_VERSION`]. A no-op on an up-to-date database.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let on_disk: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if on_disk > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            on_disk, CURRENT_VERSION
        )));
    }
    if on_disk == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(on_disk as usize) {
        let version = index as u32 + 1;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, now_millis()],
        )?;
    }
    tx.commit()?;

    tracing::debug!(from = on_disk, to = CURRENT_VERSION, "migrated schema");
    Ok(())
}

const V1_FILES_GRANTS_LINKS: &str = r#"
    CREATE TABLE files (
        file_id BLOB PRIMARY KEY,         -- 16 random bytes
        owner TEXT NOT NULL,
        name TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        size INTEGER NOT NULL,            -- plaintext bytes
        ciphertext BLOB NOT NULL,         -- opaque cipher envelope
        key_material BLOB NOT NULL,       -- opaque wrapped file key
        uploaded_at INTEGER NOT NULL      -- Unix ms
    );

    -- One row per (file, grantee)
    CREATE TABLE access_grants (
        file_id BLOB NOT NULL REFERENCES files(file_id) ON DELETE CASCADE,
        grantee TEXT NOT NULL,
        permission INTEGER NOT NULL,      -- 1=view, 2=download, 3=edit
        expires_at INTEGER,               -- Unix ms, NULL never expires
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (file_id, grantee)
    );

    CREATE TABLE share_links (
        link_id BLOB PRIMARY KEY,         -- 16 random bytes, bearer token
        file_id BLOB NOT NULL REFERENCES files(file_id) ON DELETE CASCADE,
        created_by TEXT NOT NULL,
        permission INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        expires_at INTEGER,
        one_time_use INTEGER NOT NULL DEFAULT 0,
        access_count INTEGER NOT NULL DEFAULT 0,
        active INTEGER NOT NULL DEFAULT 1
    );

    CREATE INDEX idx_files_owner ON files(owner);
    CREATE INDEX idx_grants_grantee ON access_grants(grantee);
    CREATE INDEX idx_links_file ON share_links(file_id);
"#;

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
