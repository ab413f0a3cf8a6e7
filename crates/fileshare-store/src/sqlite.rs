//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};

use fileshare_core::{
    AccessGrant, CoreError, FileId, FileMetadata, FileRecord, LinkId, Permission, ShareLink,
    UserId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ContentUpdate, RecordOutcome, Store, UpsertResult};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::BlockingTask(e.to_string()))?
    }
}

fn blob_id<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: for<'a> TryFrom<&'a [u8], Error = CoreError>,
{
    let bytes: Vec<u8> = row.get(idx)?;
    T::try_from(bytes.as_slice())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Blob, Box::new(e)))
}

fn permission(row: &Row<'_>, idx: usize) -> rusqlite::Result<Permission> {
    let raw: u8 = row.get(idx)?;
    Permission::from_u8(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            Box::new(CoreError::UnknownPermission(raw.to_string())),
        )
    })
}

const FILE_COLUMNS: &str =
    "file_id, owner, name, mime_type, size, uploaded_at, ciphertext, key_material";

fn row_to_metadata(row: &Row<'_>) -> rusqlite::Result<FileMetadata> {
    Ok(FileMetadata {
        id: blob_id(row, 0)?,
        owner: UserId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        mime_type: row.get(3)?,
        size: row.get::<_, i64>(4)? as u64,
        uploaded_at: row.get(5)?,
    })
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let meta = row_to_metadata(row)?;
    Ok(FileRecord {
        id: meta.id,
        owner: meta.owner,
        name: meta.name,
        mime_type: meta.mime_type,
        size: meta.size,
        uploaded_at: meta.uploaded_at,
        ciphertext: Bytes::from(row.get::<_, Vec<u8>>(6)?),
        key_material: Bytes::from(row.get::<_, Vec<u8>>(7)?),
    })
}

const GRANT_COLUMNS: &str = "file_id, grantee, permission, expires_at, created_at, updated_at";

fn row_to_grant(row: &Row<'_>) -> rusqlite::Result<AccessGrant> {
    Ok(AccessGrant {
        file_id: blob_id(row, 0)?,
        grantee: UserId::new(row.get::<_, String>(1)?),
        permission: permission(row, 2)?,
        expires_at: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const LINK_COLUMNS: &str = "link_id, file_id, created_by, permission, created_at, expires_at, \
                            one_time_use, access_count, active";

fn row_to_link(row: &Row<'_>) -> rusqlite::Result<ShareLink> {
    Ok(ShareLink {
        id: blob_id(row, 0)?,
        file_id: blob_id(row, 1)?,
        created_by: UserId::new(row.get::<_, String>(2)?),
        permission: permission(row, 3)?,
        created_at: row.get(4)?,
        expires_at: row.get(5)?,
        one_time_use: row.get(6)?,
        access_count: row.get(7)?,
        active: row.get(8)?,
    })
}

/// Map a primary-key violation to `Duplicate`.
/// Primary-key collisions become `Duplicate`; other constraint failures
/// (a foreign key to a deleted file) stay database errors.
fn duplicate_on_conflict(err: rusqlite::Error, what: String) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StoreError::Duplicate(what)
        }
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_file(&self, file: &FileRecord) -> Result<()> {
        let file = file.clone();

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO files (
                    file_id, owner, name, mime_type, size, uploaded_at, ciphertext, key_material
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    file.id.as_bytes().as_slice(),
                    file.owner.as_str(),
                    file.name,
                    file.mime_type,
                    file.size as i64,
                    file.uploaded_at,
                    file.ciphertext.as_ref(),
                    file.key_material.as_ref(),
                ],
            )
            .map_err(|e| duplicate_on_conflict(e, format!("file {}", file.id)))?;
            Ok(())
        })
        .await
    }

    async fn get_file(&self, id: &FileId) -> Result<Option<FileRecord>> {
        let id = *id;

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM files WHERE file_id = ?1", FILE_COLUMNS),
                params![id.as_bytes().as_slice()],
                row_to_file,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn update_file_content(&self, id: &FileId, update: &ContentUpdate) -> Result<bool> {
        let id = *id;
        let update = update.clone();

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE files
                 SET name = ?2, mime_type = ?3, size = ?4, ciphertext = ?5, key_material = ?6
                 WHERE file_id = ?1",
                params![
                    id.as_bytes().as_slice(),
                    update.name,
                    update.mime_type,
                    update.size as i64,
                    update.ciphertext.as_ref(),
                    update.key_material.as_ref(),
                ],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn delete_file(&self, id: &FileId) -> Result<bool> {
        let id = *id;

        self.run(move |conn| {
            // Grants and links go with the file via ON DELETE CASCADE.
            let changed = conn.execute(
                "DELETE FROM files WHERE file_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn list_files_for(&self, user: &UserId, now: i64) -> Result<Vec<FileMetadata>> {
        let user = user.clone();

        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT f.file_id, f.owner, f.name, f.mime_type, f.size, f.uploaded_at
                 FROM files f
                 WHERE f.owner = ?1
                    OR EXISTS (
                        SELECT 1 FROM access_grants g
                        WHERE g.file_id = f.file_id
                          AND g.grantee = ?1
                          AND (g.expires_at IS NULL OR g.expires_at > ?2)
                    )
                 ORDER BY f.uploaded_at DESC, f.file_id ASC",
            )?;

            let files = stmt
                .query_map(params![user.as_str(), now], row_to_metadata)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(files)
        })
        .await
    }

    async fn upsert_grant(&self, grant: &AccessGrant) -> Result<UpsertResult> {
        let grant = grant.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;

            let existed = tx
                .query_row(
                    "SELECT 1 FROM access_grants WHERE file_id = ?1 AND grantee = ?2",
                    params![grant.file_id.as_bytes().as_slice(), grant.grantee.as_str()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            tx.execute(
                "INSERT INTO access_grants (
                    file_id, grantee, permission, expires_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (file_id, grantee) DO UPDATE SET
                    permission = excluded.permission,
                    expires_at = excluded.expires_at,
                    updated_at = excluded.updated_at",
                params![
                    grant.file_id.as_bytes().as_slice(),
                    grant.grantee.as_str(),
                    grant.permission.to_u8(),
                    grant.expires_at,
                    grant.created_at,
                    grant.updated_at,
                ],
            )?;

            tx.commit()?;

            Ok(if existed {
                UpsertResult::Updated
            } else {
                UpsertResult::Inserted
            })
        })
        .await
    }

    async fn get_grant(&self, file_id: &FileId, grantee: &UserId) -> Result<Option<AccessGrant>> {
        let file_id = *file_id;
        let grantee = grantee.clone();

        self.run(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM access_grants WHERE file_id = ?1 AND grantee = ?2",
                    GRANT_COLUMNS
                ),
                params![file_id.as_bytes().as_slice(), grantee.as_str()],
                row_to_grant,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn delete_grant(&self, file_id: &FileId, grantee: &UserId) -> Result<bool> {
        let file_id = *file_id;
        let grantee = grantee.clone();

        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM access_grants WHERE file_id = ?1 AND grantee = ?2",
                params![file_id.as_bytes().as_slice(), grantee.as_str()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn list_grants(&self, file_id: &FileId) -> Result<Vec<AccessGrant>> {
        let file_id = *file_id;

        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM access_grants WHERE file_id = ?1 ORDER BY grantee ASC",
                GRANT_COLUMNS
            ))?;

            let grants = stmt
                .query_map(params![file_id.as_bytes().as_slice()], row_to_grant)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(grants)
        })
        .await
    }

    async fn insert_link(&self, link: &ShareLink) -> Result<()> {
        let link = link.clone();

        self.run(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO share_links ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    LINK_COLUMNS
                ),
                params![
                    link.id.as_bytes().as_slice(),
                    link.file_id.as_bytes().as_slice(),
                    link.created_by.as_str(),
                    link.permission.to_u8(),
                    link.created_at,
                    link.expires_at,
                    link.one_time_use,
                    link.access_count,
                    link.active,
                ],
            )
            .map_err(|e| duplicate_on_conflict(e, format!("link {}", link.id)))?;
            Ok(())
        })
        .await
    }

    async fn get_link(&self, id: &LinkId) -> Result<Option<ShareLink>> {
        let id = *id;

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM share_links WHERE link_id = ?1", LINK_COLUMNS),
                params![id.as_bytes().as_slice()],
                row_to_link,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn deactivate_link(&self, id: &LinkId) -> Result<bool> {
        let id = *id;

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE share_links SET active = 0 WHERE link_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn record_link_access(&self, id: &LinkId, now: i64) -> Result<RecordOutcome> {
        let id = *id;

        self.run(move |conn| {
            // Conditional increment: the state checks and the write are one statement.
            let count: Option<u32> = conn
                .query_row(
                    "UPDATE share_links
                     SET access_count = access_count + 1
                     WHERE link_id = ?1
                       AND active = 1
                       AND (expires_at IS NULL OR expires_at >= ?2)
                       AND (one_time_use = 0 OR access_count < 1)
                       AND access_count < ?3
                     RETURNING access_count",
                    params![id.as_bytes().as_slice(), now, u32::MAX],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(match count {
                Some(access_count) => RecordOutcome::Recorded { access_count },
                None => RecordOutcome::Rejected,
            })
        })
        .await
    }

    async fn list_links(&self, file_id: &FileId) -> Result<Vec<ShareLink>> {
        let file_id = *file_id;

        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM share_links WHERE file_id = ?1
                 ORDER BY created_at DESC, link_id ASC",
                LINK_COLUMNS
            ))?;

            let links = stmt
                .query_map(params![file_id.as_bytes().as_slice()], row_to_link)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(links)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(owner: &str, uploaded_at: i64) -> FileRecord {
        FileRecord {
            id: FileId::generate(),
            owner: UserId::from(owner),
            name: "notes.txt".into(),
            mime_type: "text/plain".into(),
            size: 11,
            ciphertext: Bytes::from_static(b"ciphertext!"),
            key_material: Bytes::from_static(b"wrapped-key"),
            uploaded_at,
        }
    }

    fn make_grant(file_id: FileId, grantee: &str, permission: Permission) -> AccessGrant {
        AccessGrant {
            file_id,
            grantee: UserId::from(grantee),
            permission,
            expires_at: None,
            created_at: 10,
            updated_at: 10,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_file() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);

        store.insert_file(&file).await.unwrap();

        let fetched = store.get_file(&file.id).await.unwrap().unwrap();
        assert_eq!(fetched.metadata(), file.metadata());
        assert_eq!(fetched.ciphertext, file.ciphertext);
        assert_eq!(fetched.key_material, file.key_material);

        assert!(store.get_file(&FileId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_file_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);
        store.insert_file(&file).await.unwrap();

        assert!(matches!(
            store.insert_file(&file).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_update_content() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);
        store.insert_file(&file).await.unwrap();

        let update = ContentUpdate {
            name: "notes-v2.txt".into(),
            mime_type: "text/plain".into(),
            size: 3,
            ciphertext: Bytes::from_static(b"new"),
            key_material: Bytes::from_static(b"new-key"),
        };
        assert!(store.update_file_content(&file.id, &update).await.unwrap());

        let fetched = store.get_file(&file.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "notes-v2.txt");
        assert_eq!(fetched.size, 3);
        assert_eq!(fetched.owner, file.owner);
        assert_eq!(fetched.uploaded_at, file.uploaded_at);

        assert!(!store
            .update_file_content(&FileId::generate(), &update)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_upsert_grant() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);
        store.insert_file(&file).await.unwrap();

        let grant = make_grant(file.id, "bob", Permission::View);
        assert_eq!(store.upsert_grant(&grant).await.unwrap(), UpsertResult::Inserted);

        let mut raised = make_grant(file.id, "bob", Permission::Edit);
        raised.expires_at = Some(9_000);
        raised.created_at = 500;
        raised.updated_at = 500;
        assert_eq!(store.upsert_grant(&raised).await.unwrap(), UpsertResult::Updated);

        let grants = store.list_grants(&file.id).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].permission, Permission::Edit);
        assert_eq!(grants[0].expires_at, Some(9_000));
        assert_eq!(grants[0].created_at, 10);
        assert_eq!(grants[0].updated_at, 500);

        assert!(store.delete_grant(&file.id, &grant.grantee).await.unwrap());
        assert!(!store.delete_grant(&file.id, &grant.grantee).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_files_for_user() {
        let store = SqliteStore::open_memory().unwrap();
        let own = make_file("alice", 10);
        let shared = make_file("carol", 20);
        let lapsed = make_file("carol", 30);
        let unrelated = make_file("carol", 40);
        for f in [&own, &shared, &lapsed, &unrelated] {
            store.insert_file(f).await.unwrap();
        }

        store
            .upsert_grant(&make_grant(shared.id, "alice", Permission::View))
            .await
            .unwrap();
        let mut expiring = make_grant(lapsed.id, "alice", Permission::Download);
        expiring.expires_at = Some(100);
        store.upsert_grant(&expiring).await.unwrap();

        let alice = UserId::from("alice");
        let before: Vec<FileId> = store
            .list_files_for(&alice, 99)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(before, vec![lapsed.id, shared.id, own.id]);

        let at_expiry: Vec<FileId> = store
            .list_files_for(&alice, 100)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(at_expiry, vec![shared.id, own.id]);
    }

    #[tokio::test]
    async fn test_delete_file_cascades() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);
        store.insert_file(&file).await.unwrap();
        store
            .upsert_grant(&make_grant(file.id, "bob", Permission::View))
            .await
            .unwrap();
        let link = ShareLink::new(file.id, file.owner.clone(), Permission::View, None, false, 1);
        store.insert_link(&link).await.unwrap();

        assert!(store.delete_file(&file.id).await.unwrap());

        assert!(store.list_grants(&file.id).await.unwrap().is_empty());
        assert!(store.get_link(&link.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_link_roundtrip_and_deactivate() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);
        store.insert_file(&file).await.unwrap();

        let link = ShareLink::new(
            file.id,
            file.owner.clone(),
            Permission::Download,
            Some(1_000),
            true,
            5,
        );
        store.insert_link(&link).await.unwrap();
        assert_eq!(store.get_link(&link.id).await.unwrap().unwrap(), link);

        assert!(store.deactivate_link(&link.id).await.unwrap());
        assert!(!store.get_link(&link.id).await.unwrap().unwrap().active);
        assert!(!store.deactivate_link(&LinkId::generate()).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_access_respects_link_state() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);
        store.insert_file(&file).await.unwrap();

        let reusable =
            ShareLink::new(file.id, file.owner.clone(), Permission::View, Some(100), false, 1);
        store.insert_link(&reusable).await.unwrap();

        // Usable at exactly the expiry instant.
        assert_eq!(
            store.record_link_access(&reusable.id, 100).await.unwrap(),
            RecordOutcome::Recorded { access_count: 1 }
        );
        assert_eq!(
            store.record_link_access(&reusable.id, 100).await.unwrap(),
            RecordOutcome::Recorded { access_count: 2 }
        );
        assert_eq!(
            store.record_link_access(&reusable.id, 101).await.unwrap(),
            RecordOutcome::Rejected
        );

        let once = ShareLink::new(file.id, file.owner.clone(), Permission::View, None, true, 1);
        store.insert_link(&once).await.unwrap();
        assert_eq!(
            store.record_link_access(&once.id, 50).await.unwrap(),
            RecordOutcome::Recorded { access_count: 1 }
        );
        assert_eq!(
            store.record_link_access(&once.id, 50).await.unwrap(),
            RecordOutcome::Rejected
        );
    }

    #[tokio::test]
    async fn test_counter_ceiling_rejects() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);
        store.insert_file(&file).await.unwrap();

        let mut link = ShareLink::new(file.id, file.owner.clone(), Permission::View, None, false, 1);
        link.access_count = u32::MAX - 1;
        store.insert_link(&link).await.unwrap();

        assert_eq!(
            store.record_link_access(&link.id, 2).await.unwrap(),
            RecordOutcome::Recorded { access_count: u32::MAX }
        );
        assert_eq!(
            store.record_link_access(&link.id, 2).await.unwrap(),
            RecordOutcome::Rejected
        );
        assert_eq!(store.get_link(&link.id).await.unwrap().unwrap().access_count, u32::MAX);
    }

    #[tokio::test]
    async fn test_link_for_missing_file_is_not_duplicate() {
        let store = SqliteStore::open_memory().unwrap();
        let link = ShareLink::new(
            FileId::generate(),
            UserId::from("alice"),
            Permission::View,
            None,
            false,
            1,
        );

        assert!(matches!(
            store.insert_link(&link).await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_link_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let file = make_file("alice", 1);
        store.insert_file(&file).await.unwrap();
        let link = ShareLink::new(file.id, file.owner.clone(), Permission::View, None, false, 1);
        store.insert_link(&link).await.unwrap();

        assert!(matches!(
            store.insert_link(&link).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fileshare.db");
        let file = make_file("alice", 1);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_file(&file).await.unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let fetched = reopened.get_file(&file.id).await.unwrap().unwrap();
        assert_eq!(fetched.metadata(), file.metadata());
    }
}
