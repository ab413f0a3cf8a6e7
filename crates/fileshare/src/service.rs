//! The file share service: unified API over store, cipher and rules.
//!
//! Every entry point follows the same shape: read the clock once, load the
//! file together with the caller's grant, run the authorization engine, and
//! only then touch ciphertext or mutate state.

use std::sync::Arc;

use bytes::Bytes;

use fileshare_cipher::{CipherProvider, Sealed};
use fileshare_core::{
    authorize, AccessGrant, AccessRequest, Action, Allowed, Decision, DenyReason, FileId,
    FileMetadata, FileRecord, LinkId, Permission, Principal, ShareLink, UserId,
};
use fileshare_store::{ContentUpdate, Store};

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::error::{FileShareError, Result};
use crate::grants::AccessGrants;
use crate::links::LinkRegistry;
use crate::response::{self, ContentResponse, Disposition, OCTET_STREAM};

/// Longest accepted file name, in characters.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// What an access through a share link produced.
#[derive(Debug, Clone)]
pub enum LinkAccess {
    Metadata(FileMetadata),
    Content(ContentResponse),
}

/// A file loaded together with the caller's grant on it.
struct Resolved {
    file: FileRecord,
    grant: Option<AccessGrant>,
}

/// The main service struct.
///
/// Provides:
/// - Upload, listing, deletion and content replacement
/// - Metadata and content delivery, by identity or by link
/// - Grant management (owner only)
/// - Link creation and revocation
pub struct FileShareService<S, C> {
    store: Arc<S>,
    cipher: Arc<C>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    grants: AccessGrants<S>,
    links: LinkRegistry<S>,
}

impl<S: Store, C: CipherProvider + 'static> FileShareService<S, C> {
    /// Create a service using wall-clock time.
    pub fn new(store: S, cipher: C, config: ServiceConfig) -> Self {
        Self::with_clock(store, cipher, config, Arc::new(SystemClock))
    }

    /// Create a service with an explicit clock.
    pub fn with_clock(store: S, cipher: C, config: ServiceConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(store);
        Self {
            grants: AccessGrants::new(store.clone()),
            links: LinkRegistry::new(store.clone(), config.links.clone()),
            store,
            cipher: Arc::new(cipher),
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn grants(&self) -> &AccessGrants<S> {
        &self.grants
    }

    pub fn links(&self) -> &LinkRegistry<S> {
        &self.links
    }

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // File Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt and store a new file owned by `principal`.
    ///
    /// The MIME type is the declared one when it looks valid, otherwise it
    /// is inferred from the file name.
    pub async fn upload(
        &self,
        principal: &Principal,
        name: &str,
        declared_mime: Option<&str>,
        content: Bytes,
    ) -> Result<FileMetadata> {
        let owner = principal
            .user_id()
            .ok_or(FileShareError::Denied(DenyReason::NotAuthorized))?
            .clone();
        let name = validate_name(name)?;
        let size = self.check_size(&content)?;
        let mime_type = resolve_mime(&name, declared_mime);
        let now = self.now();

        let sealed = self.seal(content).await?;
        let file = FileRecord {
            id: FileId::generate(),
            owner,
            name,
            mime_type,
            size,
            ciphertext: Bytes::from(sealed.ciphertext),
            key_material: Bytes::from(sealed.key_material),
            uploaded_at: now,
        };
        self.store.insert_file(&file).await?;

        tracing::info!(
            file = %file.id,
            owner = %file.owner,
            size,
            mime_type = %file.mime_type,
            "file uploaded"
        );
        Ok(file.metadata())
    }

    /// Files owned by or shared with `principal`, newest first.
    pub async fn list_files(&self, principal: &Principal) -> Result<Vec<FileMetadata>> {
        let user = principal
            .user_id()
            .ok_or(FileShareError::Denied(DenyReason::NotAuthorized))?;
        Ok(self.store.list_files_for(user, self.now()).await?)
    }

    /// File metadata. Never consumes link budget.
    pub async fn get_file(
        &self,
        file_id: &FileId,
        principal: &Principal,
        link_id: Option<&LinkId>,
    ) -> Result<FileMetadata> {
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;
        let link = self.find_link(file_id, link_id).await?;

        self.authorize_access(&resolved, principal, link.as_ref(), Action::ViewMetadata, now)?;
        Ok(resolved.file.metadata())
    }

    /// Decrypted content for `ViewContent` (inline) or `Download` (attachment).
    pub async fn get_file_content(
        &self,
        file_id: &FileId,
        principal: &Principal,
        action: Action,
        link_id: Option<&LinkId>,
    ) -> Result<ContentResponse> {
        let disposition =
            Disposition::for_action(action).ok_or(FileShareError::UnsupportedAction(action))?;
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;
        let link = self.find_link(file_id, link_id).await?;

        let allowed =
            self.authorize_access(&resolved, principal, link.as_ref(), action, now)?;
        self.deliver(&resolved.file, &allowed, action, disposition, now)
            .await
    }

    /// Replace a file's content (and optionally its name). Requires `Edit`.
    ///
    /// The new content is sealed under a fresh file key.
    pub async fn update_content(
        &self,
        file_id: &FileId,
        principal: &Principal,
        link_id: Option<&LinkId>,
        name: Option<&str>,
        content: Bytes,
    ) -> Result<FileMetadata> {
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;
        let link = self.find_link(file_id, link_id).await?;
        self.authorize_access(&resolved, principal, link.as_ref(), Action::Edit, now)?;

        let file = resolved.file;
        let (name, mime_type) = match name {
            Some(name) => {
                let name = validate_name(name)?;
                let mime_type = if name == file.name {
                    file.mime_type.clone()
                } else {
                    resolve_mime(&name, None)
                };
                (name, mime_type)
            }
            None => (file.name.clone(), file.mime_type.clone()),
        };
        let size = self.check_size(&content)?;

        let sealed = self.seal(content).await?;
        let update = ContentUpdate {
            name,
            mime_type,
            size,
            ciphertext: Bytes::from(sealed.ciphertext),
            key_material: Bytes::from(sealed.key_material),
        };
        if !self.store.update_file_content(&file.id, &update).await? {
            return Err(FileShareError::FileNotFound(file.id));
        }

        tracing::info!(file = %file.id, editor = %principal, size, "file content replaced");
        Ok(FileMetadata {
            id: file.id,
            owner: file.owner,
            name: update.name,
            mime_type: update.mime_type,
            size,
            uploaded_at: file.uploaded_at,
        })
    }

    /// Delete a file with all of its grants and links. Owner only.
    pub async fn delete_file(&self, file_id: &FileId, principal: &Principal) -> Result<()> {
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;
        self.require_owner(&resolved, principal, "delete this file", now)?;

        self.store.delete_file(file_id).await?;
        tracing::info!(file = %file_id, "file deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Share a file with `grantee`, or change an existing share.
    pub async fn share(
        &self,
        file_id: &FileId,
        principal: &Principal,
        grantee: UserId,
        permission: Permission,
        expires_at: Option<i64>,
    ) -> Result<AccessGrant> {
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;
        self.require_owner(&resolved, principal, "share this file", now)?;

        self.grants
            .upsert(&resolved.file, principal, grantee, permission, expires_at, now)
            .await
    }

    /// Remove `grantee`'s share. A missing share is not an error.
    pub async fn revoke_share(
        &self,
        file_id: &FileId,
        principal: &Principal,
        grantee: &UserId,
    ) -> Result<()> {
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;
        self.require_owner(&resolved, principal, "revoke shares", now)?;

        self.grants.revoke(&resolved.file, principal, grantee).await
    }

    /// Every grant on a file. Owner only.
    pub async fn list_grants(
        &self,
        file_id: &FileId,
        principal: &Principal,
    ) -> Result<Vec<AccessGrant>> {
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;
        self.require_owner(&resolved, principal, "list shares", now)?;

        self.grants.list_for_file(&resolved.file, principal).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Link Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a share link. Open to the owner and to live grantees.
    pub async fn create_link(
        &self,
        file_id: &FileId,
        principal: &Principal,
        permission: Permission,
        expires_at: Option<i64>,
        one_time_use: bool,
    ) -> Result<ShareLink> {
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;

        self.links
            .create(&resolved.file, principal, permission, expires_at, one_time_use, now)
            .await
            .map_err(|err| match err {
                FileShareError::Denied(reason) => self.deny(file_id, reason),
                other => other,
            })
    }

    /// Deactivate a link. Owner only.
    pub async fn revoke_link(&self, link_id: &LinkId, principal: &Principal) -> Result<()> {
        let link = self.links.resolve(link_id).await?;
        let resolved = self.resolve_for_link(&link, principal).await?;

        self.links.revoke(&resolved.file, &link, principal).await
    }

    /// Every link on a file. Owner only.
    pub async fn list_links(
        &self,
        file_id: &FileId,
        principal: &Principal,
    ) -> Result<Vec<ShareLink>> {
        let now = self.now();
        let resolved = self.resolve(file_id, principal).await?;
        self.require_owner(&resolved, principal, "list links", now)?;

        self.links.list_for_file(&resolved.file, principal).await
    }

    /// Use a link directly.
    ///
    /// `ViewMetadata` returns metadata without consuming budget; `ViewContent`
    /// and `Download` return content and, when the link is what authorized
    /// the request, consume one access. Edits go through
    /// [`update_content`](Self::update_content).
    pub async fn access_link(
        &self,
        link_id: &LinkId,
        principal: &Principal,
        action: Action,
    ) -> Result<LinkAccess> {
        let now = self.now();
        let link = self.links.resolve(link_id).await?;
        let resolved = self.resolve_for_link(&link, principal).await?;

        match action {
            Action::ViewMetadata => {
                self.authorize_access(&resolved, principal, Some(&link), action, now)?;
                Ok(LinkAccess::Metadata(resolved.file.metadata()))
            }
            Action::ViewContent | Action::Download => {
                let disposition = Disposition::for_action(action)
                    .ok_or(FileShareError::UnsupportedAction(action))?;
                let allowed =
                    self.authorize_access(&resolved, principal, Some(&link), action, now)?;
                let response = self
                    .deliver(&resolved.file, &allowed, action, disposition, now)
                    .await?;
                Ok(LinkAccess::Content(response))
            }
            Action::Edit => Err(FileShareError::UnsupportedAction(action)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the file and the caller's grant. Both lookups run whether or not
    /// the file exists.
    async fn resolve(&self, file_id: &FileId, principal: &Principal) -> Result<Resolved> {
        let (file, grant) = tokio::join!(
            self.store.get_file(file_id),
            self.grants.grant_for(file_id, principal)
        );

        let file = file?.ok_or(FileShareError::FileNotFound(*file_id))?;
        Ok(Resolved {
            file,
            grant: grant?,
        })
    }

    async fn resolve_for_link(&self, link: &ShareLink, principal: &Principal) -> Result<Resolved> {
        self.resolve(&link.file_id, principal)
            .await
            .map_err(|err| match err {
                FileShareError::FileNotFound(_) => FileShareError::LinkNotFound,
                other => other,
            })
    }

    /// The presented link, if it exists and is for `file_id`.
    ///
    /// A link for another file is ignored so the request is judged as if no
    /// link had been sent; its state must not reveal whether `file_id` exists.
    async fn find_link(
        &self,
        file_id: &FileId,
        link_id: Option<&LinkId>,
    ) -> Result<Option<ShareLink>> {
        let Some(id) = link_id else {
            return Ok(None);
        };
        Ok(self
            .links
            .find(id)
            .await?
            .filter(|link| link.file_id == *file_id))
    }

    fn authorize_access(
        &self,
        resolved: &Resolved,
        principal: &Principal,
        link: Option<&ShareLink>,
        action: Action,
        now: i64,
    ) -> Result<Allowed> {
        let file = &resolved.file;
        let request = AccessRequest {
            principal,
            file_id: file.id,
            owner: &file.owner,
            grant: resolved.grant.as_ref(),
            link,
            action,
        };

        match authorize(&request, now) {
            Decision::Allow(allowed) => {
                tracing::debug!(
                    file = %file.id,
                    %principal,
                    %action,
                    tier = %allowed.tier,
                    path = ?allowed.path,
                    "access allowed"
                );
                Ok(allowed)
            }
            Decision::Deny(reason) => {
                tracing::info!(file = %file.id, %principal, %action, %reason, "access denied");
                Err(self.deny(&file.id, reason))
            }
        }
    }

    fn deny(&self, file_id: &FileId, reason: DenyReason) -> FileShareError {
        if reason == DenyReason::NotAuthorized && self.config.conceal_existence {
            FileShareError::FileNotFound(*file_id)
        } else {
            FileShareError::Denied(reason)
        }
    }

    /// Owner-only gate. A caller with no live grant is told the file does not
    /// exist when existence is concealed.
    fn require_owner(
        &self,
        resolved: &Resolved,
        principal: &Principal,
        what: &'static str,
        now: i64,
    ) -> Result<()> {
        if principal.is(&resolved.file.owner) {
            return Ok(());
        }

        let related = resolved.grant.as_ref().is_some_and(|g| g.is_live(now));
        if self.config.conceal_existence && !related {
            Err(FileShareError::FileNotFound(resolved.file.id))
        } else {
            Err(FileShareError::NotOwner(what))
        }
    }

    /// Decrypt, then consume link budget if required, then release.
    ///
    /// A failed decryption consumes nothing; a lost race on a one-time link
    /// releases nothing.
    async fn deliver(
        &self,
        file: &FileRecord,
        allowed: &Allowed,
        action: Action,
        disposition: Disposition,
        now: i64,
    ) -> Result<ContentResponse> {
        let plaintext = self.open(file).await?;

        if let Some(link_id) = allowed.record_link_access {
            let access_count = self.links.record_access(&link_id, action, now).await?;
            tracing::info!(file = %file.id, access_count, "link access recorded");
        }

        Ok(response::build(
            &file.metadata(),
            Bytes::from(plaintext),
            disposition,
        ))
    }

    async fn seal(&self, content: Bytes) -> Result<Sealed> {
        let cipher = self.cipher.clone();
        let sealed = tokio::task::spawn_blocking(move || cipher.encrypt(&content))
            .await
            .map_err(|e| FileShareError::Task(e.to_string()))?;

        sealed.map_err(|err| {
            tracing::error!(error = %err, "encryption failed");
            err.into()
        })
    }

    async fn open(&self, file: &FileRecord) -> Result<Vec<u8>> {
        let cipher = self.cipher.clone();
        let ciphertext = file.ciphertext.clone();
        let key_material = file.key_material.clone();

        let plaintext =
            tokio::task::spawn_blocking(move || cipher.decrypt(&ciphertext, &key_material))
                .await
                .map_err(|e| FileShareError::Task(e.to_string()))?;

        plaintext.map_err(|err| {
            tracing::error!(file = %file.id, error = %err, "decryption failed");
            err.into()
        })
    }

    fn check_size(&self, content: &Bytes) -> Result<u64> {
        let size = content.len() as u64;
        let limit = self.config.max_upload_bytes;
        if size > limit {
            return Err(FileShareError::PayloadTooLarge { size, limit });
        }
        Ok(size)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FileShareError::InvalidFileName("name is empty".into()));
    }
    if name.chars().count() > MAX_FILE_NAME_LEN {
        return Err(FileShareError::InvalidFileName(format!(
            "name is longer than {} characters",
            MAX_FILE_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Declared type if it is a plausible `type/subtype`, else a guess from the name.
fn resolve_mime(name: &str, declared: Option<&str>) -> String {
    let declared = declared.map(str::trim).filter(|mime| {
        let mut parts = mime.splitn(2, '/');
        let plausible = matches!(
            (parts.next(), parts.next()),
            (Some(kind), Some(sub)) if !kind.is_empty() && !sub.is_empty()
        );
        plausible && !mime.chars().any(|c| c.is_control() || c.is_whitespace())
    });

    match declared {
        Some(mime) => mime.to_ascii_lowercase(),
        None => mime_guess::from_path(name)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string()),
    }
}
