//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a service over any store, a
//! deterministic cipher and a manual clock.

use std::sync::Arc;

use bytes::Bytes;

use fileshare::{Clock, FileShareService, ManualClock, Result, ServiceConfig};
use fileshare_cipher::{ChaChaCipher, MasterKey};
use fileshare_core::{FileMetadata, Permission, Principal, ShareLink};
use fileshare_store::{MemoryStore, Store};

/// Clock value every fixture starts at (2023-11-14T22:13:20Z).
pub const START: i64 = 1_700_000_000_000;

/// A service wired to a manual clock.
pub struct TestFixture<S = MemoryStore> {
    pub service: Arc<FileShareService<S, ChaChaCipher>>,
    pub clock: Arc<ManualClock>,
}

impl TestFixture<MemoryStore> {
    /// In-memory store, default configuration.
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    /// In-memory store with `config`.
    pub fn with_config(config: ServiceConfig) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestFixture<S> {
    /// Any store with `config`.
    pub fn with_store(store: S, config: ServiceConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let service = FileShareService::with_clock(
            store,
            ChaChaCipher::new(&master_key()),
            config,
            clock.clone(),
        );
        Self {
            service: Arc::new(service),
            clock,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Move the clock forward and return the new time.
    pub fn advance(&self, ms: i64) -> i64 {
        self.clock.advance(ms)
    }

    /// Upload `content` as `owner`.
    pub async fn upload(&self, owner: &str, name: &str, content: &[u8]) -> Result<FileMetadata> {
        self.service
            .upload(
                &user(owner),
                name,
                None,
                Bytes::copy_from_slice(content),
            )
            .await
    }

    /// Upload a file as `owner` and share it with `grantee`.
    pub async fn shared_file(
        &self,
        owner: &str,
        grantee: &str,
        permission: Permission,
        content: &[u8],
    ) -> Result<FileMetadata> {
        let file = self.upload(owner, "shared.txt", content).await?;
        self.service
            .share(&file.id, &user(owner), grantee.into(), permission, None)
            .await?;
        Ok(file)
    }

    /// A link on `file` created by its owner.
    pub async fn owner_link(
        &self,
        file: &FileMetadata,
        permission: Permission,
        expires_in: Option<i64>,
        one_time_use: bool,
    ) -> Result<ShareLink> {
        let expires_at = expires_in.map(|ms| self.now() + ms);
        self.service
            .create_link(
                &file.id,
                &Principal::User(file.owner.clone()),
                permission,
                expires_at,
                one_time_use,
            )
            .await
    }
}

/// An authenticated principal.
pub fn user(name: &str) -> Principal {
    Principal::user(name)
}

/// Fixed master key so failures reproduce.
pub fn master_key() -> MasterKey {
    MasterKey::from_bytes([0x5a; 32])
}
