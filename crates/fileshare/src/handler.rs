//! Typed request handlers.
//!
//! Each inbound operation is a request struct implementing [`Handler`]. An
//! [`Endpoint`] pairs a service with an [`IdentityProvider`] so a transport
//! only has to supply its raw request and the decoded operation.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use fileshare_cipher::CipherProvider;
use fileshare_core::{
    AccessGrant, Action, FileId, FileMetadata, LinkId, Permission, Principal, ShareLink, UserId,
};
use fileshare_store::Store;

use crate::error::Result;
use crate::identity::IdentityProvider;
use crate::response::ContentResponse;
use crate::service::{FileShareService, LinkAccess};

/// One operation against a [`FileShareService`].
#[async_trait]
pub trait Handler<S, C>: Send + Sized {
    type Response: Send;

    /// Short name used in logs.
    const NAME: &'static str;

    async fn handle(
        self,
        service: &FileShareService<S, C>,
        principal: &Principal,
    ) -> Result<Self::Response>;
}

/// Metadata for a file, optionally authorized by a link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFile {
    pub file_id: FileId,
    #[serde(default)]
    pub link_id: Option<LinkId>,
}

/// Content for a file: `view_content` or `download`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFileContent {
    pub file_id: FileId,
    pub action: Action,
    #[serde(default)]
    pub link_id: Option<LinkId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Share {
    pub file_id: FileId,
    pub grantee: UserId,
    pub permission: Permission,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeShare {
    pub file_id: FileId,
    pub grantee: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListGrants {
    pub file_id: FileId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLink {
    pub file_id: FileId,
    pub permission: Permission,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub one_time_use: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeLink {
    pub link_id: LinkId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLinks {
    pub file_id: FileId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLink {
    pub link_id: LinkId,
    pub action: Action,
}

/// A new file. The body travels out of band from any JSON envelope.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime_type: Option<String>,
    pub content: Bytes,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListFiles;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteFile {
    pub file_id: FileId,
}

#[derive(Debug, Clone)]
pub struct UpdateContent {
    pub file_id: FileId,
    pub link_id: Option<LinkId>,
    pub name: Option<String>,
    pub content: Bytes,
}

/// Implements [`Handler`] for a request struct by destructuring it and
/// calling one service method.
macro_rules! handler {
    ($req:ident => $resp:ty, $name:literal, |$svc:ident, $principal:ident, $this:ident| $body:expr) => {
        #[async_trait]
        impl<S: Store, C: CipherProvider + 'static> Handler<S, C> for $req {
            type Response = $resp;
            const NAME: &'static str = $name;

            async fn handle(
                self,
                $svc: &FileShareService<S, C>,
                $principal: &Principal,
            ) -> Result<$resp> {
                let $this = self;
                $body.await
            }
        }
    };
}

handler!(GetFile => FileMetadata, "get_file", |svc, principal, req| {
    svc.get_file(&req.file_id, principal, req.link_id.as_ref())
});

handler!(GetFileContent => ContentResponse, "get_file_content", |svc, principal, req| {
    svc.get_file_content(&req.file_id, principal, req.action, req.link_id.as_ref())
});

handler!(Share => AccessGrant, "share", |svc, principal, req| {
    svc.share(&req.file_id, principal, req.grantee, req.permission, req.expires_at)
});

handler!(RevokeShare => (), "revoke_share", |svc, principal, req| {
    svc.revoke_share(&req.file_id, principal, &req.grantee)
});

handler!(ListGrants => Vec<AccessGrant>, "list_grants", |svc, principal, req| {
    svc.list_grants(&req.file_id, principal)
});

handler!(CreateLink => ShareLink, "create_link", |svc, principal, req| {
    svc.create_link(&req.file_id, principal, req.permission, req.expires_at, req.one_time_use)
});

handler!(RevokeLink => (), "revoke_link", |svc, principal, req| {
    svc.revoke_link(&req.link_id, principal)
});

handler!(ListLinks => Vec<ShareLink>, "list_links", |svc, principal, req| {
    svc.list_links(&req.file_id, principal)
});

handler!(AccessLink => LinkAccess, "access_link", |svc, principal, req| {
    svc.access_link(&req.link_id, principal, req.action)
});

handler!(Upload => FileMetadata, "upload", |svc, principal, req| {
    svc.upload(principal, &req.name, req.mime_type.as_deref(), req.content)
});

handler!(ListFiles => Vec<FileMetadata>, "list_files", |svc, principal, _req| {
    svc.list_files(principal)
});

handler!(DeleteFile => (), "delete_file", |svc, principal, req| {
    svc.delete_file(&req.file_id, principal)
});

handler!(UpdateContent => FileMetadata, "update_content", |svc, principal, req| {
    svc.update_content(
        &req.file_id,
        principal,
        req.link_id.as_ref(),
        req.name.as_deref(),
        req.content,
    )
});

/// A service bound to an identity provider.
pub struct Endpoint<S, C, P> {
    service: Arc<FileShareService<S, C>>,
    identity: P,
}

impl<S: Store, C: CipherProvider + 'static, P> Endpoint<S, C, P> {
    pub fn new(service: Arc<FileShareService<S, C>>, identity: P) -> Self {
        Self { service, identity }
    }

    pub fn service(&self) -> &FileShareService<S, C> {
        &self.service
    }

    /// Resolve the caller from `request`, then run `operation` as them.
    pub async fn dispatch<R, H>(&self, request: &R, operation: H) -> Result<H::Response>
    where
        R: ?Sized,
        P: IdentityProvider<R>,
        H: Handler<S, C>,
    {
        let principal = self.identity.current_principal(request);
        let result = operation.handle(&self.service, &principal).await;

        if let Err(err) = &result {
            tracing::debug!(
                operation = H::NAME,
                %principal,
                kind = err.kind().as_str(),
                status = err.status_code(),
                "request failed"
            );
        }
        result
    }
}
