//! End-to-end sharing scenarios.

use fileshare::{
    Action, DenyReason, ErrorKind, FileId, FileShareError, LinkAccess, Permission, Principal,
    ServiceConfig,
};
use fileshare_store::SqliteStore;
use fileshare_testkit::generators::{action, permission};
use fileshare_testkit::{user, TestFixture};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_view_grant_upgraded_to_download() {
    let fixture = TestFixture::new();
    let file = fixture
        .shared_file("alice", "bob", Permission::View, b"quarterly numbers")
        .await
        .unwrap();
    let bob = user("bob");
    let service = &fixture.service;

    let metadata = service.get_file(&file.id, &bob, None).await.unwrap();
    assert_eq!(metadata.name, "shared.txt");

    let inline = service
        .get_file_content(&file.id, &bob, Action::ViewContent, None)
        .await
        .unwrap();
    assert_eq!(inline.body.as_ref(), b"quarterly numbers");

    let err = service
        .get_file_content(&file.id, &bob, Action::Download, None)
        .await
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::InsufficientPermission));
    assert_eq!(err.status_code(), 403);

    service
        .share(&file.id, &user("alice"), "bob".into(), Permission::Download, None)
        .await
        .unwrap();

    let attachment = service
        .get_file_content(&file.id, &bob, Action::Download, None)
        .await
        .unwrap();
    assert_eq!(attachment.body.as_ref(), b"quarterly numbers");

    let grants = service.list_grants(&file.id, &user("alice")).await.unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].permission, Permission::Download);
}

#[tokio::test]
async fn test_one_time_link_single_download() {
    let fixture = TestFixture::new();
    let file = fixture.upload("alice", "invoice.pdf", b"%PDF-1.7").await.unwrap();
    let link = fixture
        .owner_link(&file, Permission::Download, None, true)
        .await
        .unwrap();
    let service = &fixture.service;

    let first = service
        .access_link(&link.id, &Principal::Anonymous, Action::Download)
        .await
        .unwrap();
    match first {
        LinkAccess::Content(response) => assert_eq!(response.body.as_ref(), b"%PDF-1.7"),
        LinkAccess::Metadata(_) => panic!("expected content"),
    }

    let stored = service.links().resolve(&link.id).await.unwrap();
    assert_eq!(stored.access_count, 1);

    let err = service
        .access_link(&link.id, &Principal::Anonymous, Action::Download)
        .await
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::LinkExhausted));

    let stored = service.links().resolve(&link.id).await.unwrap();
    assert!(stored.active);
    assert!(!stored.is_expired(fixture.now()));
    assert_eq!(stored.access_count, 1);
}

#[tokio::test]
async fn test_link_expires_after_deadline() {
    let fixture = TestFixture::new();
    let file = fixture.upload("alice", "a.txt", b"x").await.unwrap();
    let link = fixture
        .owner_link(&file, Permission::View, Some(1_000), false)
        .await
        .unwrap();
    let service = &fixture.service;

    fixture.advance(1_000);
    assert!(service
        .access_link(&link.id, &Principal::Anonymous, Action::ViewContent)
        .await
        .is_ok());

    fixture.advance(1);
    let err = service
        .access_link(&link.id, &Principal::Anonymous, Action::ViewContent)
        .await
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::LinkExpired));
}

#[tokio::test]
async fn test_revoked_link_and_deleted_file() {
    let fixture = TestFixture::new();
    let file = fixture.upload("alice", "a.txt", b"x").await.unwrap();
    let link = fixture
        .owner_link(&file, Permission::View, None, false)
        .await
        .unwrap();
    let alice = user("alice");
    let service = &fixture.service;

    service.revoke_link(&link.id, &alice).await.unwrap();
    let err = service
        .access_link(&link.id, &Principal::Anonymous, Action::ViewMetadata)
        .await
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::LinkInactive));

    service.delete_file(&file.id, &alice).await.unwrap();
    let err = service
        .access_link(&link.id, &Principal::Anonymous, Action::ViewMetadata)
        .await
        .unwrap_err();
    assert!(matches!(err, FileShareError::LinkNotFound));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_stranger_cannot_tell_file_exists() {
    let fixture = TestFixture::new();
    let file = fixture.upload("alice", "secret.txt", b"x").await.unwrap();

    let err = fixture
        .service
        .get_file(&file.id, &user("mallory"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, FileShareError::FileNotFound(_)));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_foreign_link_does_not_reveal_file_ids() {
    let fixture = TestFixture::new();
    let secret = fixture.upload("alice", "secret.txt", b"x").await.unwrap();
    let own = fixture.upload("mallory", "mine.txt", b"y").await.unwrap();
    let live = fixture
        .owner_link(&own, Permission::View, None, false)
        .await
        .unwrap();
    let revoked = fixture
        .owner_link(&own, Permission::View, None, false)
        .await
        .unwrap();
    fixture
        .service
        .revoke_link(&revoked.id, &user("mallory"))
        .await
        .unwrap();
    let service = &fixture.service;

    for link in [&live, &revoked] {
        let existing = service
            .get_file(&secret.id, &Principal::Anonymous, Some(&link.id))
            .await
            .unwrap_err();
        let missing = service
            .get_file(&FileId::generate(), &Principal::Anonymous, Some(&link.id))
            .await
            .unwrap_err();

        assert_eq!(existing.status_code(), 404);
        assert_eq!(existing.status_code(), missing.status_code());
        assert_eq!(existing.kind(), missing.kind());
        assert!(matches!(existing, FileShareError::FileNotFound(id) if id == secret.id));

        let content = service
            .get_file_content(&secret.id, &Principal::Anonymous, Action::Download, Some(&link.id))
            .await
            .unwrap_err();
        assert_eq!(content.status_code(), 404);
    }
}

#[tokio::test]
async fn test_stranger_denied_without_concealment() {
    let fixture = TestFixture::with_config(ServiceConfig {
        conceal_existence: false,
        ..ServiceConfig::default()
    });
    let file = fixture.upload("alice", "secret.txt", b"x").await.unwrap();

    let err = fixture
        .service
        .get_file(&file.id, &user("mallory"), None)
        .await
        .unwrap_err();
    assert_eq!(err.deny_reason(), Some(DenyReason::NotAuthorized));
    assert_eq!(err.public_message(), "access denied");
}

#[tokio::test]
async fn test_sqlite_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fileshare.db");

    let file_id = {
        let fixture =
            TestFixture::with_store(SqliteStore::open(&path).unwrap(), ServiceConfig::default());
        let file = fixture
            .shared_file("alice", "bob", Permission::Edit, b"draft 1")
            .await
            .unwrap();
        fixture
            .service
            .update_content(&file.id, &user("bob"), None, Some("draft.txt"), "draft 2".into())
            .await
            .unwrap();
        file.id
    };

    let fixture =
        TestFixture::with_store(SqliteStore::open(&path).unwrap(), ServiceConfig::default());
    let content = fixture
        .service
        .get_file_content(&file_id, &user("alice"), Action::Download, None)
        .await
        .unwrap();
    assert_eq!(content.body.as_ref(), b"draft 2");
    assert_eq!(content.filename, "draft.txt");

    let listed = fixture.service.list_files(&user("bob")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, file_id);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_stranger_never_reaches_file(action in action()) {
        let rt = runtime();
        rt.block_on(async {
            let fixture = TestFixture::new();
            let file = fixture.upload("alice", "a.txt", b"x").await.unwrap();
            let stranger = user("mallory");

            let denied = match action {
                Action::ViewMetadata => fixture.service.get_file(&file.id, &stranger, None).await.is_err(),
                Action::Edit => fixture
                    .service
                    .update_content(&file.id, &stranger, None, None, "y".into())
                    .await
                    .is_err(),
                _ => fixture
                    .service
                    .get_file_content(&file.id, &stranger, action, None)
                    .await
                    .is_err(),
            };
            assert!(denied);
        });
    }

    #[test]
    fn prop_expired_link_always_denies(
        tier in permission(),
        lifetime in 0i64..10_000,
        past in 1i64..10_000,
        action in action(),
    ) {
        prop_assume!(action != Action::Edit);
        let rt = runtime();
        rt.block_on(async {
            let fixture = TestFixture::with_config(ServiceConfig {
                links: fileshare::core::LinkPolicy {
                    owner_ceiling: Permission::Edit,
                    ..Default::default()
                },
                ..ServiceConfig::default()
            });
            let file = fixture.upload("alice", "a.txt", b"x").await.unwrap();
            let link = fixture.owner_link(&file, tier, Some(lifetime + 1), false).await.unwrap();
            fixture.advance(lifetime + 1 + past);

            let err = fixture
                .service
                .access_link(&link.id, &Principal::Anonymous, action)
                .await
                .unwrap_err();
            assert_eq!(err.deny_reason(), Some(DenyReason::LinkExpired));
        });
    }
}
