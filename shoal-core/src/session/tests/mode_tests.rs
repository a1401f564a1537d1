//! Mode transitions, the server capability probe, and permission gating.

use super::{initiator, joiner, server_client, test_config};
use crate::catalog::{FileId, FileStatus};
use crate::control::{ControlMessage, PeerId};
use crate::session::{PermissionLevel, Session, SessionError, SessionMode};
use crate::test_utils::{sample_entry, MemoryBundleStore, MockFileTransport, MockGroupTransport, MockServerApi};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_connect_server_grants_probed_level() {
    let fx = server_client(2).await;

    assert_eq!(
        fx.session.mode(),
        SessionMode::ServerClient {
            level: PermissionLevel::Admin
        }
    );
    assert_eq!(fx.session.permission_level(), Some(PermissionLevel::Admin));

    let announced = fx.server.announced();
    assert_eq!(announced, vec![("deadbeef".to_string(), "tester".to_string())]);
}

#[tokio::test]
async fn test_v1_server_assumes_contributor_without_announce() {
    let files = Arc::new(MockFileTransport::new());
    let bundles = Arc::new(MemoryBundleStore::new());
    let server = Arc::new(MockServerApi::new(1));

    let session = Session::connect_server(test_config(), files, bundles, server.clone())
        .await
        .unwrap();

    assert_eq!(
        session.permission_level(),
        Some(PermissionLevel::Contributor)
    );
    // Version 1 servers know no users to announce to
    assert!(server.announced().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_server_probe_times_out() {
    let fx = joiner("guest");
    fx.server.respond_after(Duration::from_secs(30));

    let err = fx.session.check_server_available().await;
    assert!(matches!(err, Err(SessionError::TimeOut)));
}

#[tokio::test]
async fn test_unreachable_server_surfaces_request_failure() {
    let fx = joiner("guest");
    fx.server.fail_requests(true);

    let err = fx.session.check_server_available().await;
    assert!(matches!(err, Err(SessionError::ServerRequestFailure(_))));
}

#[tokio::test]
async fn test_probe_without_configured_host_is_rejected() {
    let mut config = test_config();
    config.server.host = None;
    let session = Session::join(
        config,
        Arc::new(MockGroupTransport::new("guest")),
        Arc::new(MockFileTransport::new()),
        Arc::new(MemoryBundleStore::new()),
        Arc::new(MockServerApi::new(2)),
    );

    let err = session.check_server_available().await;
    assert!(matches!(err, Err(SessionError::ServerNotConfigured)));
    let err = session.switch_to_server_mode().await;
    assert!(matches!(err, Err(SessionError::ServerNotConfigured)));
}

#[tokio::test]
async fn test_switch_to_server_mode_detaches_group_and_loads_server_list() {
    let fx = initiator("host");
    let local = fx
        .session
        .request_add("Local", "", "", b"local bytes".to_vec())
        .await
        .unwrap();
    fx.server.serve_files(vec![sample_entry("srv", 16)]);

    fx.session.switch_to_server_mode().await.unwrap();
    assert_eq!(fx.session.mode(), SessionMode::ServerHost);

    // The displayed catalog is now the server's list
    let catalog = fx.session.catalog();
    assert!(!catalog.contains(&local).await);
    assert_eq!(
        catalog.get(&FileId::new("srv")).await.unwrap().status,
        FileStatus::Pending
    );
    // Payload bytes survive for peers still mid-download
    assert!(fx.bundles.contains(&local).await);

    // Group traffic no longer reaches the catalog
    fx.session
        .handle_control_message(
            &PeerId::new("late-peer"),
            &ControlMessage::FileAdd(sample_entry("late", 8)).encode().unwrap(),
        )
        .await
        .unwrap();
    assert!(!catalog.contains(&FileId::new("late")).await);

    // Idempotent once in server mode
    fx.session.switch_to_server_mode().await.unwrap();
    assert_eq!(fx.session.mode(), SessionMode::ServerHost);
}

#[tokio::test]
async fn test_joiner_cannot_switch_to_server_mode() {
    let fx = joiner("guest");
    let err = fx.session.switch_to_server_mode().await;
    assert!(matches!(err, Err(SessionError::WrongMode(_))));
    assert_eq!(fx.session.mode(), SessionMode::P2pJoiner);
}

#[tokio::test]
async fn test_viewer_cannot_mutate_catalog() {
    let fx = server_client(0).await;
    fx.server.serve_files(vec![sample_entry("srv", 16)]);

    let err = fx
        .session
        .request_add("Nope", "", "", b"viewer bytes".to_vec())
        .await;
    assert!(matches!(err, Err(SessionError::PermissionDenied(_))));
    assert!(fx.server.uploads().is_empty());

    let err = fx
        .session
        .request_remove(sample_entry("srv", 16).id())
        .await;
    assert!(matches!(err, Err(SessionError::PermissionDenied(_))));
    assert!(fx.server.removals().is_empty());
}

#[tokio::test]
async fn test_viewer_cannot_update_metadata() {
    let fx = server_client(0).await;
    let err = fx
        .session
        .request_update(&FileId::new("srv"), "New", "", "")
        .await;
    assert!(matches!(err, Err(SessionError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_metadata_update_of_unknown_entry_is_rejected() {
    let fx = initiator("host");
    let err = fx
        .session
        .request_update(&FileId::new("ghost"), "New", "", "")
        .await;
    assert!(matches!(
        err,
        Err(SessionError::Catalog(crate::catalog::CatalogError::UnknownFile(_)))
    ));
}

#[tokio::test]
async fn test_contributor_add_uploads_with_user_key() {
    let fx = server_client(1).await;

    let id = fx
        .session
        .request_add("Report", "quarterly", "docs", b"report bytes".to_vec())
        .await
        .unwrap();

    let uploads = fx.server.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0.as_deref(), Some("deadbeef"));
    assert_eq!(uploads[0].1.id(), &id);
    assert_eq!(uploads[0].2, b"report bytes");
    assert!(fx.session.catalog().contains(&id).await);
}

#[tokio::test]
async fn test_failed_upload_rolls_back_local_add() {
    let fx = server_client(1).await;
    fx.server.fail_uploads(true);

    let err = fx
        .session
        .request_add("Report", "", "", b"report bytes".to_vec())
        .await;
    assert!(matches!(err, Err(SessionError::FileUploadFailure(_))));

    // The catalog and the server agree: the file was never shared
    assert!(fx.session.catalog().is_empty().await);
    assert!(fx.bundles.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_upload_timeout_rolls_back_local_add() {
    let fx = server_client(1).await;
    fx.server.respond_after(Duration::from_secs(30));

    let err = fx
        .session
        .request_add("Report", "", "", b"report bytes".to_vec())
        .await;
    assert!(matches!(err, Err(SessionError::TimeOut)));
    assert!(fx.session.catalog().is_empty().await);
    assert!(fx.bundles.is_empty());
}

#[tokio::test]
async fn test_remove_pushes_to_server_before_local_apply() {
    let fx = server_client(1).await;
    let id = fx
        .session
        .request_add("Report", "", "", b"report bytes".to_vec())
        .await
        .unwrap();

    fx.session.request_remove(&id).await.unwrap();

    assert_eq!(fx.server.removals(), vec![(Some("deadbeef".to_string()), id.clone())]);
    assert!(!fx.session.catalog().contains(&id).await);
    assert!(!fx.bundles.contains(&id).await);
}

#[tokio::test]
async fn test_admin_operations_require_admin_level() {
    let fx = server_client(1).await;
    let err = fx.session.request_admin_user_list().await;
    assert!(matches!(err, Err(SessionError::PermissionDenied(_))));
    let err = fx
        .session
        .change_user_permission("bob", PermissionLevel::Viewer)
        .await;
    assert!(matches!(err, Err(SessionError::PermissionDenied(_))));
    assert!(fx.server.user_mods().is_empty());
}

#[tokio::test]
async fn test_admin_lists_and_modifies_users() {
    let fx = server_client(2).await;
    let mut users = HashMap::new();
    users.insert("bob".to_string(), ("Bob".to_string(), 1u8));
    fx.server.set_users(users);

    let listing = fx.session.request_admin_user_list().await.unwrap();
    assert_eq!(listing.get("bob"), Some(&("Bob".to_string(), 1u8)));

    fx.session
        .change_user_permission("bob", PermissionLevel::Admin)
        .await
        .unwrap();
    assert_eq!(fx.server.user_mods(), vec![("bob".to_string(), 2u8)]);
}

#[tokio::test]
async fn test_admin_operations_rejected_in_p2p_mode() {
    let fx = initiator("host");
    let err = fx.session.request_admin_user_list().await;
    assert!(matches!(err, Err(SessionError::WrongMode(_))));
}
