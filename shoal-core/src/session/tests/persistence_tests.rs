//! Saving the catalog snapshot and restoring it into a fresh session.

use super::{initiator, test_config};
use crate::catalog::FileStatus;
use crate::control::{ControlMessage, PeerId};
use crate::session::Session;
use crate::test_utils::{sample_entry, MemoryBundleStore, MockFileTransport, MockGroupTransport, MockServerApi};
use std::sync::Arc;

fn fresh_session(bundles: Arc<MemoryBundleStore>) -> Session {
    Session::initiate(
        test_config(),
        Arc::new(MockGroupTransport::new("host")),
        Arc::new(MockFileTransport::new()),
        bundles,
        Arc::new(MockServerApi::new(2)),
    )
}

#[tokio::test]
async fn test_saved_catalog_restores_into_new_session() {
    let fx = initiator("host");
    let notes = fx
        .session
        .request_add("Notes", "meeting notes", "text", b"notes".to_vec())
        .await
        .unwrap();
    let photo = fx
        .session
        .request_add("Photo", "", "image", b"photo".to_vec())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    fx.session.save_catalog(&path).await.unwrap();

    // A later session over the same bundle store picks the shares back up
    let revived = fresh_session(fx.bundles.clone());
    let restored = revived.restore_catalog(&path).await.unwrap();
    assert_eq!(restored, 2);

    let record = revived.catalog().get(&notes).await.unwrap();
    assert_eq!(record.title, "Notes");
    assert_eq!(record.status, FileStatus::Installed);
    assert!(record.fully_held());
    assert!(revived.catalog().contains(&photo).await);
}

#[tokio::test]
async fn test_restore_skips_entries_without_payload() {
    let fx = initiator("host");
    let mine = fx
        .session
        .request_add("Mine", "", "", b"my bytes".to_vec())
        .await
        .unwrap();
    // A remote entry we never downloaded ends up in the snapshot too
    fx.session
        .handle_control_message(
            &PeerId::new("peer"),
            &ControlMessage::FileAdd(sample_entry("theirs", 32)).encode().unwrap(),
        )
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    fx.session.save_catalog(&path).await.unwrap();

    let revived = fresh_session(fx.bundles.clone());
    let restored = revived.restore_catalog(&path).await.unwrap();

    // Only the share whose bytes we still hold comes back
    assert_eq!(restored, 1);
    assert_eq!(revived.catalog().len().await, 1);
    assert!(revived.catalog().contains(&mine).await);
}

#[tokio::test]
async fn test_restore_from_missing_file_is_an_error() {
    let fx = initiator("host");
    let dir = tempfile::tempdir().unwrap();
    let result = fx.session.restore_catalog(dir.path().join("absent.json")).await;
    assert!(result.is_err());
}
