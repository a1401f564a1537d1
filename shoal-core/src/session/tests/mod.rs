/*
    Integration tests for the session layer

    Scenario suites covering:
    - Catalog sync between an initiator and a joiner over the control channel
    - Download paths (peer channels and the server fallback)
    - Mode transitions and permission gating
    - Snapshot persistence and restore
*/

mod mode_tests;
mod persistence_tests;

use crate::config::Config;
use crate::session::Session;
use crate::test_utils::{MemoryBundleStore, MockFileTransport, MockGroupTransport, MockServerApi};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct Harness {
    pub session: Session,
    pub group: Arc<MockGroupTransport>,
    pub files: Arc<MockFileTransport>,
    pub bundles: Arc<MemoryBundleStore>,
    pub server: Arc<MockServerApi>,
}

pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.identity.user_key_hash = "deadbeef".to_string();
    config.identity.nick = "tester".to_string();
    config.server.host = Some("server.test".to_string());
    config.server.request_timeout = Duration::from_secs(5);
    config
}

pub(crate) fn initiator(peer: &str) -> Harness {
    build(peer, true)
}

pub(crate) fn joiner(peer: &str) -> Harness {
    build(peer, false)
}

fn build(peer: &str, initiating: bool) -> Harness {
    let group = Arc::new(MockGroupTransport::new(peer));
    let files = Arc::new(MockFileTransport::new());
    let bundles = Arc::new(MemoryBundleStore::new());
    let server = Arc::new(MockServerApi::new(2));

    let session = if initiating {
        Session::initiate(
            test_config(),
            group.clone(),
            files.clone(),
            bundles.clone(),
            server.clone(),
        )
    } else {
        Session::join(
            test_config(),
            group.clone(),
            files.clone(),
            bundles.clone(),
            server.clone(),
        )
    };

    Harness {
        session,
        group,
        files,
        bundles,
        server,
    }
}

pub(crate) async fn server_client(level: u8) -> Harness {
    let group = Arc::new(MockGroupTransport::new("client"));
    let files = Arc::new(MockFileTransport::new());
    let bundles = Arc::new(MemoryBundleStore::new());
    let server = Arc::new(MockServerApi::new(2));
    server.grant_level(level);

    let session = Session::connect_server(
        test_config(),
        files.clone(),
        bundles.clone(),
        server.clone(),
    )
    .await
    .expect("mock server probe succeeds");

    Harness {
        session,
        group,
        files,
        bundles,
        server,
    }
}
