//! Client construction: settings resolution, credential loading, usage
//! tracking and their order.

mod common;

use std::sync::Arc;
use std::time::Duration;

use akash_provider::client::credentials::CredentialDescriptor;
use akash_provider::crd::AkashConfiguration;
use akash_provider::Error;
use common::{deployment, secret_descriptor, CallLog, FakeLoader, FakeRemote, FakeTracker};

#[tokio::test]
async fn test_testnet_configuration_keeps_other_defaults() {
    let log = CallLog::default();
    let factory = common::factory(
        Arc::new(FakeLoader::returning(&log, b"key")),
        Arc::new(FakeTracker::new(&log)),
        Arc::new(FakeRemote::new(&log)),
    );
    let configuration = AkashConfiguration {
        net: Some("testnet".to_string()),
        chain_id: Some("testnet-1".to_string()),
        ..AkashConfiguration::default()
    };

    let client = factory
        .build(Some(&configuration), secret_descriptor(), &deployment("web", "web.yaml"))
        .await
        .expect("client");

    let settings = client.settings();
    assert_eq!(settings.net, "testnet");
    assert_eq!(settings.chain_id, "testnet-1");
    assert_eq!(settings.node, "https://rpc.akashnet.io:443");
    assert_eq!(settings.keyring_backend, "test");
    assert_eq!(settings.key_name, "default");
    assert_eq!(settings.account_address, "");
}

#[tokio::test]
async fn test_secret_load_failure_aborts_before_tracking() {
    let log = CallLog::default();
    let loader = Arc::new(FakeLoader::failing(&log));
    let factory = common::factory(
        Arc::clone(&loader),
        Arc::new(FakeTracker::new(&log)),
        Arc::new(FakeRemote::new(&log)),
    );

    let err = factory
        .build(None, secret_descriptor(), &deployment("web", "web.yaml"))
        .await
        .expect_err("load must fail");

    assert!(matches!(err, Error::CredentialLoadFailure(_)), "{err:?}");
    assert_eq!(err.kind(), "CredentialLoadFailure");
    assert_eq!(loader.calls(), 1);
    assert_eq!(log.count("track:"), 0);
}

#[tokio::test]
async fn test_tracking_failure_aborts_construction() {
    let log = CallLog::default();
    let factory = common::factory(
        Arc::new(FakeLoader::returning(&log, b"key")),
        Arc::new(FakeTracker::failing(&log)),
        Arc::new(FakeRemote::new(&log)),
    );

    let err = factory
        .build(None, secret_descriptor(), &deployment("web", "web.yaml"))
        .await
        .expect_err("tracking must fail");

    assert!(matches!(err, Error::UsageTrackingFailure(_)), "{err:?}");
}

#[tokio::test]
async fn test_credential_is_loaded_before_usage_is_tracked() {
    let log = CallLog::default();
    let factory = common::factory(
        Arc::new(FakeLoader::returning(&log, b"key")),
        Arc::new(FakeTracker::new(&log)),
        Arc::new(FakeRemote::new(&log)),
    );

    factory
        .build(None, secret_descriptor(), &deployment("web", "web.yaml"))
        .await
        .expect("client");

    assert_eq!(log.entries(), ["load:Secret", "track:default"]);
}

#[tokio::test]
async fn test_loaded_credential_reaches_remote_calls() {
    let log = CallLog::default();
    let remote = Arc::new(FakeRemote::with_existing(&log, "7"));
    let factory = common::factory(
        Arc::new(FakeLoader::returning(&log, b"armored-key")),
        Arc::new(FakeTracker::new(&log)),
        Arc::clone(&remote),
    );

    let client = factory
        .build(None, secret_descriptor(), &deployment("web", "web.yaml"))
        .await
        .expect("client");
    client.get_deployment("7", "akash1owner").await.expect("snapshot");

    assert_eq!(
        remote.credentials.lock().expect("credentials").as_slice(),
        [b"armored-key".to_vec()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_secret_credential_is_reloaded_after_ttl() {
    let log = CallLog::default();
    let loader = Arc::new(FakeLoader::returning(&log, b"v1"));
    let factory = common::factory(
        Arc::clone(&loader),
        Arc::new(FakeTracker::new(&log)),
        Arc::new(FakeRemote::new(&log)),
    )
    .with_cache_ttl(Duration::from_secs(60));

    let client = factory
        .build(None, secret_descriptor(), &deployment("web", "web.yaml"))
        .await
        .expect("client");

    loader.set_blob(b"v2");
    assert_eq!(client.credentials().await.expect("cached").as_slice(), b"v1");
    assert_eq!(loader.calls(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(client.credentials().await.expect("reloaded").as_slice(), b"v2");
    assert_eq!(loader.calls(), 2);
}

#[tokio::test]
async fn test_refresh_is_forced_for_secret_credentials() {
    let log = CallLog::default();
    let loader = Arc::new(FakeLoader::returning(&log, b"v1"));
    let factory = common::factory(
        Arc::clone(&loader),
        Arc::new(FakeTracker::new(&log)),
        Arc::new(FakeRemote::new(&log)),
    );
    let client = factory
        .build(None, secret_descriptor(), &deployment("web", "web.yaml"))
        .await
        .expect("client");

    loader.set_blob(b"v2");
    client.refresh_credentials().await.expect("refresh");

    assert_eq!(loader.calls(), 2);
    assert_eq!(client.credentials().await.expect("fresh").as_slice(), b"v2");
}

#[tokio::test(start_paused = true)]
async fn test_inline_credentials_are_never_reloaded() {
    let log = CallLog::default();
    let loader = Arc::new(FakeLoader::returning(&log, b"inline"));
    let factory = common::factory(
        Arc::clone(&loader),
        Arc::new(FakeTracker::new(&log)),
        Arc::new(FakeRemote::new(&log)),
    );
    let client = factory
        .build(
            None,
            CredentialDescriptor::inline(b"inline".to_vec()),
            &deployment("web", "web.yaml"),
        )
        .await
        .expect("client");

    tokio::time::advance(Duration::from_secs(3600)).await;
    client.refresh_credentials().await.expect("no-op");

    assert_eq!(client.credentials().await.expect("blob").as_slice(), b"inline");
    assert_eq!(loader.calls(), 1);
}
