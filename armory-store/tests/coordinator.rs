//! Coordinator tests against a mock API server.

use std::sync::Arc;
use std::time::Duration;

use armory_core::{CycleOutcome, ErrorKind, FetchTier, MetricValue, Region, RegionEndpoints, TrackedEntity};
use armory_fetch::FetchError;
use armory_store::{FetchConfig, StoreError, TierPhase, TrackerConfig, UpdateCoordinator};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THRALL: &str = "/profile/wow/character/stormrage/thrall";
const JAINA: &str = "/profile/wow/character/stormrage/jaina";

async fn mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-token",
            "token_type": "bearer",
            "expires_in": 86399
        })))
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer) -> TrackerConfig {
    let mut config = TrackerConfig::new(Region::Us, "client", "secret");
    config.fetch = FetchConfig {
        transient_retries: 0,
        base_delay_ms: 10,
        ..FetchConfig::default()
    }
    .with_endpoint(
        Region::Us,
        RegionEndpoints::custom(server.uri(), format!("{}/oauth/token", server.uri()), "en_US"),
    );
    config
}

fn thrall() -> TrackedEntity {
    TrackedEntity::character("Thrall", "Stormrage", Region::Us)
}

fn jaina() -> TrackedEntity {
    TrackedEntity::character("Jaina", "Stormrage", Region::Us)
}

fn profile(level: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"level": level, "equipped_item_level": 600}))
}

async fn mount_profile(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_realm(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/wow/realm/stormrage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 60})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/wow/connected-realm/60"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "has_queue": false,
            "status": {"type": "UP"},
            "population": {"type": "FULL"}
        })))
        .mount(server)
        .await;
}

async fn wait_for_fetching(coordinator: &UpdateCoordinator, tier: FetchTier) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.tier_status(tier).phase != TierPhase::Fetching {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("tier never started fetching");
}

// ============================================================================
// Cycles
// ============================================================================

#[tokio::test]
async fn test_partial_failure_commits_both_entities() -> anyhow::Result<()> {
    let server = mock_server().await;
    mount_profile(&server, THRALL, profile(80)).await;
    mount_profile(&server, JAINA, ResponseTemplate::new(404)).await;

    let coordinator = UpdateCoordinator::new(config(&server).with_entity(thrall()).with_entity(jaina()))?;
    let mut events = coordinator.subscribe();

    let report = coordinator.refresh_now(FetchTier::Basic).await?;
    assert_eq!(report.outcome, CycleOutcome::PartialFailure);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.attempt(&jaina()).unwrap().error, Some(ErrorKind::NotFound));

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.version(), report.version);
    let level = snapshot.metric(&thrall(), FetchTier::Basic, "level").unwrap();
    assert_eq!(level.value, MetricValue::Integer(80));
    assert!(level.is_fresh());

    let missing = snapshot.tier(&jaina(), FetchTier::Basic).unwrap();
    assert!(missing.stale);
    assert_eq!(missing.error, Some(ErrorKind::NotFound));
    assert!(missing.records.is_empty());

    let event = events.try_recv()?;
    assert_eq!(event.tier, FetchTier::Basic);
    assert_eq!(event.outcome, CycleOutcome::PartialFailure);
    assert_eq!(event.version, report.version);

    let status = coordinator.tier_status(FetchTier::Basic);
    assert_eq!(status.phase, TierPhase::Idle);
    assert_eq!(status.last_outcome, Some(CycleOutcome::PartialFailure));
    Ok(())
}

#[tokio::test]
async fn test_failed_cycle_keeps_previous_values_stale() -> anyhow::Result<()> {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(THRALL))
        .respond_with(profile(80))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_profile(&server, THRALL, ResponseTemplate::new(503)).await;

    let coordinator = UpdateCoordinator::new(config(&server).with_entity(thrall()))?;

    let first = coordinator.refresh_now(FetchTier::Basic).await?;
    assert_eq!(first.outcome, CycleOutcome::Success);
    let fetched_at = coordinator
        .snapshot()
        .metric(&thrall(), FetchTier::Basic, "level")
        .unwrap()
        .fetched_at;

    let second = coordinator.refresh_now(FetchTier::Basic).await?;
    assert_eq!(second.outcome, CycleOutcome::Failure);
    assert!(second.version > first.version);

    let snapshot = coordinator.snapshot();
    let level = snapshot.metric(&thrall(), FetchTier::Basic, "level").unwrap();
    assert_eq!(level.value, MetricValue::Integer(80));
    assert!(level.stale);
    assert_eq!(level.error, Some(ErrorKind::Unavailable));
    assert_eq!(level.fetched_at, fetched_at);
    Ok(())
}

#[tokio::test]
async fn test_not_found_entity_is_retried_next_cycle() -> anyhow::Result<()> {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(THRALL))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_profile(&server, THRALL, profile(71)).await;

    let coordinator = UpdateCoordinator::new(config(&server).with_entity(thrall()))?;

    let first = coordinator.refresh_now(FetchTier::Basic).await?;
    assert_eq!(first.outcome, CycleOutcome::Failure);

    let second = coordinator.refresh_now(FetchTier::Basic).await?;
    assert_eq!(second.outcome, CycleOutcome::Success);
    let tier = coordinator.snapshot().tier(&thrall(), FetchTier::Basic).cloned().unwrap();
    assert!(!tier.stale);
    assert_eq!(tier.error, None);
    assert_eq!(tier.metric("level").unwrap().value, MetricValue::Integer(71));
    Ok(())
}

#[tokio::test]
async fn test_server_status_covers_home_realms() -> anyhow::Result<()> {
    let server = mock_server().await;
    mount_realm(&server).await;

    let coordinator = UpdateCoordinator::new(config(&server).with_entity(thrall()))?;
    let report = coordinator.refresh_now(FetchTier::ServerStatus).await?;

    let realm = TrackedEntity::realm("stormrage", Region::Us);
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].entity, realm);

    let snapshot = coordinator.snapshot();
    let online = snapshot.metric(&realm, FetchTier::ServerStatus, "realm_online").unwrap();
    assert_eq!(online.value, MetricValue::Flag(true));
    assert!(snapshot.tier(&thrall(), FetchTier::ServerStatus).is_none());
    Ok(())
}

#[tokio::test]
async fn test_fetch_timeout_is_unavailable() -> anyhow::Result<()> {
    let server = mock_server().await;
    mount_profile(&server, THRALL, profile(80).set_delay(Duration::from_secs(3))).await;

    let mut config = config(&server).with_entity(thrall());
    config.fetch.fetch_timeout_secs = 1;
    let coordinator = UpdateCoordinator::new(config)?;

    let report = coordinator.refresh_now(FetchTier::Basic).await?;
    assert_eq!(report.outcome, CycleOutcome::Failure);
    assert_eq!(report.attempts[0].error, Some(ErrorKind::Unavailable));
    assert!(report.duration < Duration::from_secs(3));
    Ok(())
}

#[tokio::test]
async fn test_concurrency_cap_serializes_fetches() -> anyhow::Result<()> {
    let server = mock_server().await;
    let delayed = profile(80).set_delay(Duration::from_millis(200));
    mount_profile(&server, THRALL, delayed.clone()).await;
    mount_profile(&server, JAINA, delayed.clone()).await;
    mount_profile(&server, "/profile/wow/character/stormrage/varian", delayed).await;

    let mut config = config(&server)
        .with_entity(thrall())
        .with_entity(jaina())
        .with_entity(TrackedEntity::character("Varian", "Stormrage", Region::Us));
    config.fetch.max_concurrency = 1;
    let coordinator = UpdateCoordinator::new(config)?;

    let report = coordinator.refresh_now(FetchTier::Basic).await?;
    assert_eq!(report.outcome, CycleOutcome::Success);
    assert_eq!(report.attempts.len(), 3);
    assert!(report.duration >= Duration::from_millis(600));
    Ok(())
}

#[tokio::test]
async fn test_rejected_token_refreshed_mid_cycle() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    for token in ["tok-1", "tok-2"] {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": token, "expires_in": 86399})))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(THRALL))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(profile(70))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Revoked server-side before its advertised expiry.
    Mock::given(method("GET"))
        .and(path(THRALL))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(THRALL))
        .and(header("authorization", "Bearer tok-2"))
        .respond_with(profile(80))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = UpdateCoordinator::new(config(&server).with_entity(thrall()))?;

    coordinator.refresh_now(FetchTier::Basic).await?;
    let before = coordinator
        .snapshot()
        .metric(&thrall(), FetchTier::Basic, "level")
        .unwrap()
        .fetched_at;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let report = coordinator.refresh_now(FetchTier::Basic).await?;
    assert_eq!(report.outcome, CycleOutcome::Success);

    let level = coordinator.snapshot().metric(&thrall(), FetchTier::Basic, "level").cloned().unwrap();
    assert_eq!(level.value, MetricValue::Integer(80));
    assert!(level.is_fresh());
    assert!(level.fetched_at > before);
    Ok(())
}

#[tokio::test]
async fn test_retry_after_is_honored_within_cycle() -> anyhow::Result<()> {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(THRALL))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "5"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_profile(&server, THRALL, profile(80)).await;

    let coordinator = UpdateCoordinator::new(config(&server).with_entity(thrall()))?;

    // Real clock: a paused clock would auto-advance into the HTTP timeouts
    // while the client waits on the mock server's socket.
    let started = std::time::Instant::now();
    let report = coordinator.refresh_now(FetchTier::Basic).await?;
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(report.duration >= Duration::from_secs(5));
    assert_eq!(report.outcome, CycleOutcome::Success);
    assert!(coordinator.snapshot().metric(&thrall(), FetchTier::Basic, "level").unwrap().is_fresh());
    Ok(())
}

// ============================================================================
// Coalescing and Cancellation
// ============================================================================

#[tokio::test]
async fn test_refresh_during_cycle_is_coalesced() -> anyhow::Result<()> {
    let server = mock_server().await;
    mount_profile(&server, THRALL, profile(80).set_delay(Duration::from_millis(500))).await;

    let coordinator = Arc::new(UpdateCoordinator::new(config(&server).with_entity(thrall()))?);
    let running = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.refresh_now(FetchTier::Basic).await })
    };
    wait_for_fetching(&coordinator, FetchTier::Basic).await;

    assert!(matches!(
        coordinator.refresh_now(FetchTier::Basic).await,
        Err(StoreError::CycleInProgress(FetchTier::Basic))
    ));
    // Other tiers are independent.
    let other = coordinator.refresh_now(FetchTier::ServerStatus).await?;
    assert_eq!(other.tier, FetchTier::ServerStatus);

    let report = running.await??;
    assert_eq!(report.outcome, CycleOutcome::Success);
    Ok(())
}

#[tokio::test]
async fn test_update_config_discards_running_cycle() -> anyhow::Result<()> {
    let server = mock_server().await;
    mount_profile(&server, THRALL, profile(80).set_delay(Duration::from_secs(2))).await;

    let config = config(&server).with_entity(thrall());
    let coordinator = Arc::new(UpdateCoordinator::new(config.clone())?);
    let running = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.refresh_now(FetchTier::Basic).await })
    };
    wait_for_fetching(&coordinator, FetchTier::Basic).await;

    coordinator.update_config(config).await?;

    assert!(matches!(running.await?, Err(StoreError::Cancelled(FetchTier::Basic))));
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.version(), 0);
    assert!(snapshot.is_empty());
    assert_eq!(coordinator.tier_status(FetchTier::Basic).phase, TierPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn test_update_config_prunes_removed_entities() -> anyhow::Result<()> {
    let server = mock_server().await;
    mount_profile(&server, THRALL, profile(80)).await;
    mount_profile(&server, JAINA, profile(70)).await;

    let base = config(&server);
    let coordinator = UpdateCoordinator::new(base.clone().with_entity(thrall()).with_entity(jaina()))?;
    let committed = coordinator.refresh_now(FetchTier::Basic).await?.version;

    coordinator.update_config(base.with_entity(thrall())).await?;

    let snapshot = coordinator.snapshot();
    assert!(snapshot.version() > committed);
    assert!(snapshot.entity(&jaina()).is_none());
    assert!(snapshot.metric(&thrall(), FetchTier::Basic, "level").is_some());
    assert!(!coordinator.entities().contains(&jaina()));
    Ok(())
}

#[tokio::test]
async fn test_update_config_prunes_disabled_tiers() -> anyhow::Result<()> {
    let server = mock_server().await;
    mount_profile(&server, THRALL, profile(80)).await;
    mount_realm(&server).await;

    let base = config(&server).with_entity(thrall());
    let coordinator = UpdateCoordinator::new(base.clone())?;
    coordinator.refresh_now(FetchTier::Basic).await?;
    let committed = coordinator.refresh_now(FetchTier::ServerStatus).await?.version;

    coordinator.update_config(base.with_tiers([FetchTier::Basic])).await?;

    let snapshot = coordinator.snapshot();
    let realm = TrackedEntity::realm("stormrage", Region::Us);
    assert!(snapshot.version() > committed);
    assert!(snapshot.tier(&realm, FetchTier::ServerStatus).is_none());
    assert!(snapshot.entity(&realm).is_none());
    assert!(snapshot.metric(&thrall(), FetchTier::Basic, "level").is_some());
    assert!(matches!(
        coordinator.refresh_now(FetchTier::ServerStatus).await,
        Err(StoreError::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_update_config_rejects_invalid() -> anyhow::Result<()> {
    let server = mock_server().await;
    let coordinator = UpdateCoordinator::new(config(&server).with_entity(thrall()))?;

    let foreign = config(&server).with_entity(TrackedEntity::character("Jaina", "Silvermoon", Region::Eu));
    assert!(matches!(coordinator.update_config(foreign).await, Err(StoreError::Config(_))));
    assert_eq!(coordinator.config().tracked_entities, vec![thrall()]);
    Ok(())
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_start_fires_immediately_and_shuts_down() -> anyhow::Result<()> {
    let server = mock_server().await;
    mount_realm(&server).await;

    let config = config(&server)
        .with_entity(TrackedEntity::realm("stormrage", Region::Us))
        .with_tiers([FetchTier::ServerStatus]);
    let coordinator = UpdateCoordinator::new(config)?;
    let mut events = coordinator.subscribe();

    coordinator.start().await?;
    assert!(coordinator.is_running());
    assert!(matches!(coordinator.start().await, Err(StoreError::AlreadyRunning)));

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await??;
    assert_eq!(event.tier, FetchTier::ServerStatus);
    assert_eq!(event.outcome, CycleOutcome::Success);

    coordinator.shutdown().await?;
    assert!(!coordinator.is_running());
    assert!(matches!(coordinator.shutdown().await, Err(StoreError::NotRunning)));

    // Restart fires again.
    coordinator.start().await?;
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await??;
    assert!(event.version > 1);
    coordinator.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_verify_on_start_reports_auth_failure() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;

    let mut config = config(&server).with_entity(thrall());
    config.verify_on_start = true;
    let coordinator = UpdateCoordinator::new(config)?;

    let err = coordinator.start().await.unwrap_err();
    assert!(matches!(err, StoreError::Fetch(FetchError::Auth(_))));
    assert!(!err.is_transient());
    assert!(!coordinator.is_running());
    Ok(())
}

#[tokio::test]
async fn test_snapshot_read_does_not_fetch() -> anyhow::Result<()> {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .respond_with(profile(80))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = UpdateCoordinator::new(config(&server).with_entity(thrall()))?;
    assert!(coordinator.snapshot().is_empty());
    assert_eq!(coordinator.watch().borrow().version(), 0);
    Ok(())
}
