//! Fetcher tests against a mock API server.

use std::time::Duration;

use armory_core::{FetchTier, MetricValue, Population, Region, RegionEndpoints, TrackedEntity};
use armory_fetch::{ClientCredentials, EndpointTable, FetchContext, FetchError, FetchSettings, RetryPolicy};
use armory_providers::profile::parse_profile;
use armory_providers::realm::parse_realm_status;
use armory_providers::{FetcherRegistry, PvpBracket, TierPayload, normalize};
use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THRALL: &str = "/profile/wow/character/stormrage/thrall";

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

fn context(server: &MockServer) -> FetchContext {
    let endpoints = EndpointTable::new().with_override(
        Region::Us,
        RegionEndpoints::custom(server.uri(), format!("{}/oauth/token", server.uri()), "en_US"),
    );
    let settings = FetchSettings::default()
        .with_endpoints(endpoints)
        .with_retry(RetryPolicy::default().with_base_delay(Duration::from_millis(10)));
    FetchContext::new(ClientCredentials::new("client", "secret"), settings).unwrap()
}

fn thrall() -> TrackedEntity {
    TrackedEntity::character("Thrall", "Stormrage", Region::Us)
}

#[tokio::test]
async fn test_profile_falls_back_to_equipment() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(THRALL))
        .and(query_param("namespace", "profile-us"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"level": 80, "money": 50_000})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/equipment")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "equipped_items": [
                {"level": {"value": 610}},
                {"level": {"value": 620}},
                {"slot": {"type": "TABARD"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let payload = FetcherRegistry::get(FetchTier::Basic).fetch(&ctx, &thrall()).await.unwrap();

    let TierPayload::Profile(profile) = payload else {
        panic!("expected profile payload");
    };
    assert_eq!(profile.level, 80);
    assert_eq!(profile.item_level, Some(615));
    assert_eq!(profile.gold, Some(5));
}

#[tokio::test]
async fn test_profile_skips_equipment_when_item_level_present() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(THRALL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"level": 70, "equipped_item_level": 441})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/equipment")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"equipped_items": []})))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let payload = FetcherRegistry::get(FetchTier::Basic).fetch(&ctx, &thrall()).await.unwrap();
    let records = normalize(&payload, &thrall(), Utc::now());

    assert_eq!(records[0].key, "level");
    assert_eq!(records[0].value, MetricValue::Integer(70));
    assert_eq!(records[1].key, "item_level");
    assert_eq!(records[1].value, MetricValue::Integer(441));
}

#[tokio::test]
async fn test_profile_without_equipment_matches_parser() {
    let server = mock_server().await;
    let body = r#"{"level": 80, "achievement_points": 12000, "guild": {"name": "Horde Elite"}}"#;
    Mock::given(method("GET"))
        .and(path(THRALL))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/equipment")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let payload = FetcherRegistry::get(FetchTier::Basic).fetch(&ctx, &thrall()).await.unwrap();

    let expected = parse_profile(body, None).unwrap();
    assert_eq!(expected.item_level, None);
    assert_eq!(payload, TierPayload::Profile(expected));
}

#[tokio::test]
async fn test_pvp_unrated_bracket() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/pvp-summary")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"honor_level": 42})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/pvp-bracket/2v2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rating": 1720,
            "season_match_statistics": {"played": 30, "won": 18, "lost": 12}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/pvp-bracket/3v3")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/pvp-bracket/rbg")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rating": 1900,
            "season_match_statistics": {"won": 4}
        })))
        .mount(&server)
        .await;

    let ctx = context(&server);
    let payload = FetcherRegistry::get(FetchTier::PvP).fetch(&ctx, &thrall()).await.unwrap();

    let TierPayload::Pvp(pvp) = payload else {
        panic!("expected pvp payload");
    };
    assert_eq!(pvp.honor_level, 42);
    assert_eq!(pvp.rating(PvpBracket::Arena2v2), Some(1720));
    assert_eq!(pvp.rating(PvpBracket::Arena3v3), None);
    assert_eq!(pvp.season_wins(), 22);
}

#[tokio::test]
async fn test_pvp_missing_summary_is_not_found() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/pvp-summary")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ctx = context(&server);
    let err = FetcherRegistry::get(FetchTier::PvP).fetch(&ctx, &thrall()).await.unwrap_err();
    assert!(matches!(err, FetchError::NotFound(_)));
}

#[tokio::test]
async fn test_raid_schema_error() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/encounters/raids")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"character": {"name": "Thrall"}})))
        .mount(&server)
        .await;

    let ctx = context(&server);
    let err = FetcherRegistry::get(FetchTier::Raid).fetch(&ctx, &thrall()).await.unwrap_err();
    assert!(matches!(err, FetchError::Schema(_)));
}

#[tokio::test]
async fn test_mythic_plus_requests_latest_season() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/mythic-keystone-profile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "seasons": [{"id": 12}, {"id": 13}],
            "current_mythic_rating": {"rating": 2400.2}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{THRALL}/mythic-keystone-profile/season/13")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let payload = FetcherRegistry::get(FetchTier::MythicPlus).fetch(&ctx, &thrall()).await.unwrap();

    let TierPayload::MythicPlus(summary) = payload else {
        panic!("expected mythic+ payload");
    };
    assert_eq!(summary.season_id, 13);
    assert_eq!(summary.score, 2400);
    assert_eq!(summary.runs_completed, 0);
}

#[tokio::test]
async fn test_realm_status_uses_dynamic_namespace() {
    let server = mock_server().await;
    Mock::given(method("GET"))
        .and(path("/data/wow/realm/argent-dawn"))
        .and(query_param("namespace", "dynamic-us"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3702,
            "timezone": "America/New_York",
            "locale": "enUS"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/wow/connected-realm/3702"))
        .and(query_param("namespace", "dynamic-us"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3702,
            "has_queue": false,
            "status": {"type": "UP", "name": "Up"},
            "population": {"type": "HIGH", "name": "High"}
        })))
        .mount(&server)
        .await;

    let ctx = context(&server);
    let realm = TrackedEntity::realm("Argent Dawn", Region::Us);
    let payload = FetcherRegistry::get(FetchTier::ServerStatus).fetch(&ctx, &realm).await.unwrap();
    let records = normalize(&payload, &realm, Utc::now());

    let population = records.iter().find(|r| r.key == "realm_population").unwrap();
    assert_eq!(population.value, MetricValue::Population(Population::High));
    let online = records.iter().find(|r| r.key == "realm_online").unwrap();
    assert_eq!(online.value, MetricValue::Flag(true));
}

#[tokio::test]
async fn test_realm_fetch_matches_parser() {
    let server = mock_server().await;
    let realm_body = r#"{"id": 60, "connected_realm": {"href": "https://us.api.blizzard.com/data/wow/connected-realm/3683?namespace=dynamic-us"}}"#;
    let connected_body = r#"{"has_queue": true, "status": {"type": "DOWN"}, "population": {"type": "FULL"}}"#;
    Mock::given(method("GET"))
        .and(path("/data/wow/realm/stormrage"))
        .respond_with(ResponseTemplate::new(200).set_body_string(realm_body))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/wow/connected-realm/3683"))
        .respond_with(ResponseTemplate::new(200).set_body_string(connected_body))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server);
    let realm = TrackedEntity::realm("stormrage", Region::Us);
    let payload = FetcherRegistry::get(FetchTier::ServerStatus).fetch(&ctx, &realm).await.unwrap();

    let expected = parse_realm_status(realm_body, connected_body).unwrap();
    assert!(!expected.online);
    assert_eq!(expected.status, "Down");
    assert_eq!(payload, TierPayload::Realm(expected));
}

#[tokio::test]
async fn test_tier_mismatch_is_config_error() {
    let server = mock_server().await;
    let ctx = context(&server);
    let realm = TrackedEntity::realm("stormrage", Region::Us);

    let err = FetcherRegistry::get(FetchTier::Raid).fetch(&ctx, &realm).await.unwrap_err();
    assert!(matches!(err, FetchError::Config(_)));

    let err = FetcherRegistry::get(FetchTier::ServerStatus).fetch(&ctx, &thrall()).await.unwrap_err();
    assert!(matches!(err, FetchError::Config(_)));
}
