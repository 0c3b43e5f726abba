//! Integration tests for the committed snapshot.

use armory_core::{
    CycleOutcome, EntityUpdate, ErrorKind, FetchTier, MetricRecord, MetricUnit, MetricValue, Region, Snapshot,
    TrackedEntity,
};
use chrono::{Duration, TimeZone, Utc};

fn int(entity: &TrackedEntity, key: &str, value: i64, unit: MetricUnit, at: chrono::DateTime<Utc>) -> MetricRecord {
    MetricRecord::new(key, MetricValue::Integer(value), Some(unit), entity.key(), at)
}

#[test]
fn test_cycles_across_tiers_and_entities() {
    let thrall = TrackedEntity::character("Thrall", "Stormrage", Region::Eu);
    let jaina = TrackedEntity::character("Jaina", "Stormrage", Region::Eu);
    let t0 = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();
    let t1 = t0 + Duration::minutes(1);

    let mut snapshot = Snapshot::new();
    snapshot.apply_tier(
        FetchTier::Basic,
        vec![
            (thrall.clone(), EntityUpdate::Fresh(vec![int(&thrall, "level", 80, MetricUnit::Level, t0)])),
            (jaina.clone(), EntityUpdate::Fresh(vec![int(&jaina, "level", 78, MetricUnit::Level, t0)])),
        ],
        t0,
    );
    snapshot.apply_tier(
        FetchTier::PvP,
        vec![(
            thrall.clone(),
            EntityUpdate::Fresh(vec![int(&thrall, "pvp_3v3_rating", 2100, MetricUnit::Rating, t0)]),
        )],
        t0,
    );

    // Second Basic cycle: Thrall fails, Jaina levels up.
    snapshot.apply_tier(
        FetchTier::Basic,
        vec![
            (thrall.clone(), EntityUpdate::Failed(ErrorKind::RateLimitExceeded)),
            (jaina.clone(), EntityUpdate::Fresh(vec![int(&jaina, "level", 79, MetricUnit::Level, t1)])),
        ],
        t1,
    );

    assert_eq!(snapshot.version(), 3);
    assert_eq!(snapshot.updated_at(), Some(t1));

    let metrics = snapshot.metrics_for(&thrall);
    assert_eq!(metrics.keys().copied().collect::<Vec<_>>(), vec!["level", "pvp_3v3_rating"]);
    assert!(metrics["level"].stale);
    assert_eq!(metrics["level"].error, Some(ErrorKind::RateLimitExceeded));
    assert_eq!(metrics["level"].fetched_at, t0);
    assert!(metrics["pvp_3v3_rating"].is_fresh());

    let basic = snapshot.tier(&thrall, FetchTier::Basic).unwrap();
    assert_eq!(basic.last_success, Some(t0));
    assert_eq!(basic.last_attempt, t1);

    let jaina_level = snapshot.metric(&jaina, FetchTier::Basic, "level").unwrap();
    assert_eq!(jaina_level.value, MetricValue::Integer(79));
    assert!(jaina_level.is_fresh());

    assert_eq!(snapshot.retain_entities(|e| e == &jaina), 1);
    assert_eq!(snapshot.entities().collect::<Vec<_>>(), vec![&jaina]);
    assert_eq!(snapshot.version(), 4);
}

#[test]
fn test_outcome_labels() {
    assert_eq!(CycleOutcome::from_counts(3, 1), CycleOutcome::PartialFailure);
    assert_eq!(CycleOutcome::PartialFailure.to_string(), "partial failure");
    assert_eq!(serde_json::to_string(&CycleOutcome::Failure).unwrap(), "\"failure\"");
}
