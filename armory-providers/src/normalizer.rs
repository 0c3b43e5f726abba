//! Payload normalization.
//!
//! Maps a [`TierPayload`] to a flat, deterministic list of
//! [`MetricRecord`]s. Pure: no I/O, no clock reads.

use armory_core::{MetricRecord, MetricUnit, MetricValue, TrackedEntity};
use chrono::{DateTime, Utc};

use crate::mythic_plus::MythicPlusSummary;
use crate::profile::ProfileSummary;
use crate::pvp::{PvpBracket, PvpSummary};
use crate::raid::RaidProgress;
use crate::realm::RealmStatus;
use crate::resource::TierPayload;

/// Normalizes one payload into metric records stamped with `fetched_at`.
///
/// The same payload always yields the same keys in the same order. Optional
/// fields that are absent produce no record.
pub fn normalize(payload: &TierPayload, entity: &TrackedEntity, fetched_at: DateTime<Utc>) -> Vec<MetricRecord> {
    let mut out = Records::new(entity.key(), fetched_at);
    match payload {
        TierPayload::Profile(p) => profile(&mut out, p),
        TierPayload::Pvp(p) => pvp(&mut out, p),
        TierPayload::Raid(r) => raid(&mut out, r),
        TierPayload::MythicPlus(m) => mythic_plus(&mut out, m),
        TierPayload::Realm(r) => realm(&mut out, r),
    }
    out.records
}

struct Records {
    entity: String,
    fetched_at: DateTime<Utc>,
    records: Vec<MetricRecord>,
}

impl Records {
    fn new(entity: String, fetched_at: DateTime<Utc>) -> Self {
        Self {
            entity,
            fetched_at,
            records: Vec::new(),
        }
    }

    fn push(&mut self, key: &str, value: MetricValue, unit: Option<MetricUnit>) {
        self.records
            .push(MetricRecord::new(key, value, unit, self.entity.as_str(), self.fetched_at));
    }

    fn int(&mut self, key: &str, value: i64, unit: MetricUnit) {
        self.push(key, MetricValue::Integer(value), Some(unit));
    }

    fn opt_int(&mut self, key: &str, value: Option<i64>, unit: MetricUnit) {
        if let Some(value) = value {
            self.int(key, value, unit);
        }
    }

    fn opt_text(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(key, MetricValue::Text(value.to_string()), None);
        }
    }

    fn flag(&mut self, key: &str, value: bool) {
        self.push(key, MetricValue::Flag(value), None);
    }
}

fn profile(out: &mut Records, p: &ProfileSummary) {
    out.int("level", p.level, MetricUnit::Level);
    out.opt_int("item_level", p.item_level, MetricUnit::ItemLevel);
    out.opt_int("achievement_points", p.achievement_points, MetricUnit::Points);
    out.opt_int("gold", p.gold, MetricUnit::Gold);
    out.opt_text("guild", p.guild.as_deref());
    out.opt_text("character_class", p.character_class.as_deref());
    out.opt_text("race", p.race.as_deref());
    out.opt_text("faction", p.faction.as_deref());
    out.opt_text("active_spec", p.active_spec.as_deref());
    if let Some(at) = p.last_login {
        out.push("last_login", MetricValue::Timestamp(at), None);
    }
}

fn pvp(out: &mut Records, p: &PvpSummary) {
    // Unrated brackets report 0.
    for bracket in PvpBracket::all() {
        out.int(bracket.metric_key(), p.rating(*bracket).unwrap_or(0), MetricUnit::Rating);
    }
    out.int("honor_level", p.honor_level, MetricUnit::Level);
    out.int("pvp_wins_season", p.season_wins(), MetricUnit::Wins);
}

fn raid(out: &mut Records, r: &RaidProgress) {
    out.int("raid_progress_lfr", r.lfr, MetricUnit::Bosses);
    out.int("raid_progress_normal", r.normal, MetricUnit::Bosses);
    out.int("raid_progress_heroic", r.heroic, MetricUnit::Bosses);
    out.int("raid_progress_mythic", r.mythic, MetricUnit::Bosses);
    out.int("raid_kills_total", r.total_kills, MetricUnit::Kills);
}

fn mythic_plus(out: &mut Records, m: &MythicPlusSummary) {
    out.int("mythic_plus_score", m.score, MetricUnit::Score);
    out.int("mythic_plus_best_run", m.best_run, MetricUnit::Level);
    out.int("mythic_plus_runs_completed", m.runs_completed, MetricUnit::Runs);
    out.int("mythic_plus_runs_timed", m.runs_timed, MetricUnit::Runs);
    out.int("mythic_plus_weekly_best", m.weekly_best, MetricUnit::Level);
}

fn realm(out: &mut Records, r: &RealmStatus) {
    out.flag("realm_online", r.online);
    out.push("realm_status", MetricValue::Text(r.status.clone()), None);
    if let Some(population) = r.population {
        out.push("realm_population", MetricValue::Population(population), None);
    }
    out.flag("realm_has_queue", r.has_queue);
    out.opt_text("realm_timezone", r.timezone.as_deref());
    out.opt_text("realm_locale", r.locale.as_deref());
}
