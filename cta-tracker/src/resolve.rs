//! Trip resolution.
//!
//! The trackers never report which scheduled trip a vehicle is running, only
//! its run (trains) or route (buses) plus a timestamp. This module finds the
//! scheduled trip that best explains a live report.
//!
//! A trip is a candidate when its calendar covers the report's date and
//! weekday, its headsign agrees with any hint, and its last departure is at
//! or after a cutoff. The candidate with the earliest next departure wins.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::domain::{ScheduledTrip, ServiceTime, TripKey};
use crate::store::{ScheduleStore, StoreError, TripQuery};

/// Headsign spellings the trackers and the schedule disagree on.
///
/// Both sides are in normalized form.
const HEADSIGN_ALIASES: &[(&str, &str)] = &[
    ("95th/dan ryan", "95th"),
    ("o'hare", "o'hare airport"),
    ("harlem/lake", "harlem"),
    ("54th/cermak", "cermak-54th"),
    ("ashland/63rd", "ashland"),
    ("cottage grove", "east 63rd-cottage grove"),
    ("linden", "wilmette"),
    ("skokie", "dempster-skokie"),
];

/// A live report as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VehicleReport {
    pub key: TripKey,
    pub reported_at: NaiveDateTime,
    pub delayed: bool,
    /// Destination or direction text, if the tracker gave one.
    pub headsign: Option<String>,
}

/// Normalize headsign or direction text for comparison.
///
/// Trims, case-folds, collapses whitespace and drops a trailing "bound"
/// ("Northbound" and "O'Hare-bound" become "north" and "o'hare").
pub fn normalize_headsign(s: &str) -> String {
    let folded = s
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match folded.strip_suffix("bound") {
        Some(rest) => rest.trim_end_matches(['-', ' ']).to_string(),
        None => folded,
    }
}

/// Every normalized headsign a hint should match, aliases included.
///
/// Empty when the hint has no content.
pub fn headsign_candidates(hint: &str) -> Vec<String> {
    let normalized = normalize_headsign(hint);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut out = vec![normalized.clone()];
    for &(a, b) in HEADSIGN_ALIASES {
        let other = if normalized == a {
            b
        } else if normalized == b {
            a
        } else {
            continue;
        };
        if !out.iter().any(|c| c == other) {
            out.push(other.to_string());
        }
    }
    out
}

/// The time of day trips must still be running at.
///
/// Undelayed reports use their own time of day. Delayed reports shift it by the
/// configured amount, wrapping at midnight: a late-evening delayed report gets
/// an early-morning cutoff and so sees most of the day's trips again.
pub fn cutoff(reported_at: NaiveDateTime, delayed: bool, config: &ResolverConfig) -> ServiceTime {
    let base = ServiceTime::from_time(reported_at.time());
    if delayed {
        base.shift_clock(config.delay_shift())
    } else {
        base
    }
}

/// Finds the scheduled trip behind a live report.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn ScheduleStore>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    pub fn with_config(store: Arc<dyn ScheduleStore>, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn ScheduleStore> {
        &self.store
    }

    /// Resolve one report. `Ok(None)` means no trip qualifies.
    ///
    /// The service date is the report's calendar date.
    pub fn resolve(
        &self,
        key: &TripKey,
        reported_at: NaiveDateTime,
        delayed: bool,
        headsign: Option<&str>,
    ) -> Result<Option<Arc<ScheduledTrip>>, StoreError> {
        let query = TripQuery {
            key: key.clone(),
            date: reported_at.date(),
            cutoff: cutoff(reported_at, delayed, &self.config),
            headsigns: headsign.map(headsign_candidates).unwrap_or_default(),
        };

        let mut candidates = self.store.active_trips(&query)?;

        // Stores are asked to filter and order, but the choice must not depend on it.
        candidates.retain(|c| c.last_departure >= query.cutoff);
        candidates.sort_by(|a, b| {
            a.next_departure
                .cmp(&b.next_departure)
                .then_with(|| a.trip.trip_id().cmp(b.trip.trip_id()))
        });

        let chosen = candidates.into_iter().next().map(|c| Arc::new(c.trip));
        debug!(
            key = %query.key.schedule_value(),
            date = %query.date,
            cutoff = %query.cutoff,
            found = chosen.as_ref().map(|t| t.trip_id()).unwrap_or("-"),
            "resolved trip"
        );
        Ok(chosen)
    }

    /// Resolve a report, retrying once as delayed if the first attempt finds nothing.
    ///
    /// A report already flagged as delayed is only tried once.
    pub fn resolve_report(
        &self,
        report: &VehicleReport,
    ) -> Result<Option<Arc<ScheduledTrip>>, StoreError> {
        let hint = report.headsign.as_deref();
        let first = self.resolve(&report.key, report.reported_at, report.delayed, hint)?;
        if first.is_some() || report.delayed {
            return Ok(first);
        }

        debug!(
            key = %report.key.schedule_value(),
            "no trip found, retrying as delayed"
        );
        self.resolve(&report.key, report.reported_at, true, hint)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;

    use crate::domain::RunNumber;
    use crate::store::fixture;

    proptest! {
        /// Dates outside every calendar in the fixture never resolve.
        #[test]
        fn no_covering_calendar_not_found(
            days in 0i64..1500,
            secs in 0u32..86_400,
            delayed in any::<bool>(),
            run in prop::sample::select(vec!["301", "217"]),
        ) {
            let date = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap() + chrono::Duration::days(days);
            let t = date.and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap());
            let r = Resolver::new(fixture::store());
            let key = TripKey::Run(RunNumber::parse(run).unwrap());
            prop_assert!(r.resolve(&key, t, delayed, None).unwrap().is_none());
        }

        /// Normalizing twice changes nothing.
        #[test]
        fn normalize_idempotent(s in "[ A-Za-z/'-]{0,30}") {
            prop_assume!(!s.to_lowercase().contains("bound"));
            let once = normalize_headsign(&s);
            prop_assert_eq!(normalize_headsign(&once), once.clone());
        }

        /// The normalized hint is always the first candidate.
        #[test]
        fn hint_is_first_candidate(s in "[A-Za-z]{1,12}(bound)?") {
            prop_assume!(!normalize_headsign(&s).is_empty());
            let candidates = headsign_candidates(&s);
            prop_assert_eq!(candidates.first(), Some(&normalize_headsign(&s)));
        }

        /// Delayed cutoffs are the configured shift after undelayed ones, on the clock.
        #[test]
        fn delayed_cutoff_offset(secs in 0u32..86_400) {
            let t = fixture::date().and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap());
            let config = ResolverConfig::default();
            let plain = cutoff(t, false, &config);
            let shifted = cutoff(t, true, &config);
            prop_assert_eq!(shifted.as_secs(), (plain.as_secs() + 270 * 60) % 86_400);
        }

        /// After 19:30 a delayed retry finds run 301 even though its trips are over.
        #[test]
        fn late_delayed_retry_rescues(secs in (19 * 3600 + 31 * 60)..86_400u32) {
            let t = fixture::date().and_time(NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap());
            let r = Resolver::new(fixture::store());
            let report = VehicleReport {
                key: TripKey::Run(RunNumber::parse("301").unwrap()),
                reported_at: t,
                delayed: false,
                headsign: None,
            };
            prop_assert!(r.resolve(&report.key, t, false, None).unwrap().is_none());
            let trip = r.resolve_report(&report).unwrap();
            prop_assert_eq!(trip.map(|t| t.trip_id().to_string()), Some("P301A".to_string()));
        }
    }
}
