//! Read-only access to the static schedule.
//!
//! The schedule is loaded elsewhere into a relational store. This module
//! defines the queries the tracker needs from it and a SQLite implementation.

mod error;
mod sqlite;

#[cfg(test)]
pub(crate) mod fixture;

use chrono::NaiveDate;

use crate::domain::{
    Route, ScheduledTrip, ServiceCalendar, ServiceTime, ShapePoint, Stop, StopId, StopTimeEntry,
    Transfer, TripKey,
};

pub use error::StoreError;
pub use sqlite::SqliteStore;

/// Search for trips that could still be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripQuery {
    /// Run number for trains, route id for buses.
    pub key: TripKey,
    /// Service date; the calendar must cover it and its weekday.
    pub date: NaiveDate,
    /// Trips whose last departure is before this are finished.
    pub cutoff: ServiceTime,
    /// Accepted headsigns, already normalized. Empty means no filter.
    pub headsigns: Vec<String>,
}

/// A trip that passed the filters of a [`TripQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTrip {
    pub trip: ScheduledTrip,
    /// Earliest departure at or after the cutoff.
    pub next_departure: ServiceTime,
    /// Latest departure of the whole trip.
    pub last_departure: ServiceTime,
}

/// Query surface over the static schedule.
///
/// Implementations must be safe to share between threads; the schedule is
/// never written through this trait.
pub trait ScheduleStore: Send + Sync {
    /// Trips matching `query`, ordered by next departure then trip id.
    fn active_trips(&self, query: &TripQuery) -> Result<Vec<ActiveTrip>, StoreError>;

    fn route(&self, id: &str) -> Result<Option<Route>, StoreError>;

    fn stop(&self, id: StopId) -> Result<Option<Stop>, StoreError>;

    fn trip(&self, trip_id: &str) -> Result<Option<ScheduledTrip>, StoreError>;

    /// Stop times of a trip in sequence order.
    fn stop_times(&self, trip_id: &str) -> Result<Vec<StopTimeEntry>, StoreError>;

    /// Stops a trip calls at, in sequence order.
    fn trip_stops(&self, trip_id: &str) -> Result<Vec<Stop>, StoreError>;

    /// Every stop served by any trip on the route.
    fn route_stops(&self, route_id: &str) -> Result<Vec<Stop>, StoreError>;

    /// Routes calling at a stop, or at any platform of a parent station.
    fn stop_routes(&self, stop: StopId) -> Result<Vec<Route>, StoreError>;

    fn child_stops(&self, parent: StopId) -> Result<Vec<Stop>, StoreError>;

    fn transfers_from(&self, stop: StopId) -> Result<Vec<Transfer>, StoreError>;

    fn transfers_to(&self, stop: StopId) -> Result<Vec<Transfer>, StoreError>;

    fn calendar(&self, service_id: &str) -> Result<Option<ServiceCalendar>, StoreError>;

    /// Shape points in sequence order.
    fn shape(&self, shape_id: &str) -> Result<Vec<ShapePoint>, StoreError>;
}
