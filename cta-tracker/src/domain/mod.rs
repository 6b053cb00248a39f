//! Domain types for the transit tracker.
//!
//! This module contains the schedule entities (routes, trips, stop times,
//! calendars, stops) and the identifiers the live trackers report. All types
//! enforce their invariants at construction time, so code that receives these
//! types can trust their validity.

mod calendar;
mod error;
mod route;
mod run;
mod stop;
mod time;
mod trip;

pub use calendar::{ServiceCalendar, weekday_column};
pub use error::DomainError;
pub use route::{RailLine, Route, RouteKind};
pub use run::RunNumber;
pub use stop::{InvalidStopId, Stop, StopId, StopType, Transfer};
pub use time::{ServiceTime, TimeError, parse_timestamp};
pub use trip::{ScheduledTrip, ShapePoint, StopTimeEntry, TripInfo, TripKey};
