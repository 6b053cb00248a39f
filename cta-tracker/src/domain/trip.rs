//! Scheduled trips and their stop times.

use super::error::DomainError;
use super::route::RailLine;
use super::run::RunNumber;
use super::stop::StopId;
use super::time::ServiceTime;

/// Fields every scheduled trip carries, rail or bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripInfo {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    pub direction_id: Option<u8>,
    pub block_id: Option<String>,
    pub shape_id: Option<String>,
    /// Direction or headsign text, e.g. "North" or "Kimball".
    pub direction: Option<String>,
    pub wheelchair_accessible: bool,
    pub schd_trip_id: Option<String>,
}

/// A trip from the timetable.
///
/// Trains are tracked by run, buses by route, so the two variants expose
/// different lookup keys over the same underlying fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledTrip {
    Rail {
        info: TripInfo,
        line: RailLine,
        run: RunNumber,
    },
    Bus {
        info: TripInfo,
    },
}

/// What a live report identifies its vehicle by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TripKey {
    /// A rail run number.
    Run(RunNumber),
    /// A bus route id.
    Route(String),
}

impl TripKey {
    /// The value the schedule is searched by.
    pub fn schedule_value(&self) -> String {
        match self {
            TripKey::Run(run) => run.schedule_key(),
            TripKey::Route(route) => route.clone(),
        }
    }
}

impl ScheduledTrip {
    /// Classify a trip row by its route.
    ///
    /// Trips on a rail line must carry a run in `schd_trip_id`.
    pub fn from_info(info: TripInfo) -> Result<Self, DomainError> {
        let Some(line) = RailLine::from_route_id(&info.route_id) else {
            return Ok(ScheduledTrip::Bus { info });
        };

        let run = info
            .schd_trip_id
            .as_deref()
            .and_then(RunNumber::from_schedule_key)
            .ok_or_else(|| DomainError::MissingRun(info.trip_id.clone()))?;

        Ok(ScheduledTrip::Rail { info, line, run })
    }

    pub fn info(&self) -> &TripInfo {
        match self {
            ScheduledTrip::Rail { info, .. } | ScheduledTrip::Bus { info } => info,
        }
    }

    pub fn trip_id(&self) -> &str {
        &self.info().trip_id
    }

    pub fn route_id(&self) -> &str {
        &self.info().route_id
    }

    pub fn service_id(&self) -> &str {
        &self.info().service_id
    }

    pub fn direction(&self) -> Option<&str> {
        self.info().direction.as_deref()
    }

    pub fn wheelchair_accessible(&self) -> bool {
        self.info().wheelchair_accessible
    }

    pub fn run(&self) -> Option<RunNumber> {
        match self {
            ScheduledTrip::Rail { run, .. } => Some(*run),
            ScheduledTrip::Bus { .. } => None,
        }
    }

    pub fn is_rail(&self) -> bool {
        matches!(self, ScheduledTrip::Rail { .. })
    }

    /// The key a live report for this trip would carry.
    pub fn key(&self) -> TripKey {
        match self {
            ScheduledTrip::Rail { run, .. } => TripKey::Run(*run),
            ScheduledTrip::Bus { info } => TripKey::Route(info.route_id.clone()),
        }
    }
}

/// A trip's scheduled visit to one stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTimeEntry {
    pub trip_id: String,
    pub stop_id: StopId,
    pub sequence: u32,
    pub arrival: ServiceTime,
    pub departure: ServiceTime,
    /// Overrides the trip's headsign from this stop on.
    pub headsign: Option<String>,
    pub pickup_type: Option<u8>,
    pub dist_traveled: Option<f64>,
}

/// One vertex of a trip's drawn path.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePoint {
    pub shape_id: String,
    pub lat: f64,
    pub lon: f64,
    pub sequence: u32,
    pub dist_traveled: Option<f64>,
}
