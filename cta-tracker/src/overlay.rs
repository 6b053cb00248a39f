//! Live state laid over scheduled trips.
//!
//! Schedule entities are shared and immutable. Live data (where a vehicle is,
//! what it predicts) lives in a [`LiveSnapshot`] owned by an [`Overlay`] that
//! only holds a reference to its trip.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::{RailLine, Route, RunNumber, ScheduledTrip, StopId};

/// A reported vehicle position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Compass heading in degrees, if reported.
    pub heading: Option<u16>,
}

/// Whether a prediction is for arriving at or departing from its stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionKind {
    #[default]
    Arrival,
    Departure,
}

/// Status flags attached to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PredictionFlags {
    /// The vehicle is about to arrive.
    pub approaching: bool,
    /// Based on the schedule because the vehicle has not yet departed.
    pub scheduled: bool,
    /// The tracker flagged a fault with this prediction.
    pub fault: bool,
    pub delayed: bool,
}

/// One predicted arrival or departure at a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub stop_id: StopId,
    pub stop_name: Option<String>,
    pub generated_at: NaiveDateTime,
    pub predicted_at: NaiveDateTime,
    pub kind: PredictionKind,
    pub flags: PredictionFlags,
    /// Distance still to travel to the stop, in feet (buses only).
    pub distance_to_stop: Option<u32>,
    seconds: i64,
    minutes: i64,
}

impl Prediction {
    /// Build a prediction; the time-until values are fixed here.
    pub fn new(stop_id: StopId, generated_at: NaiveDateTime, predicted_at: NaiveDateTime) -> Self {
        let seconds = (predicted_at - generated_at).num_seconds();
        Self {
            stop_id,
            stop_name: None,
            generated_at,
            predicted_at,
            kind: PredictionKind::default(),
            flags: PredictionFlags::default(),
            distance_to_stop: None,
            seconds,
            minutes: ceil_minutes(seconds),
        }
    }

    pub fn with_stop_name(mut self, name: impl Into<String>) -> Self {
        self.stop_name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: PredictionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_flags(mut self, flags: PredictionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_distance(mut self, feet: Option<u32>) -> Self {
        self.distance_to_stop = feet;
        self
    }

    /// Seconds from generation to the predicted time.
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Whole minutes until the predicted time, rounded up.
    pub fn minutes(&self) -> i64 {
        self.minutes
    }
}

/// Seconds to minutes, rounding towards positive infinity.
pub fn ceil_minutes(seconds: i64) -> i64 {
    (seconds + 59).div_euclid(60)
}

/// Bus-specific live fields.
#[derive(Debug, Clone, PartialEq)]
pub struct BusDetail {
    pub vehicle_id: String,
    pub route_id: String,
    /// Direction as reported, e.g. "Northbound".
    pub direction: Option<String>,
    pub destination: Option<String>,
    pub pattern_id: Option<u32>,
    /// Feet travelled along the pattern.
    pub pattern_distance: Option<u32>,
    /// Miles per hour.
    pub speed: Option<u32>,
}

/// Train-specific live fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainDetail {
    pub run: RunNumber,
    pub line: RailLine,
    pub destination_stop: Option<StopId>,
    pub destination_name: Option<String>,
    /// Tracker direction code ("1" or "5").
    pub direction_code: Option<String>,
    pub next_station: Option<StopId>,
    pub next_stop: Option<StopId>,
    pub next_station_name: Option<String>,
}

impl TrainDetail {
    /// Human-readable direction for the line, e.g. "O'Hare-bound".
    pub fn direction(&self) -> Option<&'static str> {
        self.direction_code
            .as_deref()
            .and_then(|code| self.line.direction(code))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VehicleDetail {
    Bus(BusDetail),
    Train(TrainDetail),
}

/// Everything the trackers said about one vehicle in one response.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    pub position: Option<Position>,
    pub delayed: bool,
    pub generated_at: NaiveDateTime,
    /// In the order the tracker listed them.
    pub predictions: Vec<Prediction>,
    pub vehicle: VehicleDetail,
}

/// A scheduled trip with live data attached.
#[derive(Debug, Clone)]
pub struct Overlay {
    trip: Arc<ScheduledTrip>,
    live: LiveSnapshot,
}

impl Overlay {
    /// Attach a snapshot to a trip. The trip is shared, not copied.
    pub fn attach(trip: Arc<ScheduledTrip>, live: LiveSnapshot) -> Self {
        Self { trip, live }
    }

    /// Replace the whole snapshot, returning the old one.
    pub fn reattach(&mut self, live: LiveSnapshot) -> LiveSnapshot {
        std::mem::replace(&mut self.live, live)
    }

    pub fn trip(&self) -> &Arc<ScheduledTrip> {
        &self.trip
    }

    pub fn live(&self) -> &LiveSnapshot {
        &self.live
    }

    pub fn position(&self) -> Option<Position> {
        self.live.position
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.live.predictions
    }

    pub fn into_live(self) -> LiveSnapshot {
        self.live
    }
}

/// All overlays on one route from a single response.
#[derive(Debug, Clone)]
pub struct RouteOverlay {
    pub route: Arc<Route>,
    pub overlays: Vec<Overlay>,
}

impl RouteOverlay {
    pub fn attach_route(route: Arc<Route>, overlays: Vec<Overlay>) -> Self {
        Self { route, overlays }
    }

    /// Predictions of every vehicle on the route.
    pub fn predictions(&self) -> impl Iterator<Item = &Prediction> {
        self.overlays.iter().flat_map(|o| o.predictions().iter())
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TripInfo;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 2, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn trip() -> Arc<ScheduledTrip> {
        let info = TripInfo {
            route_id: "Pink".into(),
            service_id: "SAT".into(),
            trip_id: "P301A".into(),
            direction_id: Some(1),
            block_id: None,
            shape_id: None,
            direction: Some("Loop".into()),
            wheelchair_accessible: true,
            schd_trip_id: Some("R301".into()),
        };
        Arc::new(ScheduledTrip::from_info(info).unwrap())
    }

    fn snapshot(generated: NaiveDateTime, predicted: &[NaiveDateTime]) -> LiveSnapshot {
        LiveSnapshot {
            position: Some(Position {
                lat: 41.85,
                lon: -87.7,
                heading: Some(89),
            }),
            delayed: false,
            generated_at: generated,
            predictions: predicted
                .iter()
                .map(|&p| Prediction::new(StopId::new(30141), generated, p))
                .collect(),
            vehicle: VehicleDetail::Train(TrainDetail {
                run: RunNumber::parse("301").unwrap(),
                line: RailLine::Pink,
                destination_stop: Some(StopId::new(30114)),
                destination_name: Some("54th/Cermak".into()),
                direction_code: Some("5".into()),
                next_station: Some(StopId::new(41160)),
                next_stop: Some(StopId::new(30141)),
                next_station_name: Some("Clinton".into()),
            }),
        }
    }

    #[test]
    fn minutes_round_up() {
        let p = Prediction::new(StopId::new(1), at(12, 20, 10), at(12, 25, 0));
        assert_eq!(p.seconds(), 290);
        assert_eq!(p.minutes(), 5);

        let p = Prediction::new(StopId::new(1), at(12, 20, 0), at(12, 23, 0));
        assert_eq!(p.seconds(), 180);
        assert_eq!(p.minutes(), 3);

        let p = Prediction::new(StopId::new(1), at(12, 20, 0), at(12, 20, 1));
        assert_eq!(p.minutes(), 1);
    }

    #[test]
    fn past_predictions_are_negative() {
        let p = Prediction::new(StopId::new(1), at(12, 20, 0), at(12, 18, 30));
        assert_eq!(p.seconds(), -90);
        assert_eq!(p.minutes(), -1);
    }

    #[test]
    fn attach_shares_trip() {
        let trip = trip();
        let overlay = Overlay::attach(trip.clone(), snapshot(at(12, 20, 0), &[at(12, 23, 0)]));
        assert!(Arc::ptr_eq(overlay.trip(), &trip));
        assert_eq!(overlay.trip().trip_id(), "P301A");
        assert_eq!(overlay.predictions().len(), 1);
        assert_eq!(overlay.position().and_then(|p| p.heading), Some(89));
    }

    #[test]
    fn reattach_replaces_whole_snapshot() {
        let mut overlay = Overlay::attach(
            trip(),
            snapshot(at(12, 20, 0), &[at(12, 23, 0), at(12, 30, 0)]),
        );

        let mut next = snapshot(at(12, 21, 0), &[at(12, 24, 0)]);
        next.position = None;
        let old = overlay.reattach(next);

        assert_eq!(old.predictions.len(), 2);
        assert_eq!(overlay.predictions().len(), 1);
        // Nothing from the old snapshot survives.
        assert_eq!(overlay.position(), None);
        assert_eq!(overlay.live().generated_at, at(12, 21, 0));
    }

    #[test]
    fn identical_inputs_give_identical_predictions() {
        let a = Overlay::attach(trip(), snapshot(at(12, 20, 0), &[at(12, 23, 30)]));
        let b = Overlay::attach(trip(), snapshot(at(12, 20, 0), &[at(12, 23, 30)]));
        let pa = &a.predictions()[0];
        let pb = &b.predictions()[0];
        assert_eq!((pa.seconds(), pa.minutes()), (pb.seconds(), pb.minutes()));
        assert_eq!(pa.minutes(), 4);
    }

    #[test]
    fn train_direction_from_line() {
        let live = snapshot(at(12, 20, 0), &[]);
        let VehicleDetail::Train(detail) = &live.vehicle else {
            panic!("expected a train");
        };
        assert_eq!(detail.direction(), Some("54th/Cermak-bound"));
    }

    #[test]
    fn route_overlay_collects_predictions() {
        let overlays = vec![
            Overlay::attach(trip(), snapshot(at(12, 20, 0), &[at(12, 23, 0)])),
            Overlay::attach(trip(), snapshot(at(12, 20, 0), &[at(12, 25, 0), at(12, 27, 0)])),
        ];
        let route = RouteOverlay::attach_route(Arc::new(Route::from(RailLine::Pink)), overlays);
        assert_eq!(route.len(), 2);
        assert_eq!(route.predictions().count(), 3);
        assert_eq!(route.route.id, "Pink");
    }
}
