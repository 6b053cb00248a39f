//! Bus tracker responses.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Route, Stop, StopId, TripKey};
use crate::overlay::{
    BusDetail, LiveSnapshot, Overlay, Prediction, PredictionFlags, PredictionKind, VehicleDetail,
};
use crate::resolve::VehicleReport;

use super::error::{ApiError, ClassifyError, PayloadError};
use super::lenient::{ScalarField, repeated};
use super::live::Matcher;
use super::types::{
    BulletinDto, BulletinsDto, BusErrorDto, BusPredictionDto, BusPredictionsDto, BusStatus,
    DirectionDto,
    DirectionsDto, PatternDto, PatternPointDto, PatternsDto, RoutesDto, StopsDto, TimeDto,
    VehicleDto, VehiclesDto,
};
use super::{Status, each, position, required, required_time, stop_id};

/// Server time of the bus tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentTime {
    pub time: NaiveDateTime,
}

/// Live buses matched to scheduled trips.
#[derive(Debug, Clone)]
pub struct Vehicles {
    pub vehicles: Vec<Overlay>,
    /// Reports with no matching trip, left out of `vehicles`.
    pub unresolved: Vec<VehicleReport>,
}

/// A route as the bus tracker lists it.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub route: Arc<Route>,
    /// Name the tracker gives the route.
    pub name: Option<String>,
    /// Color the tracker suggests, which the schedule may lack.
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Routes {
    pub routes: Vec<RouteEntry>,
}

/// Directions a route runs in, e.g. "Northbound".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directions {
    pub directions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Stops {
    pub stops: Vec<Arc<Stop>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Stop,
    Waypoint,
}

#[derive(Debug, Clone)]
pub struct PatternPoint {
    pub sequence: u32,
    pub lat: f64,
    pub lon: f64,
    pub kind: PointKind,
    pub stop: Option<Arc<Stop>>,
    /// Feet into the pattern.
    pub distance: Option<f64>,
}

/// The exact path a bus takes, stops and turns included.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: u32,
    /// Total length in feet.
    pub length: Option<f64>,
    pub direction: Option<String>,
    /// Ordered by sequence.
    pub points: Vec<PatternPoint>,
}

#[derive(Debug, Clone)]
pub struct Patterns {
    pub patterns: Vec<Pattern>,
}

/// Bus predictions grouped by vehicle.
#[derive(Debug, Clone)]
pub struct BusPredictions {
    pub vehicles: Vec<Overlay>,
    /// Every prediction of every resolved vehicle.
    pub predictions: Vec<Prediction>,
    pub unresolved: Vec<VehicleReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Something a bulletin applies to. Any field may be absent.
#[derive(Debug, Clone)]
pub struct BulletinService {
    pub route: Option<Arc<Route>>,
    pub direction: Option<String>,
    pub stop: Option<Arc<Stop>>,
    /// The stop's name, or the tracker's name for it when there is no stop id.
    pub stop_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Bulletin {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub detail: Option<String>,
    pub brief: Option<String>,
    pub priority: Option<Priority>,
    pub services: Vec<BulletinService>,
}

#[derive(Debug, Clone)]
pub struct Bulletins {
    pub bulletins: Vec<Bulletin>,
}

fn decode<'a, T: Deserialize<'a>>(root: &'a Value, element: &'static str) -> Result<T, PayloadError> {
    T::deserialize(root).map_err(|err| PayloadError::decode(element, err))
}

pub(super) fn status(root: &Value) -> Result<Status, PayloadError> {
    let status: BusStatus = decode(root, "bustime-response")?;
    // Any `error` element means failure, even one without a message.
    let error = match &status.error {
        Some(error) => {
            let message = repeated(error)
                .into_iter()
                .find_map(|e| BusErrorDto::deserialize(e).ok()?.msg.text());
            ApiError::failure(None, message.as_deref())
        }
        None => ApiError::ok(),
    };
    let time: Option<TimeDto> = decode(root, "bustime-response").ok();
    Ok(Status {
        error,
        timestamp: time.and_then(|t| t.tm.timestamp()),
    })
}

pub(super) fn current_time(root: &Value) -> Result<CurrentTime, ClassifyError> {
    let dto: TimeDto = decode(root, "time")?;
    Ok(CurrentTime {
        time: required_time(&dto.tm, "bustime-response", "tm")?,
    })
}

pub(super) fn vehicles(root: &Value, matcher: &mut Matcher<'_>) -> Result<Vehicles, ClassifyError> {
    let dto: VehiclesDto = decode(root, "vehicles")?;
    let vehicles = each(&dto.vehicle, "vehicle", |v| vehicle(matcher, v))?
        .into_iter()
        .flatten()
        .collect();
    Ok(Vehicles {
        vehicles,
        unresolved: matcher.take_unresolved(),
    })
}

fn vehicle(matcher: &mut Matcher<'_>, v: &VehicleDto) -> Result<Option<Overlay>, ClassifyError> {
    let route_id: String = required(&v.rt, "vehicle", "rt")?;
    let vehicle_id: String = required(&v.vid, "vehicle", "vid")?;
    let reported_at = required_time(&v.tmstmp, "vehicle", "tmstmp")?;
    let delayed = v.dly.flag();

    let report = VehicleReport {
        key: TripKey::Route(route_id.clone()),
        reported_at,
        delayed,
        headsign: v.rtdir.text(),
    };
    let Some(trip) = matcher.trip(report)? else {
        return Ok(None);
    };

    let live = LiveSnapshot {
        position: position(&v.lat, &v.lon, &v.hdg),
        delayed,
        generated_at: reported_at,
        predictions: Vec::new(),
        vehicle: VehicleDetail::Bus(BusDetail {
            vehicle_id,
            route_id,
            direction: v.rtdir.text(),
            destination: v.des.text(),
            pattern_id: v.pid.parse(),
            pattern_distance: v.pdist.parse(),
            speed: v.spd.parse(),
        }),
    };
    Ok(Some(Overlay::attach(trip, live)))
}

pub(super) fn routes(root: &Value, matcher: &mut Matcher<'_>) -> Result<Routes, ClassifyError> {
    let dto: RoutesDto = decode(root, "routes")?;
    let routes = each(&dto.routes, "route", |r| {
        let id: String = required(&r.rt, "route", "rt")?;
        Ok(RouteEntry {
            route: matcher.route(&id)?,
            name: r.rtnm.text(),
            color: r.rtclr.text(),
        })
    })?;
    Ok(Routes { routes })
}

pub(super) fn directions(root: &Value) -> Result<Directions, ClassifyError> {
    let dto: DirectionsDto = decode(root, "directions")?;
    let directions = dto
        .directions
        .iter()
        .filter_map(|d| match d {
            DirectionDto::Object { dir, name, id } => dir.text().or(name.text()).or(id.text()),
            DirectionDto::Bare(s) => s.text(),
        })
        .collect();
    Ok(Directions { directions })
}

pub(super) fn stops(root: &Value, matcher: &mut Matcher<'_>) -> Result<Stops, ClassifyError> {
    let dto: StopsDto = decode(root, "stops")?;
    let stops = each(&dto.stops, "stop", |s| {
        let id: StopId = required(&s.stpid, "stop", "stpid")?;
        Ok(matcher.stop_or_synthesize(id, s.stpnm.text(), s.lat.parse(), s.lon.parse())?)
    })?;
    Ok(Stops { stops })
}

pub(super) fn patterns(root: &Value, matcher: &mut Matcher<'_>) -> Result<Patterns, ClassifyError> {
    let dto: PatternsDto = decode(root, "patterns")?;
    let patterns = each(&dto.ptr, "ptr", |p| pattern(matcher, p))?;
    Ok(Patterns { patterns })
}

fn pattern(matcher: &mut Matcher<'_>, p: &PatternDto) -> Result<Pattern, ClassifyError> {
    let mut points = each(&p.pt, "pt", |pt| point(matcher, pt))?;
    points.sort_by_key(|pt| pt.sequence);
    Ok(Pattern {
        id: required(&p.pid, "ptr", "pid")?,
        length: p.ln.parse(),
        direction: p.rtdir.text(),
        points,
    })
}

fn point(matcher: &mut Matcher<'_>, pt: &PatternPointDto) -> Result<PatternPoint, ClassifyError> {
    let lat = required(&pt.lat, "pt", "lat")?;
    let lon = required(&pt.lon, "pt", "lon")?;
    let kind = match pt.typ.text().as_deref() {
        Some("S") => PointKind::Stop,
        _ => PointKind::Waypoint,
    };
    let stop = match stop_id(&pt.stpid) {
        Some(id) => Some(matcher.stop_or_synthesize(id, pt.stpnm.text(), Some(lat), Some(lon))?),
        None => None,
    };
    Ok(PatternPoint {
        sequence: required(&pt.seq, "pt", "seq")?,
        lat,
        lon,
        kind,
        stop,
        distance: pt.pdist.parse(),
    })
}

/// One `prd` element, parsed but not yet matched.
struct ParsedPrediction {
    vehicle_id: String,
    route_id: String,
    direction: Option<String>,
    destination: Option<String>,
    delayed: bool,
    generated_at: NaiveDateTime,
    prediction: Prediction,
}

fn parse_prediction(p: &BusPredictionDto) -> Result<ParsedPrediction, ClassifyError> {
    let stop: StopId = required(&p.stpid, "prd", "stpid")?;
    let generated_at = required_time(&p.tmstmp, "prd", "tmstmp")?;
    let predicted_at = required_time(&p.prdtm, "prd", "prdtm")?;
    let delayed = p.dly.flag();
    let kind = match p.typ.text().as_deref() {
        Some("D") => PredictionKind::Departure,
        _ => PredictionKind::Arrival,
    };

    let mut prediction = Prediction::new(stop, generated_at, predicted_at)
        .with_kind(kind)
        .with_flags(PredictionFlags {
            delayed,
            ..PredictionFlags::default()
        })
        .with_distance(p.dstp.parse());
    if let Some(name) = p.stpnm.text() {
        prediction = prediction.with_stop_name(name);
    }

    Ok(ParsedPrediction {
        vehicle_id: required(&p.vid, "prd", "vid")?,
        route_id: required(&p.rt, "prd", "rt")?,
        direction: p.rtdir.text(),
        destination: p.des.text(),
        delayed,
        generated_at,
        prediction,
    })
}

pub(super) fn predictions(
    root: &Value,
    matcher: &mut Matcher<'_>,
) -> Result<BusPredictions, ClassifyError> {
    let dto: BusPredictionsDto = decode(root, "predictions")?;
    let parsed = each(&dto.prd, "prd", parse_prediction)?;

    // Group by vehicle, keeping the order vehicles first appear in.
    let mut groups: Vec<Vec<ParsedPrediction>> = Vec::new();
    for p in parsed {
        match groups.iter_mut().find(|g| g[0].vehicle_id == p.vehicle_id) {
            Some(group) => group.push(p),
            None => groups.push(vec![p]),
        }
    }

    let mut vehicles = Vec::with_capacity(groups.len());
    for group in groups {
        let first = &group[0];
        let report = VehicleReport {
            key: TripKey::Route(first.route_id.clone()),
            reported_at: first.generated_at,
            delayed: first.delayed,
            headsign: first.direction.clone(),
        };
        let Some(trip) = matcher.trip(report)? else {
            continue;
        };

        let detail = BusDetail {
            vehicle_id: first.vehicle_id.clone(),
            route_id: first.route_id.clone(),
            direction: first.direction.clone(),
            destination: first.destination.clone(),
            pattern_id: None,
            pattern_distance: None,
            speed: None,
        };
        let generated_at = first.generated_at;
        let delayed = group.iter().any(|p| p.delayed);
        let live = LiveSnapshot {
            position: None,
            delayed,
            generated_at,
            predictions: group.into_iter().map(|p| p.prediction).collect(),
            vehicle: VehicleDetail::Bus(detail),
        };
        vehicles.push(Overlay::attach(trip, live));
    }

    let predictions = vehicles
        .iter()
        .flat_map(|o| o.predictions().iter().cloned())
        .collect();
    Ok(BusPredictions {
        vehicles,
        predictions,
        unresolved: matcher.take_unresolved(),
    })
}

pub(super) fn bulletins(root: &Value, matcher: &mut Matcher<'_>) -> Result<Bulletins, ClassifyError> {
    let dto: BulletinsDto = decode(root, "bulletins")?;
    let bulletins = each(&dto.sb, "sb", |sb| bulletin(matcher, sb))?;
    Ok(Bulletins { bulletins })
}

fn bulletin(matcher: &mut Matcher<'_>, sb: &BulletinDto) -> Result<Bulletin, ClassifyError> {
    let services = each(&sb.srvc, "srvc", |s| {
        let route = match s.rt.text() {
            Some(id) => Some(matcher.route(&id)?),
            None => None,
        };
        let stop = match stop_id(&s.stpid) {
            Some(id) => Some(matcher.stop_or_synthesize(id, s.stpnm.text(), None, None)?),
            None => None,
        };
        let stop_name = match &stop {
            Some(stop) if !stop.name.is_empty() => Some(stop.name.clone()),
            _ => s.stpnm.text(),
        };
        Ok(BulletinService {
            route,
            direction: s.rtdir.text(),
            stop,
            stop_name,
        })
    })?;

    Ok(Bulletin {
        name: sb.nm.text(),
        subject: sb.sbj.text(),
        detail: sb.dtl.text(),
        brief: sb.brf.text(),
        priority: sb.prty.text().as_deref().and_then(Priority::parse),
        services,
    })
}
