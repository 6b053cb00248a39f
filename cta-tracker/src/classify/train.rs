//! Train tracker responses.
//!
//! All three endpoints share one payload shape. Arrivals and follow list
//! `eta` elements, positions list `route` elements holding `train`s. Trains
//! are resolved by run number at the response's server time; the trackers
//! give no headsign the schedule can be matched against.

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{RailLine, RunNumber, TripKey};
use crate::overlay::{
    LiveSnapshot, Overlay, Position, Prediction, PredictionFlags, RouteOverlay, TrainDetail,
    VehicleDetail,
};
use crate::resolve::VehicleReport;
use crate::store::StoreError;

use super::error::{ApiError, ClassifyError, PayloadError};
use super::lenient::{Scalar, ScalarField};
use super::live::Matcher;
use super::types::{CtattDto, EtaDto, TrainDto, TrainStatus};
use super::{Status, each, position, required_time, stop_id};

/// Predicted arrivals at a station, by line.
#[derive(Debug, Clone)]
pub struct Arrivals {
    /// One entry per line, in the order lines first appear.
    pub routes: Vec<RouteOverlay>,
    pub unresolved: Vec<VehicleReport>,
}

impl Arrivals {
    pub fn trains(&self) -> impl Iterator<Item = &Overlay> {
        self.routes.iter().flat_map(|r| r.overlays.iter())
    }

    pub fn predictions(&self) -> impl Iterator<Item = &Prediction> {
        self.routes.iter().flat_map(|r| r.predictions())
    }
}

/// One run followed along its remaining stops.
#[derive(Debug, Clone)]
pub struct Follow {
    /// `None` when the run matched no scheduled trip.
    pub train: Option<Overlay>,
    pub unresolved: Vec<VehicleReport>,
}

impl Follow {
    pub fn predictions(&self) -> &[Prediction] {
        match &self.train {
            Some(train) => train.predictions(),
            None => &[],
        }
    }
}

/// Every train in service on the requested lines.
#[derive(Debug, Clone)]
pub struct Positions {
    pub routes: Vec<RouteOverlay>,
    pub unresolved: Vec<VehicleReport>,
}

impl Positions {
    pub fn trains(&self) -> impl Iterator<Item = &Overlay> {
        self.routes.iter().flat_map(|r| r.overlays.iter())
    }

    pub fn predictions(&self) -> impl Iterator<Item = &Prediction> {
        self.routes.iter().flat_map(|r| r.predictions())
    }
}

/// One train's report, parsed but not yet matched.
struct TrainReport {
    line: RailLine,
    run: RunNumber,
    delayed: bool,
    generated_at: NaiveDateTime,
    position: Option<Position>,
    detail: TrainDetail,
    prediction: Prediction,
}

fn decode<'a, T: Deserialize<'a>>(root: &'a Value) -> Result<T, PayloadError> {
    T::deserialize(root).map_err(|err| PayloadError::decode("ctatt", err))
}

pub(super) fn status(root: &Value) -> Result<Status, PayloadError> {
    let status: TrainStatus = decode(root)?;
    Ok(Status {
        error: ApiError::normalize(status.err_cd.text().as_deref(), status.err_nm.text().as_deref()),
        timestamp: status.tmst.timestamp(),
    })
}

fn rail_line(value: &Option<Scalar>, element: &'static str, field: &'static str) -> Result<RailLine, PayloadError> {
    let text = value
        .text()
        .ok_or(PayloadError::MissingField { element, field })?;
    RailLine::parse(&text).ok_or_else(|| PayloadError::Malformed {
        element,
        field,
        reason: format!("unknown line {text:?}"),
    })
}

fn run_number(value: &Option<Scalar>, element: &'static str) -> Result<RunNumber, PayloadError> {
    let text = value
        .text()
        .ok_or(PayloadError::MissingField { element, field: "rn" })?;
    RunNumber::parse(&text).ok_or_else(|| PayloadError::Malformed {
        element,
        field: "rn",
        reason: format!("not a run number: {text:?}"),
    })
}

fn parse_eta(eta: &EtaDto) -> Result<TrainReport, PayloadError> {
    let line = rail_line(&eta.rt, "eta", "rt")?;
    let run = run_number(&eta.rn, "eta")?;
    let generated_at = required_time(&eta.prdt, "eta", "prdt")?;
    let predicted_at = required_time(&eta.arr_t, "eta", "arrT")?;
    let station = stop_id(&eta.sta_id)
        .or(stop_id(&eta.stp_id))
        .ok_or(PayloadError::MissingField {
            element: "eta",
            field: "staId",
        })?;
    let delayed = eta.is_dly.flag();

    let mut prediction = Prediction::new(station, generated_at, predicted_at).with_flags(
        PredictionFlags {
            approaching: eta.is_app.flag(),
            scheduled: eta.is_sch.flag(),
            fault: eta.is_flt.flag(),
            delayed,
        },
    );
    if let Some(name) = eta.sta_nm.text() {
        prediction = prediction.with_stop_name(name);
    }

    Ok(TrainReport {
        line,
        run,
        delayed,
        generated_at,
        position: position(&eta.lat, &eta.lon, &eta.heading),
        detail: TrainDetail {
            run,
            line,
            destination_stop: stop_id(&eta.dest_st),
            destination_name: eta.dest_nm.text(),
            direction_code: eta.tr_dr.text(),
            next_station: stop_id(&eta.sta_id),
            next_stop: stop_id(&eta.stp_id),
            next_station_name: eta.sta_nm.text(),
        },
        prediction,
    })
}

fn parse_train(line: RailLine, train: &TrainDto) -> Result<TrainReport, PayloadError> {
    let run = run_number(&train.rn, "train")?;
    let generated_at = required_time(&train.prdt, "train", "prdt")?;
    let predicted_at = required_time(&train.arr_t, "train", "arrT")?;
    let next = stop_id(&train.next_sta_id)
        .or(stop_id(&train.next_stp_id))
        .ok_or(PayloadError::MissingField {
            element: "train",
            field: "nextStaId",
        })?;
    let delayed = train.is_dly.flag();

    let mut prediction = Prediction::new(next, generated_at, predicted_at).with_flags(
        PredictionFlags {
            approaching: train.is_app.flag(),
            delayed,
            ..PredictionFlags::default()
        },
    );
    if let Some(name) = train.next_sta_nm.text() {
        prediction = prediction.with_stop_name(name);
    }

    Ok(TrainReport {
        line,
        run,
        delayed,
        generated_at,
        position: position(&train.lat, &train.lon, &train.heading),
        detail: TrainDetail {
            run,
            line,
            destination_stop: stop_id(&train.dest_st),
            destination_name: train.dest_nm.text(),
            direction_code: train.tr_dr.text(),
            next_station: stop_id(&train.next_sta_id),
            next_stop: stop_id(&train.next_stp_id),
            next_station_name: train.next_sta_nm.text(),
        },
        prediction,
    })
}

/// Resolve one run's reports and attach them to its trip.
///
/// The first report supplies the detail and, unless given, the position.
fn attach(
    matcher: &mut Matcher<'_>,
    reports: Vec<TrainReport>,
    timestamp: Option<NaiveDateTime>,
    position: Option<Position>,
) -> Result<Option<Overlay>, StoreError> {
    let Some(first) = reports.first() else {
        return Ok(None);
    };
    let report = VehicleReport {
        key: TripKey::Run(first.run),
        reported_at: timestamp.unwrap_or(first.generated_at),
        delayed: first.delayed,
        headsign: None,
    };
    let Some(trip) = matcher.trip(report)? else {
        return Ok(None);
    };

    let live = LiveSnapshot {
        position: position.or(first.position),
        delayed: reports.iter().any(|r| r.delayed),
        generated_at: first.generated_at,
        vehicle: VehicleDetail::Train(first.detail.clone()),
        predictions: reports.into_iter().map(|r| r.prediction).collect(),
    };
    Ok(Some(Overlay::attach(trip, live)))
}

pub(super) fn arrivals(
    root: &Value,
    matcher: &mut Matcher<'_>,
    timestamp: Option<NaiveDateTime>,
) -> Result<Arrivals, ClassifyError> {
    let dto: CtattDto = decode(root)?;
    let reports = each(&dto.eta, "eta", |eta| Ok(parse_eta(eta)?))?;

    // Line, then run, each in order of first appearance.
    let mut lines: Vec<(RailLine, Vec<Vec<TrainReport>>)> = Vec::new();
    for report in reports {
        let i = match lines.iter().position(|(line, _)| *line == report.line) {
            Some(i) => i,
            None => {
                lines.push((report.line, Vec::new()));
                lines.len() - 1
            }
        };
        let runs = &mut lines[i].1;
        match runs.iter_mut().find(|run| run[0].run == report.run) {
            Some(run) => run.push(report),
            None => runs.push(vec![report]),
        }
    }

    let mut routes = Vec::with_capacity(lines.len());
    for (line, runs) in lines {
        let mut overlays = Vec::with_capacity(runs.len());
        for run in runs {
            if let Some(overlay) = attach(matcher, run, timestamp, None)? {
                overlays.push(overlay);
            }
        }
        routes.push(RouteOverlay::attach_route(matcher.route(line.route_id())?, overlays));
    }

    Ok(Arrivals {
        routes,
        unresolved: matcher.take_unresolved(),
    })
}

pub(super) fn follow(
    root: &Value,
    matcher: &mut Matcher<'_>,
    timestamp: Option<NaiveDateTime>,
) -> Result<Follow, ClassifyError> {
    let dto: CtattDto = decode(root)?;
    let reports = each(&dto.eta, "eta", |eta| Ok(parse_eta(eta)?))?;
    let position = dto
        .position
        .first()
        .and_then(|p| position(&p.lat, &p.lon, &p.heading));

    let train = attach(matcher, reports, timestamp, position)?;
    Ok(Follow {
        train,
        unresolved: matcher.take_unresolved(),
    })
}

pub(super) fn positions(
    root: &Value,
    matcher: &mut Matcher<'_>,
    timestamp: Option<NaiveDateTime>,
) -> Result<Positions, ClassifyError> {
    let dto: CtattDto = decode(root)?;
    let routes = each(&dto.route, "route", |route| {
        let line = rail_line(&route.name, "route", "@name")?;
        let trains = each(&route.train, "train", |t| Ok(parse_train(line, t)?))?;

        let mut overlays = Vec::with_capacity(trains.len());
        for train in trains {
            if let Some(overlay) = attach(matcher, vec![train], timestamp, None)? {
                overlays.push(overlay);
            }
        }
        Ok(RouteOverlay::attach_route(matcher.route(line.route_id())?, overlays))
    })?;

    Ok(Positions {
        routes,
        unresolved: matcher.take_unresolved(),
    })
}
