//! Request builders.
//!
//! One query type per tracker operation. Each checks its option combination
//! before producing a [`Request`], so a bad combination never reaches the
//! network.

use chrono::NaiveDate;

use crate::cache::RequestKey;
use crate::classify::Endpoint;
use crate::domain::{RailLine, RunNumber, StopId};

/// Most rail lines a positions request may name.
pub const MAX_POSITION_LINES: usize = RailLine::ALL.len();

/// A query that cannot be sent as given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("exactly one of {0} or {1} is required")]
    ExactlyOne(&'static str, &'static str),

    #[error("at least one of {0} or {1} is required")]
    AtLeastOne(&'static str, &'static str),

    #[error("{0} and {1} cannot be combined")]
    Exclusive(&'static str, &'static str),

    #[error("at most {max} {field} may be given")]
    TooMany { field: &'static str, max: usize },

    #[error("{field} requires exactly one {other}")]
    RequiresOne {
        field: &'static str,
        other: &'static str,
    },

    #[error("invalid {field}: {value:?}")]
    Invalid { field: &'static str, value: String },
}

/// A validated request: the operation plus its query parameters.
///
/// API keys and output format are added by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    endpoint: Endpoint,
    params: Vec<(&'static str, String)>,
}

impl Request {
    fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
        }
    }

    fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    fn param_opt(self, name: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Adds a comma-joined list, or nothing when the list is empty.
    fn list(self, name: &'static str, values: &[String]) -> Self {
        if values.is_empty() {
            self
        } else {
            self.param(name, values.join(","))
        }
    }

    /// The bus tracker's clock.
    pub fn time() -> Self {
        Self::new(Endpoint::Time)
    }

    /// Every bus route.
    pub fn routes() -> Self {
        Self::new(Endpoint::Routes)
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.endpoint, self.params.iter().cloned())
    }
}

/// Builds a [`Request`] after checking the option combination.
pub trait Query {
    fn request(&self) -> Result<Request, ValidationError>;
}

/// Trimmed, de-duplicated, non-blank values in first-seen order.
fn distinct<T: ToString>(values: &[T]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.to_string().trim().to_string();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// "northbound" becomes "Northbound", which is how the bus tracker spells it.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Bus positions by vehicle or by route.
#[derive(Debug, Clone, Default)]
pub struct VehiclesQuery {
    pub vehicles: Vec<String>,
    pub routes: Vec<String>,
}

impl Query for VehiclesQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let vehicles = distinct(&self.vehicles);
        let routes = distinct(&self.routes);
        if vehicles.is_empty() == routes.is_empty() {
            return Err(ValidationError::ExactlyOne("vehicles", "routes"));
        }
        Ok(Request::new(Endpoint::Vehicles)
            .list("vid", &vehicles)
            .list("rt", &routes))
    }
}

/// Directions a bus route runs in.
#[derive(Debug, Clone, Default)]
pub struct DirectionsQuery {
    pub route: Option<String>,
}

impl Query for DirectionsQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let route = non_blank(&self.route).ok_or(ValidationError::Required("route"))?;
        Ok(Request::new(Endpoint::Directions).param("rt", route))
    }
}

/// Stops along one direction of a bus route.
#[derive(Debug, Clone, Default)]
pub struct StopsQuery {
    pub route: Option<String>,
    pub direction: Option<String>,
}

impl Query for StopsQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let route = non_blank(&self.route).ok_or(ValidationError::Required("route"))?;
        let direction =
            non_blank(&self.direction).ok_or(ValidationError::Required("direction"))?;
        Ok(Request::new(Endpoint::Stops)
            .param("rt", route)
            .param("dir", capitalize(&direction)))
    }
}

/// Bus patterns by route or by pattern id.
#[derive(Debug, Clone, Default)]
pub struct PatternsQuery {
    pub route: Option<String>,
    pub patterns: Vec<u32>,
}

impl Query for PatternsQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let route = non_blank(&self.route);
        let patterns = distinct(&self.patterns);
        if route.is_some() == !patterns.is_empty() {
            return Err(ValidationError::ExactlyOne("route", "patterns"));
        }
        Ok(Request::new(Endpoint::Patterns)
            .list("pid", &patterns)
            .param_opt("rt", route))
    }
}

/// Bus predictions for stops or for vehicles.
#[derive(Debug, Clone, Default)]
pub struct BusPredictionsQuery {
    pub stops: Vec<StopId>,
    pub vehicles: Vec<String>,
    /// Narrows stop predictions to these routes.
    pub routes: Vec<String>,
    pub limit: Option<u32>,
}

impl Query for BusPredictionsQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let stops = distinct(&self.stops);
        let vehicles = distinct(&self.vehicles);
        if stops.is_empty() == vehicles.is_empty() {
            return Err(ValidationError::ExactlyOne("stops", "vehicles"));
        }
        Ok(Request::new(Endpoint::Predictions)
            .list("stpid", &stops)
            .list("vid", &vehicles)
            .list("rt", &distinct(&self.routes))
            .param_opt("top", self.limit))
    }
}

/// Service bulletins for routes, a route direction, or stops.
#[derive(Debug, Clone, Default)]
pub struct BulletinsQuery {
    pub routes: Vec<String>,
    pub directions: Vec<String>,
    pub stops: Vec<StopId>,
}

impl Query for BulletinsQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let routes = distinct(&self.routes);
        let directions = distinct(&self.directions);
        let stops = distinct(&self.stops);

        if routes.is_empty() && stops.is_empty() {
            return Err(ValidationError::AtLeastOne("routes", "stop"));
        }
        if directions.len() > 1 {
            return Err(ValidationError::TooMany {
                field: "direction",
                max: 1,
            });
        }
        if !directions.is_empty() && routes.len() != 1 {
            return Err(ValidationError::RequiresOne {
                field: "direction",
                other: "route",
            });
        }
        if (!directions.is_empty() || !routes.is_empty()) && stops.len() > 1 {
            return Err(ValidationError::TooMany {
                field: "stop",
                max: 1,
            });
        }

        Ok(Request::new(Endpoint::ServiceBulletins)
            .list("rt", &routes)
            .list("stpid", &stops)
            .param_opt("rtdir", directions.first().map(|d| capitalize(d))))
    }
}

/// Train arrivals at a platform or station.
#[derive(Debug, Clone, Default)]
pub struct ArrivalsQuery {
    /// Platform ids (30000 range).
    pub stations: Vec<StopId>,
    /// Parent station ids (40000 range).
    pub parent_stations: Vec<StopId>,
    pub route: Option<RailLine>,
    pub limit: Option<u32>,
}

impl Query for ArrivalsQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let stations = distinct(&self.stations);
        let parents = distinct(&self.parent_stations);
        if stations.len() > 1 {
            return Err(ValidationError::TooMany {
                field: "station",
                max: 1,
            });
        }
        if parents.len() > 1 {
            return Err(ValidationError::TooMany {
                field: "parent station",
                max: 1,
            });
        }
        if stations.is_empty() && parents.is_empty() {
            return Err(ValidationError::AtLeastOne("station", "parent station"));
        }

        Ok(Request::new(Endpoint::Arrivals)
            .list("mapid", &parents)
            .list("stpid", &stations)
            .param_opt("max", self.limit)
            .param_opt("rt", self.route.map(|line| line.api_code())))
    }
}

/// Predictions for one train run.
#[derive(Debug, Clone, Default)]
pub struct FollowQuery {
    pub run: Option<String>,
}

impl FollowQuery {
    pub fn run(run: RunNumber) -> Self {
        Self {
            run: Some(run.as_str().to_string()),
        }
    }
}

impl Query for FollowQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let raw = non_blank(&self.run).ok_or(ValidationError::Required("run"))?;
        let run = RunNumber::parse(&raw).ok_or(ValidationError::Invalid {
            field: "run",
            value: raw,
        })?;
        Ok(Request::new(Endpoint::Follow).param("runnumber", run))
    }
}

/// Every train on the given lines.
#[derive(Debug, Clone, Default)]
pub struct PositionsQuery {
    pub lines: Vec<RailLine>,
}

impl PositionsQuery {
    pub fn all() -> Self {
        Self {
            lines: RailLine::ALL.to_vec(),
        }
    }
}

impl Query for PositionsQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let lines: Vec<String> = distinct(
            &self
                .lines
                .iter()
                .map(|line| line.api_code())
                .collect::<Vec<_>>(),
        );
        if lines.is_empty() {
            return Err(ValidationError::Required("rail line"));
        }
        if lines.len() > MAX_POSITION_LINES {
            return Err(ValidationError::TooMany {
                field: "rail lines",
                max: MAX_POSITION_LINES,
            });
        }
        Ok(Request::new(Endpoint::Positions).list("rt", &lines))
    }
}

/// Status of routes, optionally narrowed to a station.
#[derive(Debug, Clone, Default)]
pub struct RouteStatusQuery {
    pub routes: Vec<String>,
    pub stations: Vec<StopId>,
}

impl Query for RouteStatusQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let stations = distinct(&self.stations);
        if stations.len() > 1 {
            return Err(ValidationError::TooMany {
                field: "station",
                max: 1,
            });
        }
        Ok(Request::new(Endpoint::RouteStatus)
            .list("routeid", &distinct(&self.routes))
            .list("stationid", &stations))
    }
}

/// Customer alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertsQuery {
    /// Only alerts in effect now.
    pub active_only: bool,
    /// Include elevator and other accessibility alerts.
    pub accessibility: bool,
    /// Only planned alerts.
    pub planned: bool,
    pub routes: Vec<String>,
    pub stations: Vec<StopId>,
    /// Only alerts from the last this many days.
    pub recent_days: Option<u32>,
    /// Only alerts starting before this date.
    pub before: Option<NaiveDate>,
}

impl Query for AlertsQuery {
    fn request(&self) -> Result<Request, ValidationError> {
        let routes = distinct(&self.routes);
        let stations = distinct(&self.stations);
        if stations.len() > 1 {
            return Err(ValidationError::TooMany {
                field: "station",
                max: 1,
            });
        }
        if !routes.is_empty() && !stations.is_empty() {
            return Err(ValidationError::Exclusive("routes", "station"));
        }
        if self.recent_days.is_some() && self.before.is_some() {
            return Err(ValidationError::Exclusive("recent days", "before"));
        }

        Ok(Request::new(Endpoint::Alerts)
            .param_opt("activeonly", self.active_only.then_some(true))
            .param_opt("accessibility", self.accessibility.then_some(true))
            .param_opt("planned", self.planned.then_some(true))
            .list("stationid", &stations)
            .list("routeid", &routes)
            .param_opt("recentdays", self.recent_days)
            .param_opt("bystartdate", self.before.map(|d| d.format("%Y%m%d"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn vehicles_need_exactly_one_filter() {
        let err = VehiclesQuery::default().request().unwrap_err();
        assert_eq!(err, ValidationError::ExactlyOne("vehicles", "routes"));

        let both = VehiclesQuery {
            vehicles: strings(&["4240"]),
            routes: strings(&["22"]),
        };
        assert!(both.request().is_err());

        let request = VehiclesQuery {
            routes: strings(&["22", "36", "22", " "]),
            ..Default::default()
        }
        .request()
        .unwrap();
        assert_eq!(request.endpoint(), Endpoint::Vehicles);
        assert_eq!(request.params(), &[("rt", "22,36".to_string())]);
    }

    #[test]
    fn directions_and_stops_need_routes() {
        assert_eq!(
            DirectionsQuery { route: Some("  ".into()) }.request().unwrap_err(),
            ValidationError::Required("route")
        );

        let err = StopsQuery {
            route: Some("22".into()),
            direction: None,
        }
        .request()
        .unwrap_err();
        assert_eq!(err, ValidationError::Required("direction"));

        let request = StopsQuery {
            route: Some("22".into()),
            direction: Some("northbound".into()),
        }
        .request()
        .unwrap();
        assert_eq!(
            request.params(),
            &[("rt", "22".to_string()), ("dir", "Northbound".to_string())]
        );
    }

    #[test]
    fn patterns_need_route_or_ids() {
        assert!(PatternsQuery::default().request().is_err());
        assert!(
            PatternsQuery {
                route: Some("22".into()),
                patterns: vec![1200],
            }
            .request()
            .is_err()
        );
        let request = PatternsQuery {
            patterns: vec![1200, 1201],
            ..Default::default()
        }
        .request()
        .unwrap();
        assert_eq!(request.params(), &[("pid", "1200,1201".to_string())]);
    }

    #[test]
    fn predictions_need_stops_or_vehicles() {
        assert_eq!(
            BusPredictionsQuery::default().request().unwrap_err(),
            ValidationError::ExactlyOne("stops", "vehicles")
        );
        let request = BusPredictionsQuery {
            stops: vec![StopId::new(1836)],
            routes: strings(&["22"]),
            limit: Some(3),
            ..Default::default()
        }
        .request()
        .unwrap();
        assert_eq!(
            request.params(),
            &[
                ("stpid", "1836".to_string()),
                ("rt", "22".to_string()),
                ("top", "3".to_string())
            ]
        );
    }

    #[test]
    fn bulletin_combinations() {
        assert_eq!(
            BulletinsQuery::default().request().unwrap_err(),
            ValidationError::AtLeastOne("routes", "stop")
        );

        let two_directions = BulletinsQuery {
            routes: strings(&["22"]),
            directions: strings(&["Northbound", "Southbound"]),
            ..Default::default()
        };
        assert!(matches!(
            two_directions.request(),
            Err(ValidationError::TooMany { field: "direction", .. })
        ));

        let direction_two_routes = BulletinsQuery {
            routes: strings(&["22", "36"]),
            directions: strings(&["Northbound"]),
            ..Default::default()
        };
        assert!(matches!(
            direction_two_routes.request(),
            Err(ValidationError::RequiresOne { field: "direction", .. })
        ));

        let route_and_stops = BulletinsQuery {
            routes: strings(&["22"]),
            stops: vec![StopId::new(1836), StopId::new(1850)],
            ..Default::default()
        };
        assert!(route_and_stops.request().is_err());

        let stops_only = BulletinsQuery {
            stops: vec![StopId::new(1836), StopId::new(1850)],
            ..Default::default()
        };
        assert_eq!(
            stops_only.request().unwrap().params(),
            &[("stpid", "1836,1850".to_string())]
        );
    }

    #[test]
    fn arrivals_need_one_station() {
        assert!(ArrivalsQuery::default().request().is_err());
        assert!(
            ArrivalsQuery {
                stations: vec![StopId::new(30001), StopId::new(30002)],
                ..Default::default()
            }
            .request()
            .is_err()
        );

        let request = ArrivalsQuery {
            parent_stations: vec![StopId::new(40380)],
            route: Some(RailLine::Brown),
            limit: Some(5),
            ..Default::default()
        }
        .request()
        .unwrap();
        assert_eq!(
            request.params(),
            &[
                ("mapid", "40380".to_string()),
                ("max", "5".to_string()),
                ("rt", "brn".to_string())
            ]
        );
    }

    #[test]
    fn follow_needs_a_valid_run() {
        assert_eq!(
            FollowQuery::default().request().unwrap_err(),
            ValidationError::Required("run")
        );
        assert!(matches!(
            FollowQuery { run: Some("12345".into()) }.request(),
            Err(ValidationError::Invalid { field: "run", .. })
        ));
        let request = FollowQuery::run(RunNumber::parse("004").unwrap())
            .request()
            .unwrap();
        assert_eq!(request.params(), &[("runnumber", "004".to_string())]);
    }

    #[test]
    fn positions_line_count() {
        assert_eq!(
            PositionsQuery::default().request().unwrap_err(),
            ValidationError::Required("rail line")
        );
        let request = PositionsQuery::all().request().unwrap();
        assert_eq!(request.params(), &[("rt", "red,blue,brn,g,org,p,pink,y".to_string())]);

        let request = PositionsQuery {
            lines: vec![RailLine::Pink, RailLine::Pink],
        }
        .request()
        .unwrap();
        assert_eq!(request.params(), &[("rt", "pink".to_string())]);
    }

    #[test]
    fn alert_filters() {
        let err = AlertsQuery {
            routes: strings(&["Red"]),
            stations: vec![StopId::new(40380)],
            ..Default::default()
        }
        .request()
        .unwrap_err();
        assert_eq!(err, ValidationError::Exclusive("routes", "station"));

        let err = AlertsQuery {
            recent_days: Some(3),
            before: NaiveDate::from_ymd_opt(2015, 2, 14),
            ..Default::default()
        }
        .request()
        .unwrap_err();
        assert_eq!(err, ValidationError::Exclusive("recent days", "before"));

        let request = AlertsQuery {
            active_only: true,
            routes: strings(&["Red", "8"]),
            before: NaiveDate::from_ymd_opt(2015, 2, 14),
            ..Default::default()
        }
        .request()
        .unwrap();
        assert_eq!(
            request.params(),
            &[
                ("activeonly", "true".to_string()),
                ("routeid", "Red,8".to_string()),
                ("bystartdate", "20150214".to_string())
            ]
        );
    }

    #[test]
    fn route_status_single_station() {
        assert!(
            RouteStatusQuery {
                stations: vec![StopId::new(40380), StopId::new(41320)],
                ..Default::default()
            }
            .request()
            .is_err()
        );
        assert!(RouteStatusQuery::default().request().unwrap().params().is_empty());
    }

    #[test]
    fn keys_ignore_param_order() {
        let a = BusPredictionsQuery {
            stops: vec![StopId::new(1836)],
            routes: strings(&["22"]),
            ..Default::default()
        }
        .request()
        .unwrap();
        let b = Request::new(Endpoint::Predictions)
            .param("rt", "22")
            .param("stpid", "1836");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), Request::time().key());
    }
}
