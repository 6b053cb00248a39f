//! Response classification.
//!
//! Turns a decoded tracker payload into a typed [`Response`]. Each family
//! reports errors its own way; all of them end up as an [`ApiError`] carried in
//! the response rather than raised. Live vehicle reports are resolved to
//! scheduled trips and wrapped in overlays; reports that cannot be resolved are
//! dropped from the live lists and listed separately.

mod alerts;
mod bus;
mod error;
mod lenient;
mod live;
mod train;
mod types;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{StopId, parse_timestamp};
use crate::overlay::{Position, Prediction};
use crate::resolve::Resolver;

pub use alerts::{Alert, Alerts, ImpactedService, RouteStatus, RouteStatuses};
pub use bus::{
    Bulletin, BulletinService, Bulletins, BusPredictions, CurrentTime, Directions, Pattern,
    PatternPoint, Patterns, PointKind, Priority, RouteEntry, Routes, Stops, Vehicles,
};
pub use error::{ApiError, ClassifyError, PayloadError};
pub use lenient::{Many, Scalar, ScalarField, repeated};
pub use train::{Arrivals, Follow, Positions};

use live::Matcher;

/// The three tracker APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Bus tracker: errors as a nested `error` element.
    Bus,
    /// Train tracker: errors as a numeric `errCd`, "0" for success.
    Train,
    /// Customer alerts: `ErrorCode` as a scalar or a one-element list.
    Alerts,
}

/// Every operation the client knows how to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Time,
    Vehicles,
    Routes,
    Directions,
    Stops,
    Patterns,
    Predictions,
    ServiceBulletins,
    Arrivals,
    Follow,
    Positions,
    RouteStatus,
    Alerts,
}

impl Endpoint {
    pub const ALL: [Endpoint; 13] = [
        Endpoint::Time,
        Endpoint::Vehicles,
        Endpoint::Routes,
        Endpoint::Directions,
        Endpoint::Stops,
        Endpoint::Patterns,
        Endpoint::Predictions,
        Endpoint::ServiceBulletins,
        Endpoint::Arrivals,
        Endpoint::Follow,
        Endpoint::Positions,
        Endpoint::RouteStatus,
        Endpoint::Alerts,
    ];

    pub fn family(&self) -> Family {
        match self {
            Endpoint::Time
            | Endpoint::Vehicles
            | Endpoint::Routes
            | Endpoint::Directions
            | Endpoint::Stops
            | Endpoint::Patterns
            | Endpoint::Predictions
            | Endpoint::ServiceBulletins => Family::Bus,
            Endpoint::Arrivals | Endpoint::Follow | Endpoint::Positions => Family::Train,
            Endpoint::RouteStatus | Endpoint::Alerts => Family::Alerts,
        }
    }

    /// Path segment appended to the family's base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Time => "gettime",
            Endpoint::Vehicles => "getvehicles",
            Endpoint::Routes => "getroutes",
            Endpoint::Directions => "getdirections",
            Endpoint::Stops => "getstops",
            Endpoint::Patterns => "getpatterns",
            Endpoint::Predictions => "getpredictions",
            Endpoint::ServiceBulletins => "getservicebulletins",
            Endpoint::Arrivals => "ttarrivals.aspx",
            Endpoint::Follow => "ttfollow.aspx",
            Endpoint::Positions => "ttpositions.aspx",
            Endpoint::RouteStatus => "routes.aspx",
            Endpoint::Alerts => "alerts.aspx",
        }
    }

    /// Short name for logs and fixture files.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Time => "time",
            Endpoint::Vehicles => "vehicles",
            Endpoint::Routes => "routes",
            Endpoint::Directions => "directions",
            Endpoint::Stops => "stops",
            Endpoint::Patterns => "patterns",
            Endpoint::Predictions => "predictions",
            Endpoint::ServiceBulletins => "bulletins",
            Endpoint::Arrivals => "arrivals",
            Endpoint::Follow => "follow",
            Endpoint::Positions => "positions",
            Endpoint::RouteStatus => "route_status",
            Endpoint::Alerts => "alerts",
        }
    }

    /// Accepted names of the payload's root element.
    fn roots(&self) -> &'static [&'static str] {
        match self.family() {
            Family::Bus => &["bustime-response", "bustime_response"],
            Family::Train => &["ctatt"],
            Family::Alerts if *self == Endpoint::RouteStatus => &["CTARoutes"],
            Family::Alerts => &["CTAAlerts"],
        }
    }

    fn root<'a>(&self, payload: &'a Value) -> Result<&'a Value, PayloadError> {
        let roots = self.roots();
        roots
            .iter()
            .find_map(|name| payload.get(name))
            .ok_or(PayloadError::UnexpectedRoot { expected: roots[0] })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What every response carries regardless of outcome.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub endpoint: Endpoint,
    /// Server time, when the family reports one.
    pub timestamp: Option<NaiveDateTime>,
    /// The decoded payload, kept only in debug mode.
    pub payload: Option<Arc<Value>>,
}

/// A classified response: a typed body, or the tracker's own error.
#[derive(Debug, Clone)]
pub struct Response<B = Body> {
    pub meta: ResponseMeta,
    pub result: Result<B, ApiError>,
}

impl<B> Response<B> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// The normalized error; code 0 and "OK" on success.
    pub fn error(&self) -> ApiError {
        match &self.result {
            Ok(_) => ApiError::ok(),
            Err(err) => err.clone(),
        }
    }

    pub fn body(&self) -> Option<&B> {
        self.result.as_ref().ok()
    }

    pub fn into_body(self) -> Result<B, ApiError> {
        self.result
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.meta.timestamp
    }

    pub fn map<C>(self, f: impl FnOnce(B) -> C) -> Response<C> {
        Response {
            meta: self.meta,
            result: self.result.map(f),
        }
    }
}

macro_rules! bodies {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Body of any successful response.
        #[derive(Debug, Clone)]
        pub enum Body {
            $($variant($ty)),*
        }

        $(
            impl From<$ty> for Body {
                fn from(body: $ty) -> Self {
                    Body::$variant(body)
                }
            }
        )*
    };
}

bodies! {
    CurrentTime(CurrentTime),
    Vehicles(Vehicles),
    Routes(Routes),
    Directions(Directions),
    Stops(Stops),
    Patterns(Patterns),
    Predictions(BusPredictions),
    ServiceBulletins(Bulletins),
    Arrivals(Arrivals),
    Follow(Follow),
    Positions(Positions),
    RouteStatus(RouteStatuses),
    Alerts(Alerts),
}

impl Body {
    /// Every prediction the body carries, for bodies that carry any.
    pub fn predictions(&self) -> Vec<Prediction> {
        match self {
            Body::Predictions(b) => b.predictions.clone(),
            Body::Arrivals(b) => b.predictions().cloned().collect(),
            Body::Follow(b) => b.predictions().to_vec(),
            Body::Positions(b) => b.predictions().cloned().collect(),
            _ => Vec::new(),
        }
    }
}

/// Error state and server time read from a payload's root.
pub(crate) struct Status {
    pub error: ApiError,
    pub timestamp: Option<NaiveDateTime>,
}

/// Classifies decoded payloads against the schedule.
#[derive(Clone)]
pub struct Classifier {
    resolver: Resolver,
    debug: bool,
}

impl Classifier {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            debug: false,
        }
    }

    /// Keep the decoded payload on every response.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Classify a payload for any endpoint.
    pub fn classify(&self, endpoint: Endpoint, payload: Arc<Value>) -> Result<Response, ClassifyError> {
        Ok(match endpoint {
            Endpoint::Time => self.current_time(payload)?.map(Body::from),
            Endpoint::Vehicles => self.vehicles(payload)?.map(Body::from),
            Endpoint::Routes => self.routes(payload)?.map(Body::from),
            Endpoint::Directions => self.directions(payload)?.map(Body::from),
            Endpoint::Stops => self.stops(payload)?.map(Body::from),
            Endpoint::Patterns => self.patterns(payload)?.map(Body::from),
            Endpoint::Predictions => self.bus_predictions(payload)?.map(Body::from),
            Endpoint::ServiceBulletins => self.bulletins(payload)?.map(Body::from),
            Endpoint::Arrivals => self.arrivals(payload)?.map(Body::from),
            Endpoint::Follow => self.follow(payload)?.map(Body::from),
            Endpoint::Positions => self.positions(payload)?.map(Body::from),
            Endpoint::RouteStatus => self.route_status(payload)?.map(Body::from),
            Endpoint::Alerts => self.alerts(payload)?.map(Body::from),
        })
    }

    pub fn current_time(&self, payload: Arc<Value>) -> Result<Response<CurrentTime>, ClassifyError> {
        self.respond(Endpoint::Time, payload, |root, _, _| bus::current_time(root))
    }

    pub fn vehicles(&self, payload: Arc<Value>) -> Result<Response<Vehicles>, ClassifyError> {
        self.respond(Endpoint::Vehicles, payload, |root, m, _| bus::vehicles(root, m))
    }

    pub fn routes(&self, payload: Arc<Value>) -> Result<Response<Routes>, ClassifyError> {
        self.respond(Endpoint::Routes, payload, |root, m, _| bus::routes(root, m))
    }

    pub fn directions(&self, payload: Arc<Value>) -> Result<Response<Directions>, ClassifyError> {
        self.respond(Endpoint::Directions, payload, |root, _, _| bus::directions(root))
    }

    pub fn stops(&self, payload: Arc<Value>) -> Result<Response<Stops>, ClassifyError> {
        self.respond(Endpoint::Stops, payload, |root, m, _| bus::stops(root, m))
    }

    pub fn patterns(&self, payload: Arc<Value>) -> Result<Response<Patterns>, ClassifyError> {
        self.respond(Endpoint::Patterns, payload, |root, m, _| bus::patterns(root, m))
    }

    pub fn bus_predictions(
        &self,
        payload: Arc<Value>,
    ) -> Result<Response<BusPredictions>, ClassifyError> {
        self.respond(Endpoint::Predictions, payload, |root, m, _| {
            bus::predictions(root, m)
        })
    }

    pub fn bulletins(&self, payload: Arc<Value>) -> Result<Response<Bulletins>, ClassifyError> {
        self.respond(Endpoint::ServiceBulletins, payload, |root, m, _| {
            bus::bulletins(root, m)
        })
    }

    pub fn arrivals(&self, payload: Arc<Value>) -> Result<Response<Arrivals>, ClassifyError> {
        self.respond(Endpoint::Arrivals, payload, train::arrivals)
    }

    pub fn follow(&self, payload: Arc<Value>) -> Result<Response<Follow>, ClassifyError> {
        self.respond(Endpoint::Follow, payload, train::follow)
    }

    pub fn positions(&self, payload: Arc<Value>) -> Result<Response<Positions>, ClassifyError> {
        self.respond(Endpoint::Positions, payload, train::positions)
    }

    pub fn route_status(
        &self,
        payload: Arc<Value>,
    ) -> Result<Response<RouteStatuses>, ClassifyError> {
        self.respond(Endpoint::RouteStatus, payload, |root, m, _| {
            alerts::route_status(root, m)
        })
    }

    pub fn alerts(&self, payload: Arc<Value>) -> Result<Response<Alerts>, ClassifyError> {
        self.respond(Endpoint::Alerts, payload, |root, _, _| alerts::alerts(root))
    }

    fn respond<B>(
        &self,
        endpoint: Endpoint,
        payload: Arc<Value>,
        build: impl FnOnce(&Value, &mut Matcher<'_>, Option<NaiveDateTime>) -> Result<B, ClassifyError>,
    ) -> Result<Response<B>, ClassifyError> {
        let root = endpoint.root(&payload)?;
        let status = match endpoint.family() {
            Family::Bus => bus::status(root)?,
            Family::Train => train::status(root)?,
            Family::Alerts => alerts::status(root)?,
        };

        let meta = ResponseMeta {
            endpoint,
            timestamp: status.timestamp,
            payload: self.debug.then(|| payload.clone()),
        };

        if !status.error.is_ok() {
            debug!(
                endpoint = endpoint.name(),
                code = status.error.code,
                message = %status.error.message,
                "tracker returned an error"
            );
            return Ok(Response {
                meta,
                result: Err(status.error),
            });
        }

        let mut matcher = Matcher::new(&self.resolver);
        let body = build(root, &mut matcher, status.timestamp)?;
        Ok(Response {
            meta,
            result: Ok(body),
        })
    }
}

/// Convert each element, skipping the malformed ones.
///
/// Store failures still abort the whole response.
pub(crate) fn each<T, U>(
    items: &Many<T>,
    element: &'static str,
    mut convert: impl FnMut(&T) -> Result<U, ClassifyError>,
) -> Result<Vec<U>, ClassifyError> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match convert(item) {
            Ok(value) => out.push(value),
            Err(ClassifyError::Payload(err)) => {
                warn!(element, error = %err, "skipping malformed element");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(out)
}

pub(crate) fn required<T: FromStr>(
    value: &Option<Scalar>,
    element: &'static str,
    field: &'static str,
) -> Result<T, PayloadError> {
    let text = value
        .text()
        .ok_or(PayloadError::MissingField { element, field })?;
    value.parse().ok_or_else(|| PayloadError::Malformed {
        element,
        field,
        reason: format!("unexpected value {text:?}"),
    })
}

pub(crate) fn required_time(
    value: &Option<Scalar>,
    element: &'static str,
    field: &'static str,
) -> Result<NaiveDateTime, PayloadError> {
    let text = value
        .text()
        .ok_or(PayloadError::MissingField { element, field })?;
    parse_timestamp(&text).map_err(|err| PayloadError::Malformed {
        element,
        field,
        reason: err.to_string(),
    })
}

pub(crate) fn stop_id(value: &Option<Scalar>) -> Option<StopId> {
    value.text().and_then(|s| StopId::parse(&s).ok())
}

/// A position when both coordinates are present.
pub(crate) fn position(
    lat: &Option<Scalar>,
    lon: &Option<Scalar>,
    heading: &Option<Scalar>,
) -> Option<Position> {
    Some(Position {
        lat: lat.parse()?,
        lon: lon.parse()?,
        heading: heading.parse(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixture;
    use serde_json::json;

    fn classifier() -> Classifier {
        Classifier::new(Resolver::new(fixture::store()))
    }

    #[test]
    fn endpoint_catalogue() {
        assert_eq!(Endpoint::Vehicles.path(), "getvehicles");
        assert_eq!(Endpoint::Arrivals.path(), "ttarrivals.aspx");
        assert_eq!(Endpoint::Alerts.path(), "alerts.aspx");
        assert_eq!(Endpoint::Follow.family(), Family::Train);
        assert_eq!(Endpoint::RouteStatus.family(), Family::Alerts);
        let bus = Endpoint::ALL
            .iter()
            .filter(|e| e.family() == Family::Bus)
            .count();
        assert_eq!(bus, 8);
    }

    #[test]
    fn wrong_root_is_a_payload_error() {
        let err = classifier()
            .classify(Endpoint::Arrivals, Arc::new(json!({"bustime-response": {}})))
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Payload(PayloadError::UnexpectedRoot { expected: "ctatt" })
        ));

        let err = classifier()
            .classify(Endpoint::RouteStatus, Arc::new(json!({"CTAAlerts": {}})))
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Payload(PayloadError::UnexpectedRoot { expected: "CTARoutes" })
        ));
    }

    #[test]
    fn bus_errors_normalize() {
        let payload = json!({"bustime-response": {"error": [{"msg": "No data found for parameter"}]}});
        let response = classifier()
            .classify(Endpoint::Vehicles, Arc::new(payload))
            .unwrap();
        assert!(!response.is_ok());
        assert_eq!(
            response.error(),
            ApiError {
                code: 1,
                message: "No data found for parameter".into()
            }
        );
        assert_eq!(response.timestamp(), None);
    }

    #[test]
    fn bus_error_without_message_is_still_an_error() {
        for error in [json!({}), json!([{"rt": "99"}]), json!("")] {
            let payload = json!({"bustime-response": {"error": error}});
            let response = classifier()
                .classify(Endpoint::Vehicles, Arc::new(payload))
                .unwrap();
            assert!(!response.is_ok());
            assert_eq!(response.error().code, 1);
            assert_eq!(response.error().message, ApiError::UNSPECIFIED_MESSAGE);
        }

        let payload = json!({"bustime-response": {"error": [{"rt": "99"}, {"msg": "Invalid route"}]}});
        let response = classifier()
            .classify(Endpoint::Vehicles, Arc::new(payload))
            .unwrap();
        assert_eq!(response.error().message, "Invalid route");
    }

    #[test]
    fn train_errors_normalize() {
        let payload = json!({"ctatt": {"tmst": "2015-02-14T12:20:10", "errCd": "101", "errNm": "Invalid API key"}});
        let response = classifier()
            .classify(Endpoint::Positions, Arc::new(payload))
            .unwrap();
        assert_eq!(response.error().code, 101);
        assert_eq!(response.error().message, "Invalid API key");
        assert!(response.timestamp().is_some());
    }

    #[test]
    fn alert_errors_normalize_from_lists() {
        let payload = json!({"CTAAlerts": {
            "TimeStamp": "20150214 12:00",
            "ErrorCode": ["50"],
            "ErrorMessage": [null, "Invalid route identifier"]
        }});
        let response = classifier()
            .classify(Endpoint::Alerts, Arc::new(payload))
            .unwrap();
        assert_eq!(response.error().code, 50);
        assert_eq!(response.error().message, "Invalid route identifier");

        let payload = json!({"CTAAlerts": {"TimeStamp": "20150214 12:00", "ErrorCode": "0", "ErrorMessage": null}});
        let response = classifier()
            .classify(Endpoint::Alerts, Arc::new(payload))
            .unwrap();
        assert!(response.is_ok());
        assert_eq!(response.error(), ApiError::ok());
    }

    #[test]
    fn alerts_without_error_code_are_errors() {
        let payload = json!({"CTAAlerts": {"TimeStamp": "20150214 12:00", "Alert": ""}});
        let response = classifier()
            .classify(Endpoint::Alerts, Arc::new(payload))
            .unwrap();
        assert!(!response.is_ok());
        assert_eq!(response.error().code, 1);

        let payload = json!({"CTARoutes": {"TimeStamp": "20150214 12:00", "ErrorCode": [], "ErrorMessage": "Bad station"}});
        let response = classifier()
            .classify(Endpoint::RouteStatus, Arc::new(payload))
            .unwrap();
        assert!(!response.is_ok());
        assert_eq!(response.error().message, "Bad station");
    }

    #[test]
    fn debug_keeps_payload() {
        let payload = Arc::new(json!({"bustime-response": {"tm": "20150214 11:31:13"}}));

        let response = classifier().classify(Endpoint::Time, payload.clone()).unwrap();
        assert!(response.meta.payload.is_none());

        let response = classifier()
            .with_debug(true)
            .classify(Endpoint::Time, payload.clone())
            .unwrap();
        let kept = response.meta.payload.unwrap();
        assert!(Arc::ptr_eq(&kept, &payload));
    }

    #[test]
    fn classify_dispatches_by_endpoint() {
        let payload = Arc::new(json!({"bustime-response": {"tm": "20150214 11:31:13"}}));
        let response = classifier().classify(Endpoint::Time, payload).unwrap();
        assert!(matches!(response.body(), Some(Body::CurrentTime(_))));
        assert_eq!(response.meta.endpoint, Endpoint::Time);
    }
}
