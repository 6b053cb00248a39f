//! Customer alerts responses.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::Route;

use super::error::{ApiError, ClassifyError, PayloadError};
use super::lenient::ScalarField;
use super::live::Matcher;
use super::types::{AlertDto, AlertsDto, AlertsStatus, RouteStatusDto, ServiceDto};
use super::{Status, each, required};

/// Current status of one route.
#[derive(Debug, Clone)]
pub struct RouteStatus {
    /// Route name as the alerts API gives it, e.g. "Red Line".
    pub name: String,
    /// The schedule's route for `service_id`, when there is one.
    pub route: Option<Arc<Route>>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub service_id: Option<String>,
    pub url: Option<String>,
    /// e.g. "Normal Service", "Planned Work w/Reroute".
    pub status: Option<String>,
    pub status_color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RouteStatuses {
    pub routes: Vec<RouteStatus>,
}

/// A route, station or other service an alert affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactedService {
    /// Short type code, e.g. "R" for a train route.
    pub service_type: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: u64,
    pub headline: Option<String>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub severity_score: Option<u32>,
    pub severity_color: Option<String>,
    /// Severity category, lower-cased (e.g. "normal", "major").
    pub category: Option<String>,
    pub impact: Option<String>,
    pub event_start: Option<NaiveDateTime>,
    pub event_end: Option<NaiveDateTime>,
    /// The end time is not yet known.
    pub tbd: bool,
    pub major: bool,
    pub url: Option<String>,
    pub services: Vec<ImpactedService>,
}

#[derive(Debug, Clone)]
pub struct Alerts {
    pub alerts: Vec<Alert>,
}

fn decode<'a, T: Deserialize<'a>>(root: &'a Value, element: &'static str) -> Result<T, PayloadError> {
    T::deserialize(root).map_err(|err| PayloadError::decode(element, err))
}

pub(super) fn status(root: &Value) -> Result<Status, PayloadError> {
    let status: AlertsStatus = decode(root, "status")?;
    let code = status.error_code.text();
    let message = status.error_message.text();
    // Only an explicit "0" is success; a missing code is an error.
    let error = match code.as_deref() {
        Some("0") => ApiError::normalize(Some("0"), message.as_deref()),
        _ => ApiError::failure(code.as_deref(), message.as_deref()),
    };
    Ok(Status {
        error,
        timestamp: status.time_stamp.timestamp(),
    })
}

pub(super) fn route_status(
    root: &Value,
    matcher: &mut Matcher<'_>,
) -> Result<RouteStatuses, ClassifyError> {
    let dto: RouteStatusDto = decode(root, "CTARoutes")?;
    let routes = each(&dto.route_info, "RouteInfo", |r| {
        let service_id = r.service_id.text();
        let route = match &service_id {
            Some(id) => Some(matcher.route(id)?),
            None => None,
        };
        Ok(RouteStatus {
            name: required(&r.route, "RouteInfo", "Route")?,
            route,
            color: r.route_color_code.text(),
            text_color: r.route_text_color.text(),
            service_id,
            url: r.route_url.text(),
            status: r.route_status.text(),
            status_color: r.route_status_color.text(),
        })
    })?;
    Ok(RouteStatuses { routes })
}

pub(super) fn alerts(root: &Value) -> Result<Alerts, ClassifyError> {
    let dto: AlertsDto = decode(root, "CTAAlerts")?;
    let alerts = each(&dto.alert, "Alert", |a| Ok(alert(a)?))?;
    Ok(Alerts { alerts })
}

fn alert(a: &AlertDto) -> Result<Alert, PayloadError> {
    let services = a
        .impacted_service
        .iter()
        .flat_map(|impacted| impacted.service.iter())
        .map(service)
        .collect();

    Ok(Alert {
        id: required(&a.alert_id, "Alert", "AlertId")?,
        headline: a.headline.text(),
        short_description: a.short_description.text(),
        full_description: a.full_description.text(),
        severity_score: a.severity_score.parse(),
        severity_color: a.severity_color.text(),
        category: a.severity_css.text().map(|c| c.to_lowercase()),
        impact: a.impact.text(),
        event_start: a.event_start.timestamp(),
        event_end: a.event_end.timestamp(),
        tbd: a.tbd.flag(),
        major: a.major_alert.flag(),
        url: a.alert_url.text(),
        services,
    })
}

fn service(s: &ServiceDto) -> ImpactedService {
    ImpactedService {
        service_type: s.service_type.text(),
        description: s.service_type_description.text(),
        name: s.service_name.text(),
        id: s.service_id.text(),
        color: s.service_back_color.text(),
        text_color: s.service_text_color.text(),
        url: s.service_url.text(),
    }
}
