//! Tracker response DTOs.
//!
//! These map onto the JSON the three tracker families send. Every leaf is an
//! optional [`Scalar`] and every repeatable element a [`Many`], because the
//! trackers omit, blank, stringify and un-list fields freely. Interpretation
//! happens in the per-family conversion modules.

use serde::Deserialize;
use serde_json::Value;

use super::lenient::{Many, Scalar};

// Bus tracker: `{"bustime-response": {...}}`

/// Error list present on every bus tracker response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusStatus {
    /// Present, in whatever shape, only when the request failed.
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusErrorDto {
    pub msg: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeDto {
    pub tm: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehiclesDto {
    #[serde(default)]
    pub vehicle: Many<VehicleDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleDto {
    pub vid: Option<Scalar>,
    pub tmstmp: Option<Scalar>,
    pub lat: Option<Scalar>,
    pub lon: Option<Scalar>,
    pub hdg: Option<Scalar>,
    pub pid: Option<Scalar>,
    pub pdist: Option<Scalar>,
    pub rt: Option<Scalar>,
    /// Direction, only on some feeds.
    pub rtdir: Option<Scalar>,
    pub des: Option<Scalar>,
    pub dly: Option<Scalar>,
    pub spd: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutesDto {
    #[serde(default, alias = "route")]
    pub routes: Many<RouteDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteDto {
    pub rt: Option<Scalar>,
    pub rtnm: Option<Scalar>,
    pub rtclr: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsDto {
    #[serde(default, alias = "dir")]
    pub directions: Many<DirectionDto>,
}

/// Older feeds send bare strings, newer ones objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DirectionDto {
    Object {
        dir: Option<Scalar>,
        name: Option<Scalar>,
        id: Option<Scalar>,
    },
    Bare(Scalar),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopsDto {
    #[serde(default, alias = "stop")]
    pub stops: Many<StopDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopDto {
    pub stpid: Option<Scalar>,
    pub stpnm: Option<Scalar>,
    pub lat: Option<Scalar>,
    pub lon: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternsDto {
    #[serde(default)]
    pub ptr: Many<PatternDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternDto {
    pub pid: Option<Scalar>,
    pub ln: Option<Scalar>,
    pub rtdir: Option<Scalar>,
    #[serde(default)]
    pub pt: Many<PatternPointDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternPointDto {
    pub seq: Option<Scalar>,
    pub lat: Option<Scalar>,
    pub lon: Option<Scalar>,
    /// "S" for a stop, "W" for a waypoint.
    pub typ: Option<Scalar>,
    pub stpid: Option<Scalar>,
    pub stpnm: Option<Scalar>,
    pub pdist: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusPredictionsDto {
    #[serde(default)]
    pub prd: Many<BusPredictionDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusPredictionDto {
    pub tmstmp: Option<Scalar>,
    /// "A" for arrival, "D" for departure.
    pub typ: Option<Scalar>,
    pub stpid: Option<Scalar>,
    pub stpnm: Option<Scalar>,
    pub vid: Option<Scalar>,
    pub dstp: Option<Scalar>,
    pub rt: Option<Scalar>,
    pub rtdir: Option<Scalar>,
    pub des: Option<Scalar>,
    pub prdtm: Option<Scalar>,
    pub dly: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulletinsDto {
    #[serde(default)]
    pub sb: Many<BulletinDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulletinDto {
    pub nm: Option<Scalar>,
    pub sbj: Option<Scalar>,
    pub dtl: Option<Scalar>,
    pub brf: Option<Scalar>,
    pub prty: Option<Scalar>,
    #[serde(default)]
    pub srvc: Many<BulletinServiceDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulletinServiceDto {
    pub rt: Option<Scalar>,
    pub rtdir: Option<Scalar>,
    pub stpid: Option<Scalar>,
    pub stpnm: Option<Scalar>,
}

// Train tracker: `{"ctatt": {...}}`, one shape for all three endpoints.

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainStatus {
    pub tmst: Option<Scalar>,
    pub err_cd: Option<Scalar>,
    pub err_nm: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CtattDto {
    #[serde(default)]
    pub eta: Many<EtaDto>,
    #[serde(default)]
    pub position: Many<TrainPositionDto>,
    #[serde(default)]
    pub route: Many<TrainRouteDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaDto {
    pub sta_id: Option<Scalar>,
    pub stp_id: Option<Scalar>,
    pub sta_nm: Option<Scalar>,
    pub rn: Option<Scalar>,
    pub rt: Option<Scalar>,
    pub dest_st: Option<Scalar>,
    pub dest_nm: Option<Scalar>,
    pub tr_dr: Option<Scalar>,
    pub prdt: Option<Scalar>,
    pub arr_t: Option<Scalar>,
    pub is_app: Option<Scalar>,
    pub is_sch: Option<Scalar>,
    pub is_dly: Option<Scalar>,
    pub is_flt: Option<Scalar>,
    pub lat: Option<Scalar>,
    pub lon: Option<Scalar>,
    pub heading: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainPositionDto {
    pub lat: Option<Scalar>,
    pub lon: Option<Scalar>,
    pub heading: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainRouteDto {
    #[serde(rename = "@name", alias = "name")]
    pub name: Option<Scalar>,
    #[serde(default)]
    pub train: Many<TrainDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainDto {
    pub rn: Option<Scalar>,
    pub dest_st: Option<Scalar>,
    pub dest_nm: Option<Scalar>,
    pub tr_dr: Option<Scalar>,
    pub next_sta_id: Option<Scalar>,
    pub next_stp_id: Option<Scalar>,
    pub next_sta_nm: Option<Scalar>,
    pub prdt: Option<Scalar>,
    pub arr_t: Option<Scalar>,
    pub is_app: Option<Scalar>,
    pub is_dly: Option<Scalar>,
    pub lat: Option<Scalar>,
    pub lon: Option<Scalar>,
    pub heading: Option<Scalar>,
}

// Alerts: `{"CTARoutes": {...}}` and `{"CTAAlerts": {...}}`

/// Status fields shared by both alerts endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlertsStatus {
    pub time_stamp: Option<Scalar>,
    /// A scalar or a one-element list.
    pub error_code: Option<Scalar>,
    pub error_message: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteStatusDto {
    #[serde(default)]
    pub route_info: Many<RouteInfoDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteInfoDto {
    pub route: Option<Scalar>,
    pub route_color_code: Option<Scalar>,
    pub route_text_color: Option<Scalar>,
    pub service_id: Option<Scalar>,
    #[serde(rename = "RouteURL")]
    pub route_url: Option<Scalar>,
    pub route_status: Option<Scalar>,
    pub route_status_color: Option<Scalar>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlertsDto {
    #[serde(default)]
    pub alert: Many<AlertDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlertDto {
    pub alert_id: Option<Scalar>,
    pub headline: Option<Scalar>,
    pub short_description: Option<Scalar>,
    pub full_description: Option<Scalar>,
    pub severity_score: Option<Scalar>,
    pub severity_color: Option<Scalar>,
    #[serde(rename = "SeverityCSS")]
    pub severity_css: Option<Scalar>,
    pub impact: Option<Scalar>,
    pub event_start: Option<Scalar>,
    pub event_end: Option<Scalar>,
    #[serde(rename = "TBD")]
    pub tbd: Option<Scalar>,
    pub major_alert: Option<Scalar>,
    #[serde(rename = "AlertURL")]
    pub alert_url: Option<Scalar>,
    #[serde(default)]
    pub impacted_service: Many<ImpactedServiceDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImpactedServiceDto {
    #[serde(default)]
    pub service: Many<ServiceDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDto {
    pub service_type: Option<Scalar>,
    pub service_type_description: Option<Scalar>,
    pub service_name: Option<Scalar>,
    pub service_id: Option<Scalar>,
    pub service_back_color: Option<Scalar>,
    pub service_text_color: Option<Scalar>,
    #[serde(rename = "ServiceURL")]
    pub service_url: Option<Scalar>,
}
