//! Per-response lookups shared by the live-data conversions.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::domain::{RailLine, Route, ScheduledTrip, Stop, StopId};
use crate::resolve::{Resolver, VehicleReport};
use crate::store::StoreError;

/// Resolves reports and looks up schedule entities for one response.
///
/// Each distinct report is resolved once; routes and stops are fetched once.
/// Reports that stay unresolved after the delayed retry are collected so the
/// response can expose them.
pub(crate) struct Matcher<'a> {
    resolver: &'a Resolver,
    trips: HashMap<VehicleReport, Option<Arc<ScheduledTrip>>>,
    routes: HashMap<String, Arc<Route>>,
    stops: HashMap<StopId, Option<Arc<Stop>>>,
    unresolved: Vec<VehicleReport>,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(resolver: &'a Resolver) -> Self {
        Self {
            resolver,
            trips: HashMap::new(),
            routes: HashMap::new(),
            stops: HashMap::new(),
            unresolved: Vec::new(),
        }
    }

    pub(crate) fn trip(
        &mut self,
        report: VehicleReport,
    ) -> Result<Option<Arc<ScheduledTrip>>, StoreError> {
        if let Some(known) = self.trips.get(&report) {
            return Ok(known.clone());
        }

        let found = self.resolver.resolve_report(&report)?;
        if found.is_none() {
            warn!(
                key = %report.key.schedule_value(),
                reported_at = %report.reported_at,
                delayed = report.delayed,
                "no scheduled trip for live report, dropping it"
            );
            self.unresolved.push(report.clone());
        }
        self.trips.insert(report, found.clone());
        Ok(found)
    }

    /// The schedule's route, or a stand-in when the schedule lacks it.
    pub(crate) fn route(&mut self, id: &str) -> Result<Arc<Route>, StoreError> {
        if let Some(route) = self.routes.get(id) {
            return Ok(route.clone());
        }
        let route = match self.resolver.store().route(id)? {
            Some(route) => route,
            None => RailLine::from_route_id(id).map_or_else(|| Route::bare(id), Route::from),
        };
        let route = Arc::new(route);
        self.routes.insert(id.to_string(), route.clone());
        Ok(route)
    }

    pub(crate) fn stop(&mut self, id: StopId) -> Result<Option<Arc<Stop>>, StoreError> {
        if let Some(stop) = self.stops.get(&id) {
            return Ok(stop.clone());
        }
        let stop = self.resolver.store().stop(id)?.map(Arc::new);
        self.stops.insert(id, stop.clone());
        Ok(stop)
    }

    /// The schedule's stop, or one built from what the tracker said about it.
    pub(crate) fn stop_or_synthesize(
        &mut self,
        id: StopId,
        name: Option<String>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Arc<Stop>, StoreError> {
        if let Some(stop) = self.stop(id)? {
            return Ok(stop);
        }
        let stop = Arc::new(Stop::synthesized(
            id,
            name.unwrap_or_default(),
            lat.unwrap_or_default(),
            lon.unwrap_or_default(),
        ));
        self.stops.insert(id, Some(stop.clone()));
        Ok(stop)
    }

    pub(crate) fn take_unresolved(&mut self) -> Vec<VehicleReport> {
        std::mem::take(&mut self.unresolved)
    }
}
