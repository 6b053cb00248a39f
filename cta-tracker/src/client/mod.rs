//! Tracker client.
//!
//! A request goes through validation, then the cache, then the transport on a
//! miss; the payload is classified against the schedule on the way out.

mod error;
mod request;
mod transport;

use std::sync::Arc;

use futures::FutureExt;

use crate::cache::{MokaResponseCache, Payload, ResponseCache};
use crate::classify::{
    Alerts, Arrivals, Bulletins, BusPredictions, Classifier, CurrentTime, Directions, Follow,
    Patterns, Positions, Response, RouteStatuses, Routes, Stops, Vehicles,
};
use crate::config::ClientConfig;
use crate::domain::{Stop, StopType};
use crate::resolve::Resolver;
use crate::store::ScheduleStore;

pub use error::CtaError;
pub use request::{
    AlertsQuery, ArrivalsQuery, BulletinsQuery, BusPredictionsQuery, DirectionsQuery, FollowQuery,
    MAX_POSITION_LINES, PatternsQuery, PositionsQuery, Query, Request, RouteStatusQuery,
    StopsQuery, ValidationError, VehiclesQuery,
};
pub use transport::{FixtureTransport, HttpTransport, Transport};

/// Client for the bus, train and alerts trackers.
#[derive(Clone)]
pub struct CtaClient {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    classifier: Classifier,
}

impl CtaClient {
    /// HTTP transport and a moka cache, both from `config`.
    pub fn new(config: &ClientConfig, store: Arc<dyn ScheduleStore>) -> Result<Self, CtaError> {
        let transport = HttpTransport::new(config)?;
        let cache = MokaResponseCache::new(&config.cache);
        let classifier = Classifier::new(Resolver::with_config(store, config.resolver.clone()))
            .with_debug(config.debug);
        Ok(Self::from_parts(Arc::new(transport), Arc::new(cache), classifier))
    }

    /// Assemble a client from its collaborators.
    pub fn from_parts(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn ResponseCache>,
        classifier: Classifier,
    ) -> Self {
        Self {
            transport,
            cache,
            classifier,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    async fn payload(&self, request: &Request) -> Result<Payload, CtaError> {
        let transport = &self.transport;
        let producer =
            async move { Ok::<_, CtaError>(Arc::new(transport.get(request).await?)) }.boxed();
        self.cache.fetch(request.key(), producer).await
    }

    /// Send any validated request and classify the answer.
    pub async fn send(&self, request: &Request) -> Result<Response, CtaError> {
        let payload = self.payload(request).await?;
        Ok(self.classifier.classify(request.endpoint(), payload)?)
    }

    /// The bus tracker's clock.
    pub async fn time(&self) -> Result<Response<CurrentTime>, CtaError> {
        let payload = self.payload(&Request::time()).await?;
        Ok(self.classifier.current_time(payload)?)
    }

    pub async fn vehicles(&self, query: &VehiclesQuery) -> Result<Response<Vehicles>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.vehicles(payload)?)
    }

    pub async fn routes(&self) -> Result<Response<Routes>, CtaError> {
        let payload = self.payload(&Request::routes()).await?;
        Ok(self.classifier.routes(payload)?)
    }

    pub async fn directions(
        &self,
        query: &DirectionsQuery,
    ) -> Result<Response<Directions>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.directions(payload)?)
    }

    pub async fn stops(&self, query: &StopsQuery) -> Result<Response<Stops>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.stops(payload)?)
    }

    pub async fn patterns(&self, query: &PatternsQuery) -> Result<Response<Patterns>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.patterns(payload)?)
    }

    pub async fn bus_predictions(
        &self,
        query: &BusPredictionsQuery,
    ) -> Result<Response<BusPredictions>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.bus_predictions(payload)?)
    }

    pub async fn bulletins(&self, query: &BulletinsQuery) -> Result<Response<Bulletins>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.bulletins(payload)?)
    }

    pub async fn arrivals(&self, query: &ArrivalsQuery) -> Result<Response<Arrivals>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.arrivals(payload)?)
    }

    pub async fn follow(&self, query: &FollowQuery) -> Result<Response<Follow>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.follow(payload)?)
    }

    pub async fn positions(&self, query: &PositionsQuery) -> Result<Response<Positions>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.positions(payload)?)
    }

    pub async fn route_status(
        &self,
        query: &RouteStatusQuery,
    ) -> Result<Response<RouteStatuses>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.route_status(payload)?)
    }

    pub async fn alerts(&self, query: &AlertsQuery) -> Result<Response<Alerts>, CtaError> {
        let payload = self.payload(&query.request()?).await?;
        Ok(self.classifier.alerts(payload)?)
    }

    /// Predictions for a stop, asked of whichever tracker serves it.
    ///
    /// Bus stops get bus predictions; platforms and parent stations get train
    /// arrivals.
    pub async fn stop_predictions(
        &self,
        stop: &Stop,
        limit: Option<u32>,
    ) -> Result<Response, CtaError> {
        let request = match stop.stop_type() {
            StopType::Bus => BusPredictionsQuery {
                stops: vec![stop.id],
                limit,
                ..Default::default()
            }
            .request()?,
            StopType::Rail => ArrivalsQuery {
                stations: vec![stop.id],
                limit,
                ..Default::default()
            }
            .request()?,
            StopType::ParentStation => ArrivalsQuery {
                parent_stations: vec![stop.id],
                limit,
                ..Default::default()
            }
            .request()?,
        };
        self.send(&request).await
    }
}
