use std::sync::Arc;

use cta_tracker::cache::MokaResponseCache;
use cta_tracker::classify::Classifier;
use cta_tracker::client::{CtaClient, FixtureTransport, PositionsQuery};
use cta_tracker::config::ClientConfig;
use cta_tracker::overlay::VehicleDetail;
use cta_tracker::resolve::Resolver;
use cta_tracker::store::{ScheduleStore, SqliteStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ClientConfig::from_env()?;

    let db = std::env::var("CTA_GTFS_DB").unwrap_or_else(|_| "cta.db".to_string());
    let store: Arc<dyn ScheduleStore> = Arc::new(SqliteStore::open(&db)?);
    info!(%db, "opened schedule");

    // Serve canned payloads instead of calling the trackers.
    let client = match std::env::var("CTA_FIXTURES") {
        Ok(dir) => {
            warn!(%dir, "using fixture payloads");
            let classifier = Classifier::new(Resolver::with_config(store, config.resolver.clone()))
                .with_debug(config.debug);
            CtaClient::from_parts(
                Arc::new(FixtureTransport::load(&dir)?),
                Arc::new(MokaResponseCache::new(&config.cache)),
                classifier,
            )
        }
        Err(_) => CtaClient::new(&config, store)?,
    };

    let response = client.positions(&PositionsQuery::all()).await?;
    let timestamp = response.timestamp();
    let positions = match response.into_body() {
        Ok(body) => body,
        Err(err) => {
            warn!(code = err.code, message = %err.message, "train tracker returned an error");
            return Ok(());
        }
    };

    for route in &positions.routes {
        for train in &route.overlays {
            let live = train.live();
            let VehicleDetail::Train(detail) = &live.vehicle else {
                continue;
            };
            info!(
                line = %detail.line,
                run = %detail.run,
                trip = train.trip().trip_id(),
                direction = detail.direction().unwrap_or("unknown"),
                next_station = detail.next_station_name.as_deref().unwrap_or("unknown"),
                delayed = live.delayed,
                "train"
            );
        }
    }

    info!(
        ?timestamp,
        resolved = positions.trains().count(),
        unresolved = positions.unresolved.len(),
        "positions"
    );
    for report in &positions.unresolved {
        info!(
            key = %report.key.schedule_value(),
            reported_at = %report.reported_at,
            delayed = report.delayed,
            "unresolved"
        );
    }

    Ok(())
}
