//! Getting payloads from the trackers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::classify::{Endpoint, Family};
use crate::config::ClientConfig;

use super::error::CtaError;
use super::request::Request;

/// Produces the decoded payload for a request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &Request) -> Result<Value, CtaError>;
}

/// Talks to the live trackers over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    bus_key: String,
    train_key: String,
    bus_base_url: String,
    train_base_url: String,
    alerts_base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, CtaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            bus_key: config.bus_key.clone(),
            train_key: config.train_key.clone(),
            bus_base_url: config.bus_base_url.clone(),
            train_base_url: config.train_base_url.clone(),
            alerts_base_url: config.alerts_base_url.clone(),
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        let base = match endpoint.family() {
            Family::Bus => &self.bus_base_url,
            Family::Train => &self.train_base_url,
            Family::Alerts => &self.alerts_base_url,
        };
        format!("{}/{}", base.trim_end_matches('/'), endpoint.path())
    }

    /// Key and output format for the request's family.
    fn auth(&self, endpoint: Endpoint) -> Vec<(&'static str, &str)> {
        match endpoint.family() {
            Family::Bus => vec![("key", self.bus_key.as_str()), ("format", "json")],
            Family::Train => vec![("key", self.train_key.as_str()), ("outputType", "JSON")],
            Family::Alerts => vec![("outputType", "JSON")],
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &Request) -> Result<Value, CtaError> {
        let endpoint = request.endpoint();
        debug!(endpoint = endpoint.name(), params = ?request.params(), "requesting");

        let response = self
            .http
            .get(self.url(endpoint))
            .query(&self.auth(endpoint))
            .query(request.params())
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CtaError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CtaError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| CtaError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

/// Serves payloads from JSON files instead of the trackers.
///
/// Useful for development and testing without tracker keys. Every request
/// for an endpoint gets the same payload, whatever its parameters.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    payloads: HashMap<Endpoint, Value>,
    calls: AtomicUsize,
}

impl FixtureTransport {
    /// Load `{endpoint}.json` files (e.g. `positions.json`) from a directory.
    ///
    /// Endpoints without a file answer with a 404.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CtaError> {
        let dir = dir.as_ref();
        let mut payloads = HashMap::new();

        for endpoint in Endpoint::ALL {
            let path = dir.join(format!("{}.json", endpoint.name()));
            if !path.is_file() {
                continue;
            }
            let body = std::fs::read_to_string(&path).map_err(|source| CtaError::Fixture {
                path: path.clone(),
                source,
            })?;
            let payload = serde_json::from_str(&body).map_err(|e| CtaError::Json {
                message: format!("{}: {e}", path.display()),
                body: None,
            })?;
            payloads.insert(endpoint, payload);
        }

        debug!(dir = %dir.display(), count = payloads.len(), "loaded fixtures");
        Ok(Self {
            payloads,
            calls: AtomicUsize::new(0),
        })
    }

    /// Serve `payload` for `endpoint`.
    pub fn with_payload(mut self, endpoint: Endpoint, payload: Value) -> Self {
        self.payloads.insert(endpoint, payload);
        self
    }

    /// Requests served so far, 404s included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get(&self, request: &Request) -> Result<Value, CtaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let endpoint = request.endpoint();
        self.payloads
            .get(&endpoint)
            .cloned()
            .ok_or_else(|| CtaError::Status {
                status: 404,
                message: format!("no fixture for {endpoint}"),
            })
    }
}

#[cfg(test)]
pub(crate) fn fixture_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/fixtures")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::request::{PositionsQuery, Query};

    #[test]
    fn urls_per_family() {
        let transport = HttpTransport::new(&ClientConfig::new("b", "t")).unwrap();
        assert_eq!(
            transport.url(Endpoint::Vehicles),
            "http://www.ctabustracker.com/bustime/api/v2/getvehicles"
        );
        assert_eq!(
            transport.url(Endpoint::Positions),
            "http://lapi.transitchicago.com/api/1.0/ttpositions.aspx"
        );
        assert_eq!(
            transport.url(Endpoint::Alerts),
            "http://www.transitchicago.com/api/1.0/alerts.aspx"
        );
    }

    #[test]
    fn keys_per_family() {
        let transport = HttpTransport::new(&ClientConfig::new("b", "t")).unwrap();
        assert_eq!(
            transport.auth(Endpoint::Time),
            vec![("key", "b"), ("format", "json")]
        );
        assert_eq!(
            transport.auth(Endpoint::Follow),
            vec![("key", "t"), ("outputType", "JSON")]
        );
        assert_eq!(transport.auth(Endpoint::RouteStatus), vec![("outputType", "JSON")]);
    }

    #[test]
    fn trailing_slash_in_base_url() {
        let config = ClientConfig::new("b", "t").with_train_base_url("http://localhost:9/api/");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url(Endpoint::Arrivals),
            "http://localhost:9/api/ttarrivals.aspx"
        );
    }

    #[tokio::test]
    async fn fixtures_load_by_endpoint_name() {
        let transport = FixtureTransport::load(fixture_dir()).unwrap();
        let request = PositionsQuery::all().request().unwrap();
        let payload = transport.get(&request).await.unwrap();
        assert!(payload.get("ctatt").is_some());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn missing_fixture_is_404() {
        let transport = FixtureTransport::default();
        let err = transport.get(&Request::time()).await.unwrap_err();
        assert!(matches!(err, CtaError::Status { status: 404, .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn missing_directory_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FixtureTransport::load(dir.path().join("absent")).unwrap();
        assert!(transport.payloads.is_empty());
    }

    #[test]
    fn unreadable_fixture_is_a_fixture_error() {
        let dir = tempfile::tempdir().unwrap();
        // Not valid UTF-8, so reading it as text fails.
        std::fs::write(dir.path().join("routes.json"), [0xff, 0xfe, 0x00]).unwrap();
        let err = FixtureTransport::load(dir.path()).unwrap_err();
        let CtaError::Fixture { path, source } = &err else {
            panic!("expected a fixture error, got {err}");
        };
        assert!(path.ends_with("routes.json"));
        assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn payloads_can_be_supplied_directly() {
        let transport = FixtureTransport::default()
            .with_payload(Endpoint::Time, serde_json::json!({"bustime-response": {"tm": "20150214 11:31:13"}}));
        let payload = transport.get(&Request::time()).await.unwrap();
        assert_eq!(payload["bustime-response"]["tm"], "20150214 11:31:13");

        let err = transport.get(&Request::routes()).await.unwrap_err();
        assert!(matches!(err, CtaError::Status { status: 404, .. }));
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn broken_fixture_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("time.json"), "{not json").unwrap();
        let err = FixtureTransport::load(dir.path()).unwrap_err();
        assert!(matches!(err, CtaError::Json { .. }));
    }
}
