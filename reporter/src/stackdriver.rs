//! Cloud Monitoring (Stackdriver) v3 REST backend.
//!
//! | Call                        | Request                                                 |
//! |-----------------------------|---------------------------------------------------------|
//! | `get_metric_descriptor`     | `GET  /v3/projects/{project}/metricDescriptors/{type}`  |
//! | `create_metric_descriptor`  | `POST /v3/projects/{project}/metricDescriptors`         |
//! | `create_time_series`        | `POST /v3/projects/{project}/timeSeries`                |
//!
//! Requests carry a bearer token. Any 2xx is success; response bodies are
//! not decoded, since the API omits default-valued fields. HTTP 404 maps to
//! [`BackendError::NotFound`]; other failures keep the status and the
//! backend's error message.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::MetricDescriptor;
use crate::client::{BackendConnector, MetricBackend};
use crate::error::BackendError;
use crate::model::{MonitoredResource, TimePoint, TypedValue};

pub const DEFAULT_ENDPOINT: &str = "https://monitoring.googleapis.com";

/// Connection settings for the REST backend.
#[derive(Debug, Clone)]
pub struct StackdriverConfig {
    /// API root, without the `/v3` suffix.
    pub endpoint: String,
    /// OAuth2 access token with monitoring write scope.
    pub access_token: Option<String>,
    /// Transport-level bound on a single HTTP request.
    pub request_timeout: Duration,
}

impl Default for StackdriverConfig {
    fn default() -> Self {
        Self {
            // MONITORING_ENDPOINT: override for emulators and proxies
            endpoint: std::env::var("MONITORING_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            // GOOGLE_OAUTH_ACCESS_TOKEN: e.g. `gcloud auth print-access-token`
            access_token: std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl StackdriverConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Opens [`StackdriverClient`] handles.
#[derive(Debug, Clone)]
pub struct StackdriverConnector {
    config: StackdriverConfig,
}

impl StackdriverConnector {
    pub fn new(config: StackdriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendConnector for StackdriverConnector {
    async fn open(&self, _project_id: &str) -> Result<Arc<dyn MetricBackend>, BackendError> {
        let client = StackdriverClient::connect(&self.config)?;
        Ok(Arc::new(client))
    }
}

/// REST client for one run.
pub struct StackdriverClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    closed: AtomicBool,
}

impl StackdriverClient {
    pub fn connect(config: &StackdriverConfig) -> Result<Self, BackendError> {
        let access_token = config.access_token.clone().ok_or_else(|| {
            BackendError::Credentials("GOOGLE_OAUTH_ACCESS_TOKEN is not set".to_string())
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: format!("{}/v3", config.endpoint.trim_end_matches('/')),
            access_token,
            closed: AtomicBool::new(false),
        })
    }

    fn project_path(&self, project_id: &str) -> String {
        format!("{}/projects/{}", self.base_url, project_id)
    }

    fn ensure_open(&self) -> Result<(), BackendError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        Ok(())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<reqwest::Response, BackendError> {
        self.ensure_open()?;
        let resp = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(resource.to_string()));
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

#[async_trait]
impl MetricBackend for StackdriverClient {
    fn name(&self) -> &'static str {
        "stackdriver"
    }

    async fn get_metric_descriptor(
        &self,
        project_id: &str,
        metric_type: &str,
    ) -> Result<(), BackendError> {
        // Metric types contain '/', which the API expects unescaped.
        let url = format!(
            "{}/metricDescriptors/{}",
            self.project_path(project_id),
            metric_type
        );
        debug!(%url, "GET metric descriptor");
        self.send(self.http.get(&url), metric_type).await?;
        Ok(())
    }

    async fn create_metric_descriptor(
        &self,
        project_id: &str,
        descriptor: &MetricDescriptor,
    ) -> Result<(), BackendError> {
        let url = format!("{}/metricDescriptors", self.project_path(project_id));
        debug!(%url, metric_type = %descriptor.metric_type, "POST metric descriptor");
        self.send(self.http.post(&url).json(descriptor), &descriptor.metric_type)
            .await?;
        Ok(())
    }

    async fn create_time_series(
        &self,
        project_id: &str,
        points: &[TimePoint],
    ) -> Result<(), BackendError> {
        let url = format!("{}/timeSeries", self.project_path(project_id));
        let body = CreateTimeSeriesRequest::from_points(points);
        debug!(%url, series = body.time_series.len(), "POST time series");
        self.send(self.http.post(&url).json(&body), "timeSeries")
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BackendError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        Ok(())
    }
}

/// Pull `error.message` out of a Google API error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().to_string(),
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTimeSeriesRequest<'a> {
    pub(crate) time_series: Vec<TimeSeries<'a>>,
}

impl<'a> CreateTimeSeriesRequest<'a> {
    pub(crate) fn from_points(points: &'a [TimePoint]) -> Self {
        Self {
            time_series: points.iter().map(TimeSeries::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TimeSeries<'a> {
    metric: Metric<'a>,
    resource: &'a MonitoredResource,
    points: [Point; 1],
}

#[derive(Debug, Serialize)]
struct Metric<'a> {
    #[serde(rename = "type")]
    metric_type: &'a str,
    labels: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct Point {
    interval: Interval,
    value: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Interval {
    end_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Value {
    DoubleValue(f64),
    // int64 travels as a JSON string in the proto3 mapping.
    Int64Value(String),
}

fn rfc3339_seconds(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl<'a> From<&'a TimePoint> for TimeSeries<'a> {
    fn from(point: &'a TimePoint) -> Self {
        let value = match point.value {
            TypedValue::Double(v) => Value::DoubleValue(v),
            TypedValue::Int64(v) => Value::Int64Value(v.to_string()),
        };
        Self {
            metric: Metric {
                metric_type: &point.metric_type,
                labels: &point.labels,
            },
            resource: &point.resource,
            points: [Point {
                interval: Interval {
                    end_time: rfc3339_seconds(point.timestamp),
                },
                value,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::catalog::MetricCatalog;
    use crate::model::{BenchmarkRecord, RunMetadata};
    use crate::timeseries::build_points;

    #[test]
    fn time_series_body_matches_rest_shape() {
        let catalog = MetricCatalog::standard();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap();
        let points = build_points(
            &BenchmarkRecord::new("BenchmarkFoo", 123.4, 56, 2),
            &RunMetadata::new("proj").with_branch("main"),
            &catalog,
            at,
        );
        let json = serde_json::to_value(CreateTimeSeriesRequest::from_points(&points)).unwrap();

        let series = json["timeSeries"].as_array().unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(
            series[0]["metric"]["type"],
            "custom.googleapis.com/benchmark/ns_per_op"
        );
        assert_eq!(series[0]["metric"]["labels"]["branch"], "main");
        assert_eq!(series[0]["resource"]["type"], "global");
        assert_eq!(series[0]["resource"]["labels"]["project_id"], "proj");
        assert_eq!(
            series[0]["points"][0]["interval"]["endTime"],
            "2024-05-01T12:30:15Z"
        );
        assert_eq!(series[0]["points"][0]["value"]["doubleValue"], 123.4);
        assert_eq!(series[1]["points"][0]["value"]["int64Value"], "56");
        assert_eq!(series[2]["points"][0]["value"]["int64Value"], "2");
    }

    #[test]
    fn error_message_prefers_google_envelope() {
        let body = r#"{"error":{"code":400,"message":"Field timeSeries had an invalid value","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "Field timeSeries had an invalid value");
        assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn connect_requires_a_token() {
        let config = StackdriverConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(5),
        };
        assert!(matches!(
            StackdriverClient::connect(&config),
            Err(BackendError::Credentials(_))
        ));
    }
}
