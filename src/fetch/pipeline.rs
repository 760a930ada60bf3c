use crossbeam_channel::{unbounded, Receiver, Sender};

use super::request::{FeatureInfoRequest, LegendRequest, MapRequest, QueryPairs};
use crate::core::config::ServiceConfig;
use crate::core::constants::NO_FEATURES_MESSAGE;
use crate::prelude::Arc;
use crate::{MapError, Result};
use once_cell::sync::Lazy;

/// Shared async HTTP client for all service requests. Per-request timeouts
/// come from `ServiceConfig`; this one only caps requests built elsewhere.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("mapterm/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .build()
        .expect("failed to build reqwest async client")
});

/// Completion of one spawned request
#[derive(Debug)]
pub enum FetchEvent {
    Map {
        sequence: u64,
        result: Result<Vec<u8>>,
    },
    FeatureInfo {
        sequence: u64,
        result: Result<String>,
    },
    Legend {
        result: Result<Vec<u8>>,
    },
}

impl FetchEvent {
    pub fn label(&self) -> &'static str {
        match self {
            FetchEvent::Map { .. } => "map",
            FetchEvent::FeatureInfo { .. } => "feature info",
            FetchEvent::Legend { .. } => "legend",
        }
    }
}

/// Issues one-shot asynchronous requests against the map service.
///
/// Requests never block the caller. Each finished request is delivered as a
/// [`FetchEvent`] on an internal channel that the owner drains with
/// [`FetchPipeline::try_recv_events`]. Map and feature requests are numbered
/// so that late answers to superseded requests can be recognised.
pub struct FetchPipeline {
    service: Arc<ServiceConfig>,
    event_tx: Sender<FetchEvent>,
    event_rx: Receiver<FetchEvent>,
    map_sequence: u64,
    feature_sequence: u64,
    in_flight: usize,
}

impl FetchPipeline {
    pub fn new(service: ServiceConfig) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            service: Arc::new(service),
            event_tx,
            event_rx,
            map_sequence: 0,
            feature_sequence: 0,
            in_flight: 0,
        }
    }

    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    /// Starts a GetMap request and returns its sequence number. Invalid
    /// requests fail here and nothing is sent.
    pub fn request_map(&mut self, request: MapRequest) -> Result<u64> {
        request.validate()?;
        self.map_sequence += 1;
        let sequence = self.map_sequence;
        let pairs = request.query_pairs(&self.service);

        log::debug!(
            "GetMap #{} layers={} bbox={} size={}x{}",
            sequence,
            request.selection.layers,
            request.bbox.to_bbox_param(),
            request.width,
            request.height
        );

        self.spawn(pairs, move |result| FetchEvent::Map {
            sequence,
            result: result.and_then(reject_service_exception),
        })?;
        Ok(sequence)
    }

    /// Starts a GetFeatureInfo request and returns its sequence number
    pub fn request_feature_info(&mut self, request: FeatureInfoRequest) -> Result<u64> {
        request.validate()?;
        self.feature_sequence += 1;
        let sequence = self.feature_sequence;
        let pairs = request.query_pairs(&self.service);

        log::debug!(
            "GetFeatureInfo #{} layers={} at ({}, {})",
            sequence,
            request.map.selection.layers,
            request.x,
            request.y
        );

        self.spawn(pairs, move |result| FetchEvent::FeatureInfo {
            sequence,
            result: result
                .and_then(reject_service_exception)
                .map(|bytes| feature_text(&bytes)),
        })?;
        Ok(sequence)
    }

    /// Starts a GetLegendGraphic request
    pub fn request_legend(&mut self, request: LegendRequest) -> Result<()> {
        log::debug!("GetLegendGraphic layer={} style={:?}", request.layer, request.style);
        let pairs = request.query_pairs(&self.service);
        self.spawn(pairs, |result| FetchEvent::Legend {
            result: result.and_then(reject_service_exception),
        })
    }

    /// Whether `sequence` is the most recently issued map request
    pub fn is_current_map(&self, sequence: u64) -> bool {
        sequence == self.map_sequence
    }

    pub fn is_current_feature_info(&self, sequence: u64) -> bool {
        sequence == self.feature_sequence
    }

    /// Makes any in-flight map request stale
    pub fn invalidate_map(&mut self) {
        self.map_sequence += 1;
    }

    /// Makes any in-flight feature query stale
    pub fn invalidate_feature_info(&mut self) {
        self.feature_sequence += 1;
    }

    /// Number of spawned requests whose completion has not been received yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Try to receive completed requests (non-blocking)
    pub fn try_recv_events(&mut self) -> Vec<FetchEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            events.push(event);
        }
        events
    }

    /// Blocks up to `timeout` for the next completion
    pub fn recv_event_timeout(&mut self, timeout: std::time::Duration) -> Option<FetchEvent> {
        let event = self.event_rx.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(event)
    }

    fn spawn<F>(&mut self, pairs: QueryPairs, into_event: F) -> Result<()>
    where
        F: FnOnce(Result<Vec<u8>>) -> FetchEvent + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let tx = self.event_tx.clone();

        // Dropping the handle detaches the task; there is no hard cancellation
        let _handle = crate::runtime::spawn(async move {
            let result = download(&service, &pairs).await;
            if let Err(e) = &result {
                log::warn!("request failed: {}", e);
            }
            let event = into_event(result);
            if tx.send(event).is_err() {
                log::debug!("fetch pipeline dropped before completion");
            }
        })?;
        self.in_flight += 1;
        Ok(())
    }
}

async fn download(service: &ServiceConfig, pairs: &QueryPairs) -> Result<Vec<u8>> {
    let mut request = HTTP_CLIENT
        .get(service.endpoint())
        .query(pairs)
        .timeout(service.timeout);
    if let Some((user, password)) = service.credentials() {
        request = request.basic_auth(user, password);
    }

    let response = request.send().await.map_err(classify)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MapError::HttpStatus {
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }

    let data = response.bytes().await.map_err(classify)?.to_vec();
    Ok(data)
}

fn classify(err: reqwest::Error) -> MapError {
    if err.is_timeout() {
        MapError::Timeout
    } else {
        MapError::Network(err)
    }
}

/// A 2xx answer can still be an XML exception report instead of the payload
fn reject_service_exception(bytes: Vec<u8>) -> Result<Vec<u8>> {
    match service_exception_text(&bytes) {
        Some(text) => Err(MapError::ServiceException(text)),
        None => Ok(bytes),
    }
}

pub(crate) fn service_exception_text(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(64)];
    let head = String::from_utf8_lossy(head);
    if !head.trim_start().starts_with('<') {
        return None;
    }

    let text = String::from_utf8_lossy(bytes);
    // Skip the enclosing `<ServiceExceptionReport>` element
    let start = text.match_indices("<ServiceException").find_map(|(i, tag)| {
        let next = text[i + tag.len()..].chars().next()?;
        (next == '>' || next.is_whitespace()).then_some(i)
    })?;
    let rest = &text[start..];
    let Some(open_end) = rest.find('>') else {
        return Some(rest.to_string());
    };
    let body = &rest[open_end + 1..];
    let body = match body.find("</ServiceException>") {
        Some(end) => &body[..end],
        None => body,
    };
    let message = body.trim();
    if message.is_empty() {
        Some("service exception".to_string())
    } else {
        Some(message.to_string())
    }
}

fn feature_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NO_FEATURES_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}
