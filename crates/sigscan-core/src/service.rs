//! Scan backend seam.
//!
//! The orchestrator only sees [`ScanService`]. [`HttpScanService`] talks to
//! the real backend; [`MockScanService`] fabricates deterministic responses
//! in the backend's wire shape so offline runs still exercise normalization.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::http_client::{HttpAuth, HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{ScanError, ScanRequest};

pub const SCAN_PATH: &str = "/api/scanner/run";

pub type ScanFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ScanError>> + Send + 'a>>;

/// Executes one scan request and returns the raw response payload.
pub trait ScanService: Send + Sync {
    fn scan<'a>(&'a self, request: ScanRequest) -> ScanFuture<'a>;
}

/// Base URL, credentials and timeout shared by every backend call.
#[derive(Clone)]
pub struct BackendEndpoint {
    http: Arc<dyn HttpClient>,
    base_url: String,
    auth: HttpAuth,
    timeout_ms: u64,
}

impl BackendEndpoint {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl AsRef<str>) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url.as_ref()),
            auth: HttpAuth::None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_auth(mut self, auth: HttpAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ScanError> {
        let request = HttpRequest::get(self.url(path));
        self.send(request).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ScanError> {
        let body = serde_json::to_string(body)
            .map_err(|e| ScanError::transport(format!("failed to encode request: {e}")))?;
        let request = HttpRequest::post(self.url(path)).with_json_body(body);
        self.send(request).await
    }

    async fn send(&self, request: HttpRequest) -> Result<Value, ScanError> {
        let request = request
            .with_header("accept", "application/json")
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);
        let url = request.url.clone();

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| ScanError::transport(e.message()))?;
        if !response.is_success() {
            tracing::debug!(%url, status = response.status, "backend returned error status");
            return Err(ScanError::http_status(response.status, &response.body));
        }

        serde_json::from_str(&response.body)
            .map_err(|e| ScanError::transport(format!("invalid JSON from {url}: {e}")))
    }
}

impl std::fmt::Debug for BackendEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendEndpoint")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

/// Trailing slashes are dropped so paths can be appended verbatim.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

/// Backend-backed scan service.
#[derive(Debug, Clone)]
pub struct HttpScanService {
    endpoint: BackendEndpoint,
}

impl HttpScanService {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }
}

impl ScanService for HttpScanService {
    fn scan<'a>(&'a self, request: ScanRequest) -> ScanFuture<'a> {
        Box::pin(async move {
            let body = serde_json::to_value(&request)
                .map_err(|e| ScanError::transport(format!("failed to encode request: {e}")))?;
            self.endpoint.post_json(SCAN_PATH, &body).await
        })
    }
}

/// Offline scan service with reproducible output.
///
/// The same request always yields the same payload. Scores are emitted on
/// the 0..100 scale to mirror what the live backend sends.
#[derive(Debug, Default)]
pub struct MockScanService {
    failure: Option<ScanError>,
    calls: AtomicUsize,
}

impl MockScanService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose every call fails with `error`.
    pub fn failing(error: ScanError) -> Self {
        Self {
            failure: Some(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payload(request: &ScanRequest) -> Value {
        let results: Vec<Value> = request
            .symbols
            .iter()
            .map(|symbol| {
                let seed = seed_of(symbol.as_str());
                let score = 35.0 + (seed % 60) as f64;
                let direction = match seed % 3 {
                    0 => "BULLISH",
                    1 => "BEARISH",
                    _ => "NEUTRAL",
                };
                let risk = ["LOW", "MEDIUM", "HIGH"][(seed % 3) as usize];
                let breakdown: serde_json::Map<String, Value> = request
                    .timeframes
                    .iter()
                    .enumerate()
                    .map(|(index, timeframe)| {
                        let offset = ((seed >> index) % 21) as f64 - 10.0;
                        let tf_score = (score + offset).clamp(0.0, 100.0) / 100.0;
                        (
                            timeframe.as_str().to_owned(),
                            json!({ "score": tf_score, "direction": direction }),
                        )
                    })
                    .collect();
                let components = if request.is_quick() {
                    json!({ "smc": score / 100.0, "price_action": (score - 5.0) / 100.0 })
                } else {
                    json!({
                        "harmonic": ((seed % 80) as f64) / 100.0,
                        "elliott": ((seed % 70) as f64) / 100.0,
                        "smc": score / 100.0,
                        "fibonacci": ((seed % 50) as f64) / 100.0,
                        "price_action": (score - 5.0) / 100.0,
                        "sar": ((seed % 90) as f64) / 100.0,
                    })
                };

                json!({
                    "symbol": symbol.as_str(),
                    "overall_score": score,
                    "overall_direction": direction,
                    "timeframe_count": request.timeframes.len(),
                    "timeframes": request.timeframes,
                    "timeframe_breakdown": breakdown,
                    "components": components,
                    "risk_level": risk,
                    "price": 1.0 + (seed % 50_000) as f64,
                    "change_24h": ((seed % 17) as f64) - 8.0,
                    "volume": (seed % 1_000) as f64 * 1_000.0,
                })
            })
            .collect();

        json!({ "results": results })
    }
}

impl ScanService for MockScanService {
    fn scan<'a>(&'a self, request: ScanRequest) -> ScanFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.failure {
                Some(error) => Err(error.clone()),
                None => Ok(Self::payload(&request)),
            }
        })
    }
}

fn seed_of(symbol: &str) -> u64 {
    symbol
        .bytes()
        .fold(17_u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(byte)))
}
