//! In-process [`DashboardApi`] fakes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use roadwatch_filter::QueryParams;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};

use crate::api::{DashboardApi, UploadReceipt};
use crate::endpoint::Endpoint;
use crate::ClientError;

fn unavailable(endpoint: Endpoint) -> ClientError {
    ClientError::Status {
        status: 503,
        url: endpoint.path().to_string(),
    }
}

/// A KM distribution body with a single bucket.
pub fn segments_body(label: &str) -> Value {
    json!({ "segments": [{
        "bucketLabel": label,
        "totalAccidents": 1,
        "severityIndex": 1.0,
        "dominantCause": "speeding",
        "causeCounts": { "speeding": 1 }
    }]})
}

/// Answers every request for an endpoint with a fixed body; endpoints
/// without one fail with HTTP 503.
#[derive(Default)]
pub struct ScriptedApi {
    responses: HashMap<Endpoint, Value>,
    calls: Mutex<Vec<(Endpoint, String)>>,
}

impl ScriptedApi {
    pub fn with(mut self, endpoint: Endpoint, body: Value) -> Self {
        self.responses.insert(endpoint, body);
        self
    }

    /// `(endpoint, encoded query)` of every request so far.
    pub fn calls(&self) -> Vec<(Endpoint, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DashboardApi for ScriptedApi {
    async fn fetch_raw(&self, endpoint: Endpoint, params: &QueryParams) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push((endpoint, params.encode()));
        self.responses
            .get(&endpoint)
            .cloned()
            .ok_or_else(|| unavailable(endpoint))
    }

    async fn upload(&self, path: &Path) -> Result<UploadReceipt, ClientError> {
        Ok(UploadReceipt {
            message: Some(path.display().to_string()),
        })
    }
}

/// Holds each request until the test releases its gate, so responses can
/// be delivered in any order. Reports each request's encoded query on the
/// channel returned by [`GatedApi::new`] once it is in flight.
pub struct GatedApi {
    started: mpsc::UnboundedSender<String>,
    gates: Mutex<HashMap<String, oneshot::Receiver<Value>>>,
}

impl GatedApi {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (started, rx) = mpsc::unbounded_channel();
        let api = Self {
            started,
            gates: Mutex::new(HashMap::new()),
        };
        (api, rx)
    }

    /// Gate for the request with encoded query `query`. Dropping the
    /// sender fails the request.
    pub fn gate(&self, query: &str) -> oneshot::Sender<Value> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(query.to_string(), rx);
        tx
    }
}

#[async_trait::async_trait]
impl DashboardApi for GatedApi {
    async fn fetch_raw(&self, endpoint: Endpoint, params: &QueryParams) -> Result<Value, ClientError> {
        let query = params.encode();
        let gate = self.gates.lock().unwrap().remove(&query);
        let _ = self.started.send(query);
        match gate {
            Some(rx) => rx.await.map_err(|_| unavailable(endpoint)),
            None => Err(unavailable(endpoint)),
        }
    }

    async fn upload(&self, _path: &Path) -> Result<UploadReceipt, ClientError> {
        Ok(UploadReceipt::default())
    }
}
