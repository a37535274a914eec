//! In-memory port stubs and request helpers shared by the handler tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog, ScriptCommand};
use scripthub_app::scheduler::{Scheduler, SchedulerConfig};
use scripthub_app::services::manual_run_service::ManualRunService;
use scripthub_domain::device::{Catalog, Channel, Device};
use scripthub_domain::error::{NotFoundError, ScriptHubError, ValidationError};
use scripthub_domain::schedule::ScheduleRecord;

use crate::state::AppState;

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<ScheduleRecord>>>,
}

impl MemoryStore {
    pub fn saved(&self) -> Vec<ScheduleRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl ScheduleStore for MemoryStore {
    async fn load(&self) -> Result<Vec<ScheduleRecord>, ScriptHubError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn save(&self, records: Vec<ScheduleRecord>) -> Result<(), ScriptHubError> {
        *self.records.lock().unwrap() = records;
        Ok(())
    }
}

/// Scripts are shell snippets run with `sh -c`.
#[derive(Clone, Default)]
pub struct MemoryScripts {
    scripts: Arc<Mutex<BTreeMap<String, String>>>,
}

impl ScriptCatalog for MemoryScripts {
    async fn list(&self) -> Result<Vec<String>, ScriptHubError> {
        Ok(self.scripts.lock().unwrap().keys().cloned().collect())
    }

    async fn contains(&self, name: &str) -> Result<bool, ScriptHubError> {
        Ok(self.scripts.lock().unwrap().contains_key(name))
    }

    async fn install(&self, name: &str, content: Vec<u8>) -> Result<(), ScriptHubError> {
        if name.contains('/') {
            return Err(ValidationError::InvalidScriptName(name.to_string()).into());
        }
        self.scripts.lock().unwrap().insert(
            name.to_string(),
            String::from_utf8_lossy(&content).into_owned(),
        );
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), ScriptHubError> {
        self.scripts
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Script",
                    id: name.to_string(),
                }
                .into()
            })
    }

    fn command(&self, name: &str) -> Result<ScriptCommand, ScriptHubError> {
        let body = self
            .scripts
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| "exit 127".to_string());
        Ok(ScriptCommand::new("sh").arg("-c").arg(body))
    }
}

pub struct StaticDevices;

impl DeviceCatalog for StaticDevices {
    async fn catalog(&self) -> Result<Catalog, ScriptHubError> {
        Ok(Catalog::new(vec![
            Device::new("LEQ0000001", "Actuator").channel(
                Channel::new("LEQ0000001:1", "Actuator:1").parameter("STATE", "State"),
            ),
        ]))
    }
}

pub type TestState = AppState<MemoryStore, MemoryScripts, StaticDevices>;

pub struct TestApp {
    pub router: Router,
    pub state: TestState,
    pub store: MemoryStore,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::default();
        let scripts = MemoryScripts::default();
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            scripts.clone(),
            StaticDevices,
            SchedulerConfig::default(),
        ));
        let state = AppState::new(
            scheduler,
            ManualRunService::new(scripts.clone()),
            scripts,
            StaticDevices,
        );
        Self {
            router: crate::router::build(state.clone()),
            state,
            store,
        }
    }

    /// Same as [`new`](Self::new) with the given scripts installed.
    pub async fn with_scripts(scripts: &[(&str, &str)]) -> Self {
        let app = Self::new();
        for (name, body) in scripts {
            app.state
                .scripts
                .install(name, body.as_bytes().to_vec())
                .await
                .unwrap();
        }
        app
    }

    pub async fn raw(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a request and decode the JSON body, `Null` when empty.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.raw(request).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    json_request("POST", uri, body)
}

pub fn put_json(uri: &str, body: &Value) -> Request<Body> {
    json_request("PUT", uri, body)
}

pub fn put_bytes(uri: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Poll `done` until it holds or five seconds elapse.
pub async fn eventually(done: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
