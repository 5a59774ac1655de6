// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Shared fixtures for the gateway integration tests: a scriptable mock
//! STI-VS and helpers to mint passport tokens and spawn a gateway against
//! an in-memory store.

use axum::{extract::State, routing::post, Json, Router};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{json, Value};
use shaken_common::api::VERSTAT_PASSED;
use shaken_gateway::{
    startup::Application,
    store::{CacheStore, InMemoryStore},
    verify::OracleClient,
    AppState,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::net::TcpListener;

/// Mint a compact passport token with the given certificate URL and
/// issuance time. The signature segment is opaque filler; the gateway
/// never interprets it.
pub fn make_token(x5u: &str, iat: i64) -> String {
    let header = Base64UrlUnpadded::encode_string(
        json!({ "alg": "ES256", "ppt": "shaken", "x5u": x5u })
            .to_string()
            .as_bytes(),
    );
    let payload =
        Base64UrlUnpadded::encode_string(json!({ "iat": iat }).to_string().as_bytes());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// How the mock STI-VS answers each query.
#[derive(Clone)]
pub enum OracleBehavior {
    /// `verificationResponse.verstat` set to the given value
    Verstat(String),
    /// JSON body without a `verificationResponse` object
    NoResponseObject,
    /// HTTP 500 with an empty body
    ServerError,
    /// Sleep before answering with a passing verdict
    Delay(Duration),
}

impl OracleBehavior {
    pub fn passing() -> Self {
        Self::Verstat(VERSTAT_PASSED.to_string())
    }

    pub fn failing() -> Self {
        Self::Verstat("TN-Validation-Failed".to_string())
    }
}

struct MockState {
    behavior: OracleBehavior,
    calls: AtomicUsize,
    last_body: Mutex<Option<Value>>,
}

/// Handle to a spawned mock STI-VS.
pub struct MockStiVs {
    pub url: String,
    state: Arc<MockState>,
}

impl MockStiVs {
    /// Spawn the mock on an ephemeral port.
    pub async fn spawn(behavior: OracleBehavior) -> Self {
        let state = Arc::new(MockState {
            behavior,
            calls: AtomicUsize::new(0),
            last_body: Mutex::new(None),
        });

        let router = Router::new()
            .route("/", post(answer))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve mock");
        });

        Self {
            url: format!("http://{addr}/"),
            state,
        }
    }

    /// Number of verification queries received so far.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Body of the most recent query, if any.
    pub fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().expect("lock").clone()
    }
}

async fn answer(
    State(st): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, axum::http::StatusCode> {
    st.calls.fetch_add(1, Ordering::SeqCst);
    *st.last_body.lock().expect("lock") = Some(body);

    match &st.behavior {
        OracleBehavior::Verstat(v) => {
            Ok(Json(json!({ "verificationResponse": { "verstat": v } })))
        }
        OracleBehavior::NoResponseObject => Ok(Json(json!({ "status": "ok" }))),
        OracleBehavior::ServerError => Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
        OracleBehavior::Delay(d) => {
            tokio::time::sleep(*d).await;
            Ok(Json(json!({
                "verificationResponse": { "verstat": VERSTAT_PASSED }
            })))
        }
    }
}

/// A gateway spawned on an ephemeral port with an inspectable in-memory
/// cache store.
pub struct TestGateway {
    pub url: String,
    pub store: Arc<InMemoryStore>,
}

impl TestGateway {
    pub async fn spawn(oracle_url: &str, freshness_sec: i64, timeout_ms: u64) -> Self {
        let mem = Arc::new(InMemoryStore::default());
        let store: Arc<dyn CacheStore> = mem.clone();
        let url = spawn_gateway(oracle_url, freshness_sec, timeout_ms, store).await;
        Self { url, store: mem }
    }
}

/// Spawn a gateway on an ephemeral port with an arbitrary cache store.
pub async fn spawn_gateway(
    oracle_url: &str,
    freshness_sec: i64,
    timeout_ms: u64,
    store: Arc<dyn CacheStore>,
) -> String {
    let oracle = OracleClient::new(oracle_url.to_string(), Duration::from_millis(timeout_ms))
        .expect("oracle client");

    let state = Arc::new(AppState {
        store,
        oracle,
        freshness_sec,
    });

    let router = Application::router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind gateway");
    let addr = listener.local_addr().expect("gateway addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve gateway");
    });

    format!("http://{addr}")
}
