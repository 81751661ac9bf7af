//! In-process WavePlot server
//!
//! Records upload and link bodies in arrival order and answers uploads with a
//! scripted reply.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Upload(Value),
    Link(Value),
}

#[derive(Debug, Clone)]
pub enum UploadReply {
    /// 201 with a fresh `wp-N` identifier
    Created,
    /// 303 naming an existing WavePlot
    Duplicate(String),
    /// Any other status
    Status(u16),
}

struct MockState {
    reply: UploadReply,
    recorded: Mutex<Vec<Recorded>>,
    created: AtomicUsize,
}

pub struct MockServer {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockServer {
    pub async fn start(reply: UploadReply) -> Self {
        let state = Arc::new(MockState {
            reply,
            recorded: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/waveplot", post(upload))
            .route("/api/waveplot_context", post(link))
            .route("/api/waveplot/:uuid", get(summary))
            .route("/api/waveplot/:uuid/full", get(full))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.state.recorded.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<Value> {
        self.recorded()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Upload(body) => Some(body),
                Recorded::Link(_) => None,
            })
            .collect()
    }

    pub fn links(&self) -> Vec<Value> {
        self.recorded()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Link(body) => Some(body),
                Recorded::Upload(_) => None,
            })
            .collect()
    }
}

async fn upload(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.recorded.lock().unwrap().push(Recorded::Upload(body));

    match &state.reply {
        UploadReply::Created => {
            let n = state.created.fetch_add(1, Ordering::SeqCst) + 1;
            (
                StatusCode::CREATED,
                Json(json!({
                    "uuid": format!("wp-{}", n),
                    "image_sha1": "da39a3ee5e6b4b0d3255bfef95601890afd80709",
                    "thumbnail": [0, 5, 10, 5, 0],
                    "sonic_hash": 48879
                })),
            )
                .into_response()
        }
        UploadReply::Duplicate(uuid) => {
            (StatusCode::SEE_OTHER, Json(json!({ "message": uuid }))).into_response()
        }
        UploadReply::Status(code) => (
            StatusCode::from_u16(*code).unwrap(),
            "scripted failure".to_string(),
        )
            .into_response(),
    }
}

async fn link(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    state.recorded.lock().unwrap().push(Recorded::Link(body));
    Json(json!({ "status": "ok" }))
}

async fn summary(Path(uuid): Path<String>) -> Response {
    if uuid == "missing" {
        return (StatusCode::NOT_FOUND, "no such waveplot").into_response();
    }
    Json(json!({
        "uuid": uuid,
        "length": 215,
        "trimmed_length": 210,
        "dr_level": 9.5,
        "source_type": "flac",
        "sample_rate": 44100,
        "bit_depth": 16,
        "bit_rate": 1000000,
        "num_channels": 2,
        "image_sha1": "abc",
        "thumbnail": "AAUK",
        "sonic_hash": "beef",
        "version": "CITRUS"
    }))
    .into_response()
}

async fn full(Path(_uuid): Path<String>) -> Json<Value> {
    // [0, 100, 200]
    Json(json!({ "data": "AGTI" }))
}
