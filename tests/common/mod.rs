//! In-process stand-ins for the hosted table (PostgREST dialect) and the mail
//! relay, served by axum on an ephemeral port.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TABLE_PATH: &str = "/rest/v1/suggestions";
pub const MAIL_PATH: &str = "/api/send-email";

type Shared = Arc<Mutex<FakeState>>;
type Params = Query<HashMap<String, String>>;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub rows: Vec<Value>,
    pub next_id: i64,
    pub requests: Vec<Recorded>,
    /// When set, every request is answered with this status.
    pub fail_with: Option<u16>,
    pub mail: Vec<Value>,
}

impl FakeState {
    /// Insert a row as if another client had written it.
    pub fn insert_external(&mut self, title: &str) -> Value {
        self.next_id += 1;
        let row = json!({
            "id": self.next_id,
            "title": title,
            "type": "Other",
            "details": null,
            "status": "pending",
            "created_at": created_at(self.next_id),
        });
        self.rows.push(row.clone());
        row
    }
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Shared,
    task: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state: Shared = Arc::default();

        let app = Router::new()
            .route(
                TABLE_PATH,
                get(select_rows).post(insert_row).patch(update_rows).delete(delete_rows),
            )
            .route(MAIL_PATH, post(send_email))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { base_url: format!("http://{addr}/"), state, task }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn fail_with(&self, status: Option<u16>) {
        self.state.lock().unwrap().fail_with = status;
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// Distinct, increasing timestamps so ordering is deterministic.
fn created_at(n: i64) -> String {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (base + ChronoDuration::seconds(n)).to_rfc3339()
}

/// Log every request, then short-circuit when a failure status is armed.
async fn record(State(state): State<Shared>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, usize::MAX).await else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let query = url::form_urlencoded::parse(parts.uri.query().unwrap_or_default().as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let headers = parts
        .headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let recorded = Recorded {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    };

    let failing = {
        let mut st = state.lock().unwrap();
        st.requests.push(recorded);
        st.fail_with
    };
    if let Some(code) = failing {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "message": "service unavailable" }))).into_response();
    }
    next.run(Request::from_parts(parts, bytes.into())).await
}

// PostgREST `id=eq.{id}`; no filter selects every row.
fn id_matches(params: &HashMap<String, String>, row: &Value) -> bool {
    let Some(want) = params.get("id").and_then(|v| v.strip_prefix("eq.")) else {
        return true;
    };
    match row.get("id") {
        Some(Value::Number(n)) => n.to_string() == want,
        Some(Value::String(s)) => s == want,
        _ => false,
    }
}

async fn select_rows(State(state): State<Shared>, Query(params): Params) -> Json<Value> {
    let st = state.lock().unwrap();
    let mut rows: Vec<Value> = st.rows.iter().filter(|r| id_matches(&params, r)).cloned().collect();
    rows.sort_by(|a, b| b["created_at"].as_str().cmp(&a["created_at"].as_str()));
    if params.get("select").map(String::as_str) == Some("id,status") {
        rows = rows.iter().map(|r| json!({ "id": r["id"], "status": r["status"] })).collect();
    }
    Json(Value::Array(rows))
}

async fn insert_row(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let Value::Object(mut fields) = body else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "expected an object" }))).into_response();
    };
    let mut st = state.lock().unwrap();
    st.next_id += 1;
    fields.insert("id".into(), json!(st.next_id));
    fields.insert("created_at".into(), json!(created_at(st.next_id)));
    let row = Value::Object(fields);
    st.rows.push(row.clone());
    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn update_rows(
    State(state): State<Shared>,
    Query(params): Params,
    Json(patch): Json<Value>,
) -> Json<Value> {
    let mut st = state.lock().unwrap();
    let mut updated = Vec::new();
    for row in st.rows.iter_mut().filter(|r| id_matches(&params, r)) {
        if let (Value::Object(dst), Value::Object(src)) = (&mut *row, &patch) {
            for (k, v) in src {
                dst.insert(k.clone(), v.clone());
            }
        }
        updated.push(row.clone());
    }
    Json(Value::Array(updated))
}

async fn delete_rows(State(state): State<Shared>, Query(params): Params) -> Json<Value> {
    let mut st = state.lock().unwrap();
    let (gone, kept): (Vec<Value>, Vec<Value>) =
        st.rows.drain(..).partition(|r| id_matches(&params, r));
    st.rows = kept;
    Json(Value::Array(gone))
}

async fn send_email(State(state): State<Shared>, Json(message): Json<Value>) -> Json<Value> {
    state.lock().unwrap().mail.push(message);
    Json(json!({ "success": true }))
}
