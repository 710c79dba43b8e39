use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get, post, put},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const VALID_ACCESS_TOKEN: &str = "access-1";
pub const EXPIRED_ACCESS_TOKEN: &str = "access-expired";
pub const INITIAL_REFRESH_TOKEN: &str = "refresh-1";
pub const RENEWED_ACCESS_TOKEN: &str = "access-2";
pub const RENEWED_REFRESH_TOKEN: &str = "refresh-2";

/// Stand-in for the academy API: bearer-protected resources, a rotating
/// refresh endpoint and an echo route. Counts what it serves.
pub struct BackendState {
    valid_access_tokens: Mutex<HashSet<String>>,
    valid_refresh_token: Mutex<String>,
    reject_refresh: AtomicBool,
    omit_access_token: AtomicBool,
    hold_refresh_until: AtomicUsize,
    refresh_calls: AtomicUsize,
    unauthorized_served: AtomicUsize,
    always_unauthorized_calls: AtomicUsize,
    authorizations: Mutex<Vec<Option<String>>>,
}

impl BackendState {
    pub fn new() -> Self {
        Self {
            valid_access_tokens: Mutex::new(HashSet::from([VALID_ACCESS_TOKEN.to_string()])),
            valid_refresh_token: Mutex::new(INITIAL_REFRESH_TOKEN.to_string()),
            reject_refresh: AtomicBool::new(false),
            omit_access_token: AtomicBool::new(false),
            hold_refresh_until: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            unauthorized_served: AtomicUsize::new(0),
            always_unauthorized_calls: AtomicUsize::new(0),
            authorizations: Mutex::new(Vec::new()),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn always_unauthorized_calls(&self) -> usize {
        self.always_unauthorized_calls.load(Ordering::SeqCst)
    }

    /// Authorization headers seen on `/students`, in arrival order
    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.authorizations.lock().clone()
    }

    /// Answer refresh calls with 401
    pub fn reject_refresh(&self) {
        self.reject_refresh.store(true, Ordering::SeqCst);
    }

    /// Answer refresh calls with 200 but no `accessToken`
    pub fn omit_access_token(&self) {
        self.omit_access_token.store(true, Ordering::SeqCst);
    }

    /// Keep refresh calls pending until this many 401s have been served, so
    /// every request of a storm is rejected before the refresh settles
    pub fn hold_refresh_until(&self, unauthorized: usize) {
        self.hold_refresh_until.store(unauthorized, Ordering::SeqCst);
    }

    fn authorize(&self, headers: &HeaderMap) -> bool {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.authorizations.lock().push(authorization.clone());

        let valid = authorization
            .as_deref()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| self.valid_access_tokens.lock().contains(token))
            .unwrap_or(false);

        if !valid {
            self.unauthorized_served.fetch_add(1, Ordering::SeqCst);
        }
        valid
    }

    async fn wait_for_storm(&self) {
        let expected = self.hold_refresh_until.load(Ordering::SeqCst);
        if expected == 0 {
            return;
        }

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.unauthorized_served.load(Ordering::SeqCst) < expected
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // Let the last 401 reach its client before answering
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

pub fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/students", get(list_students).post(write_student))
        .route(
            "/students/:id",
            put(write_student).patch(write_student).delete(delete_student),
        )
        .route("/always-unauthorized", any(always_unauthorized))
        .route("/echo", any(echo))
        .route("/auth/refresh", post(refresh))
        .fallback(unknown_route)
        .with_state(state)
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
}

async fn list_students(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !state.authorize(&headers) {
        return unauthorized("Token expired");
    }

    Json(json!({
        "students": [
            { "id": 1, "name": "Mona" },
            { "id": 2, "name": "Omar" }
        ],
        "total": 2
    }))
    .into_response()
}

async fn write_student(
    State(state): State<Arc<BackendState>>,
    method: Method,
    headers: HeaderMap,
    Json(student): Json<Value>,
) -> Response {
    if !state.authorize(&headers) {
        return unauthorized("Token expired");
    }

    Json(json!({ "method": method.as_str(), "student": student })).into_response()
}

async fn delete_student(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !state.authorize(&headers) {
        return unauthorized("Token expired");
    }

    StatusCode::NO_CONTENT.into_response()
}

/// 404 that reports the path exactly as it arrived, still percent-encoded
async fn unknown_route(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "path": uri.path(), "query": uri.query() })),
    )
        .into_response()
}

async fn always_unauthorized(State(state): State<Arc<BackendState>>) -> Response {
    state.always_unauthorized_calls.fetch_add(1, Ordering::SeqCst);
    state.unauthorized_served.fetch_add(1, Ordering::SeqCst);
    unauthorized("Account locked")
}

async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let received: Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), Value::String(v.to_string())))
        })
        .collect();

    (
        [("x-upstream", "fake-backend")],
        Json(json!({
            "method": method.as_str(),
            "query": query,
            "headers": received,
            "body": String::from_utf8_lossy(&body),
        })),
    )
        .into_response()
}

async fn refresh(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    state.wait_for_storm().await;

    if state.reject_refresh.load(Ordering::SeqCst) {
        return unauthorized("Invalid refresh token");
    }

    let presented = body.get("refreshToken").and_then(|v| v.as_str());
    if presented != Some(state.valid_refresh_token.lock().as_str()) {
        return unauthorized("Invalid refresh token");
    }

    if state.omit_access_token.load(Ordering::SeqCst) {
        return Json(json!({ "refreshToken": RENEWED_REFRESH_TOKEN })).into_response();
    }

    state
        .valid_access_tokens
        .lock()
        .insert(RENEWED_ACCESS_TOKEN.to_string());
    *state.valid_refresh_token.lock() = RENEWED_REFRESH_TOKEN.to_string();

    Json(json!({
        "accessToken": RENEWED_ACCESS_TOKEN,
        "refreshToken": RENEWED_REFRESH_TOKEN
    }))
    .into_response()
}
