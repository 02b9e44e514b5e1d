//! End-to-end tests for the session manager and request executor against an
//! in-process mock backend.
//!
//! The mock issues generation-numbered token pairs ("A1"/"R1", "A2"/"R2",
//! ...) and counts calls to the refresh endpoint, which is what lets these
//! tests pin down the single-flight and retry-once guarantees.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;

use warble_auth::AuthDb;
use warble_core::api::{TasksClient, WhisperClient};
use warble_core::models::{Credentials, Registration, TaskCreate, TaskUpdate};
use warble_core::{ApiClient, CoreError, SessionManager, SessionState};

#[derive(Default)]
struct BackendState {
    refresh_calls: AtomicUsize,
    /// Access token the resource endpoints currently accept.
    valid_access: Mutex<String>,
    /// Refresh token the refresh endpoint currently accepts.
    valid_refresh: Mutex<String>,
    /// Token generation counter; login starts it at 1, each refresh bumps it.
    generation: AtomicUsize,
    /// When set, `/auth/refresh` rejects every exchange.
    fail_refresh: AtomicBool,
    /// When set, `/tasks` rejects even the freshest token.
    reject_tasks: AtomicBool,
    /// When set, `/tasks` returns a 500 instead of a listing.
    tasks_server_error: AtomicBool,
    /// When set, transcription reports an in-band failure.
    fail_transcription: AtomicBool,
}

impl BackendState {
    fn issue_pair(&self, generation: usize) -> serde_json::Value {
        let access = format!("A{generation}");
        let refresh = format!("R{generation}");
        *self.valid_access.lock() = access.clone();
        *self.valid_refresh.lock() = refresh.clone();
        self.generation.store(generation, Ordering::SeqCst);
        serde_json::json!({
            "access_token": access,
            "refresh_token": refresh,
            "token_type": "bearer",
        })
    }

    /// Invalidate the issued access token while keeping the refresh token
    /// good, as if the access token had expired server-side.
    fn expire_access(&self) {
        *self.valid_access.lock() = "expired".to_string();
    }

    fn bearer_ok(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_access.lock());
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == expected)
            .unwrap_or(false)
    }
}

fn sample_task(id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": "Buy groceries",
        "description": null,
        "due_date": null,
        "priority": "medium",
        "status": status,
        "user_id": "u-1",
        "created_at": "2025-06-01T09:30:00",
        "updated_at": null,
        "source": "manual",
        "calendar_event_id": null,
    })
}

async fn login(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if body["username"] == "alice" && body["password"] == "pw" {
        Json(state.issue_pair(1)).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Incorrect username or password").into_response()
    }
}

async fn register(Json(body): Json<serde_json::Value>) -> Response {
    Json(serde_json::json!({
        "id": "u-2",
        "username": body["username"].clone(),
        "email": body["email"].clone(),
        "is_active": true,
    }))
    .into_response()
}

async fn refresh(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_refresh.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, "Refresh token expired").into_response();
    }
    let presented = body["refresh_token"].as_str().unwrap_or_default();
    let valid = state.valid_refresh.lock().clone();
    if !valid.is_empty() && presented == valid {
        let next = state.generation.load(Ordering::SeqCst) + 1;
        Json(state.issue_pair(next)).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Invalid refresh token").into_response()
    }
}

async fn logout() -> StatusCode {
    StatusCode::OK
}

async fn me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !state.bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    }
    Json(serde_json::json!({
        "id": "u-1",
        "username": "alice",
        "email": "alice@example.com",
        "is_active": true,
    }))
    .into_response()
}

async fn list_tasks(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if state.tasks_server_error.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable").into_response();
    }
    if state.reject_tasks.load(Ordering::SeqCst) || !state.bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    }
    Json(serde_json::json!({
        "tasks": [sample_task("t-1", "pending")],
        "calendar_imported": false,
        "total_count": 1,
        "pending_count": 1,
        "completed_count": 0,
    }))
    .into_response()
}

async fn create_task(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if !state.bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    }
    let mut task = sample_task("t-2", "pending");
    task["title"] = body["title"].clone();
    if let Some(priority) = body.get("priority") {
        task["priority"] = priority.clone();
    }
    Json(task).into_response()
}

async fn get_task(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    }
    Json(sample_task(&id, "pending")).into_response()
}

async fn update_task(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if !state.bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    }
    let status = body["status"].as_str().unwrap_or("pending");
    Json(sample_task(&id, status)).into_response()
}

async fn toggle_task(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    }
    Json(sample_task(&id, "completed")).into_response()
}

async fn delete_task(
    State(state): State<Arc<BackendState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    }
    Json(serde_json::json!({ "message": "Task deleted" })).into_response()
}

async fn transcribe(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !state.bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, "Not authenticated").into_response();
    }
    let mut uploaded = 0usize;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            uploaded = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        }
    }
    if uploaded == 0 {
        return Json(serde_json::json!({ "error": "empty upload" })).into_response();
    }
    if state.fail_transcription.load(Ordering::SeqCst) {
        return Json(serde_json::json!({ "error": "transcription failed" })).into_response();
    }
    Json(serde_json::json!({ "text": "buy milk tomorrow" })).into_response()
}

async fn spawn_backend() -> (Arc<BackendState>, String) {
    let state = Arc::new(BackendState::default());
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/toggle", put(toggle_task))
        .route("/whisper/transcribe", post(transcribe))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (state, format!("http://{addr}"))
}

async fn client_stack(base_url: &str) -> (Arc<SessionManager>, ApiClient) {
    let db = AuthDb::open_in_memory().await.unwrap();
    let session = Arc::new(SessionManager::new(base_url, db).unwrap());
    let client = ApiClient::new(session.clone());
    (session, client)
}

fn alice() -> Credentials {
    Credentials {
        username: "alice".to_string(),
        password: "pw".to_string(),
    }
}

#[tokio::test]
async fn fresh_install_probe_lands_unauthenticated() {
    let (_state, url) = spawn_backend().await;
    let (session, _client) = client_stack(&url).await;

    assert_eq!(session.current_state(), SessionState::Unknown);
    assert_eq!(session.probe().await.unwrap(), SessionState::Unauthenticated);
    assert_eq!(session.current_state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn login_persists_pair_and_profile() {
    let (_state, url) = spawn_backend().await;
    let (session, _client) = client_stack(&url).await;

    let pair = session.login(&alice()).await.unwrap();
    assert_eq!(pair.access_token, "A1");
    assert_eq!(pair.refresh_token, "R1");
    assert_eq!(pair.token_type, "bearer");
    assert_eq!(session.current_state(), SessionState::Authenticated);

    // Both tokens from the same issuance land in the store together.
    let stored = session.store().get_token_pair().await.unwrap().unwrap();
    assert_eq!(stored, pair);

    // The best-effort profile fetch cached the user.
    let profile = session.store().get_cached_profile().await.unwrap().unwrap();
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.email, "alice@example.com");
}

#[tokio::test]
async fn login_rejection_writes_nothing() {
    let (_state, url) = spawn_backend().await;
    let (session, _client) = client_stack(&url).await;
    session.probe().await.unwrap();

    let err = session
        .login(&Credentials {
            username: "alice".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        CoreError::InvalidCredentials { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("Incorrect"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(session.store().get_token_pair().await.unwrap().is_none());
    assert_eq!(session.current_state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn register_returns_profile_without_session_change() {
    let (_state, url) = spawn_backend().await;
    let (session, _client) = client_stack(&url).await;

    let user = session
        .register(&Registration {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(user.username, "bob");
    assert!(user.is_active);
    // Registration neither logs in nor touches the store.
    assert_eq!(session.current_state(), SessionState::Unknown);
    assert!(session.store().get_token_pair().await.unwrap().is_none());
}

#[tokio::test]
async fn stale_token_is_refreshed_and_request_retried() {
    let (state, url) = spawn_backend().await;
    let (session, client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    state.expire_access();

    let tasks = TasksClient::new(client);
    let list = tasks.list().await.unwrap();
    assert_eq!(list.total_count, 1);
    assert_eq!(list.tasks[0].title, "Buy groceries");

    // Exactly one refresh happened and the rotated pair replaced the old one.
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
    let stored = session.store().get_token_pair().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "A2");
    assert_eq!(stored.refresh_token, "R2");
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let (state, url) = spawn_backend().await;
    let (session, client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    state.expire_access();

    let tasks = TasksClient::new(client);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let tasks = tasks.clone();
        handles.push(tokio::spawn(async move { tasks.list().await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
    let stored = session.store().get_token_pair().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "A2");
}

#[tokio::test]
async fn retry_that_401s_again_is_session_expired() {
    let (state, url) = spawn_backend().await;
    let (session, client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    // The refresh succeeds but the fresh token is rejected too.
    state.reject_tasks.store(true, Ordering::SeqCst);

    let tasks = TasksClient::new(client);
    let err = tasks.list().await.unwrap_err();
    assert!(matches!(err, CoreError::SessionExpired { .. }));

    // One refresh, then surrender; no second refresh for the retry's 401.
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_rejection_wipes_credentials() {
    let (state, url) = spawn_backend().await;
    let (session, client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    state.expire_access();
    state.fail_refresh.store(true, Ordering::SeqCst);

    let tasks = TasksClient::new(client);
    let err = tasks.list().await.unwrap_err();
    match err {
        CoreError::SessionExpired { cause } => {
            assert!(matches!(
                *cause,
                CoreError::RefreshFailed {
                    status: Some(401),
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(session.store().get_token_pair().await.unwrap().is_none());
    assert_eq!(session.current_state(), SessionState::Unauthenticated);
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn request_without_stored_tokens_is_session_expired() {
    let (state, url) = spawn_backend().await;
    let (_session, client) = client_stack(&url).await;

    let tasks = TasksClient::new(client);
    let err = tasks.list().await.unwrap_err();
    match err {
        CoreError::SessionExpired { cause } => {
            assert!(matches!(*cause, CoreError::NoRefreshToken));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Failing fast means no exchange was ever attempted.
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn explicit_refresh_rotates_pair() {
    let (state, url) = spawn_backend().await;
    let (session, _client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    let rotated = session.refresh().await.unwrap();
    assert_eq!(rotated.access_token, "A2");
    assert_eq!(rotated.refresh_token, "R2");
    assert_eq!(session.current_state(), SessionState::Authenticated);

    let stored = session.store().get_token_pair().await.unwrap().unwrap();
    assert_eq!(stored, rotated);
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_without_tokens_fails_fast() {
    let (state, url) = spawn_backend().await;
    let (session, _client) = client_stack(&url).await;

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(err, CoreError::NoRefreshToken));
    assert_eq!(session.current_state(), SessionState::Unauthenticated);
    // Fail-fast means no network call.
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let (_state, url) = spawn_backend().await;
    let (session, _client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    session.logout().await.unwrap();
    assert_eq!(session.current_state(), SessionState::Unauthenticated);
    assert!(session.store().get_token_pair().await.unwrap().is_none());
    assert!(session.store().get_cached_profile().await.unwrap().is_none());

    // Logging out again with nothing stored is fine.
    session.logout().await.unwrap();
    assert_eq!(session.current_state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn non_401_errors_pass_through_without_refresh() {
    let (state, url) = spawn_backend().await;
    let (session, client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    state.tasks_server_error.store(true, Ordering::SeqCst);

    let tasks = TasksClient::new(client);
    let err = tasks.list().await.unwrap_err();
    match err {
        CoreError::Api { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("database unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn task_crud_round_trip() {
    let (_state, url) = spawn_backend().await;
    let (session, client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    let tasks = TasksClient::new(client);

    let created = tasks
        .create(&TaskCreate {
            title: "Water the plants".to_string(),
            priority: Some("high".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.title, "Water the plants");
    assert_eq!(created.priority, "high");

    let fetched = tasks.get("t-1").await.unwrap();
    assert_eq!(fetched.id, "t-1");
    assert!(fetched.is_pending());

    let updated = tasks
        .update(
            "t-1",
            &TaskUpdate {
                status: Some("completed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.is_completed());

    let toggled = tasks.toggle("t-1").await.unwrap();
    assert!(toggled.is_completed());

    let deleted = tasks.delete("t-1").await.unwrap();
    assert_eq!(deleted.message, "Task deleted");
}

#[tokio::test]
async fn transcription_uploads_survive_the_retry_path() {
    let (state, url) = spawn_backend().await;
    let (session, client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    // Force the multipart request through the 401-refresh-retry transition;
    // the form must be rebuilt from the retained bytes for the retry.
    state.expire_access();

    let whisper = WhisperClient::new(client);
    let text = whisper
        .transcribe("memo.m4a", "audio/mp4", b"fake audio bytes".to_vec())
        .await
        .unwrap();
    assert_eq!(text, "buy milk tomorrow");
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transcription_reports_in_band_failure() {
    let (state, url) = spawn_backend().await;
    let (session, client) = client_stack(&url).await;
    session.login(&alice()).await.unwrap();

    state.fail_transcription.store(true, Ordering::SeqCst);

    let whisper = WhisperClient::new(client);
    let err = whisper
        .transcribe("memo.m4a", "audio/mp4", b"fake audio bytes".to_vec())
        .await
        .unwrap_err();
    match err {
        CoreError::Transcription { message } => {
            assert!(message.contains("transcription failed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
