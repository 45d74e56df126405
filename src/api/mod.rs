//! Local HTTP surface for the GUI add-on.
//!
//! Command endpoints enqueue background work and acknowledge immediately;
//! the polling endpoints expose task snapshots. The daemon trusts its
//! callers: it binds loopback by default and carries no authentication.

// Allow clippy lint triggered by utoipa's OpenApi derive macro
#![allow(clippy::needless_for_each)]

pub mod ratings;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::build_info;
use crate::config::Config;
use crate::core::{Gateway, Task, TaskRegistry};

/// Shared application state.
pub struct AppState {
    /// Every task for the process lifetime.
    pub registry: Arc<TaskRegistry>,

    /// Shared client for the marketplace API.
    pub gateway: Gateway,

    /// Signals `serve` to stop.
    shutdown: Notify,

    /// Last time a client polled `/report`; read by the idle watchdog.
    last_report: Mutex<Instant>,
}

impl AppState {
    /// Build state from configuration: one registry, one shared gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be constructed.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let gateway = Gateway::new(
            &config.remote.server,
            config.remote.request_timeout(),
            config.remote.connect_timeout(),
        )?;

        Ok(Self {
            registry: Arc::new(TaskRegistry::new()),
            gateway,
            shutdown: Notify::new(),
            last_report: Mutex::new(Instant::now()),
        })
    }
}

pub type SharedState = Arc<AppState>;

/// `OpenAPI` documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "AssetKit Daemon API",
        description = "Local command and polling surface for the AssetKit add-on",
        version = "0.3.0",
        license(name = "MIT")
    ),
    paths(
        index,
        report,
        get_task,
        ratings::get_rating,
        ratings::send_rating,
        ratings::get_bookmarks,
        shutdown
    ),
    components(schemas(
        Task,
        crate::core::TaskStatus,
        ReportRequest,
        ratings::GetRatingRequest,
        ratings::SendRatingRequest,
        ratings::GetBookmarksRequest
    ))
)]
struct ApiDoc;

/// Build the daemon router.
#[must_use]
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/report", get(report).post(report))
        .route("/tasks/{task_id}", get(get_task))
        .route("/ratings/get_rating", post(ratings::get_rating))
        .route("/ratings/send_rating", post(ratings::send_rating))
        .route("/ratings/get_bookmarks", post(ratings::get_bookmarks))
        .route("/shutdown", get(shutdown))
        .route("/api/openapi.json", get(openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the daemon HTTP server.
///
/// Runs until Ctrl-C, a `/shutdown` request, or the idle watchdog fires.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let state: SharedState = Arc::new(AppState::new(config)?);
    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", config.daemon.host, config.daemon.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        server = %state.gateway.server(),
        version = %build_info::version_string(),
        "daemon listening"
    );

    if let Some(window) = config.daemon.idle_timeout() {
        tokio::spawn(idle_watchdog(Arc::clone(&state), window));
    }

    let shutdown_state = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("interrupt received, shutting down"),
                () = shutdown_state.shutdown.notified() => tracing::info!("shutting down"),
            }
        })
        .await?;

    Ok(())
}

/// Stop the daemon once no client has polled `/report` for `window`.
///
/// The GUI add-on polls continuously while it is alive, so a silent window
/// means every client is gone and the daemon would linger unused.
async fn idle_watchdog(state: SharedState, window: Duration) {
    let period = (window / 10).max(Duration::from_millis(50));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let idle = state.last_report.lock().elapsed();
        if idle >= window {
            tracing::info!(
                idle_secs = idle.as_secs(),
                "no poll within the idle window, shutting down"
            );
            state.shutdown.notify_one();
            return;
        }
    }
}

/// Liveness probe; the add-on reads the PID from the body.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Daemon alive", body = String))
)]
async fn index() -> String {
    format!(
        "assetkitd {} pid={}",
        build_info::version_string(),
        std::process::id()
    )
}

/// Poll request from one GUI session.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ReportRequest {
    /// Polling GUI session.
    pub app_id: i64,
    /// Optional narrowing to one operation kind.
    #[serde(default)]
    pub task_type: Option<String>,
}

/// All tasks belonging to the polling session, in creation order.
#[utoipa::path(
    get,
    path = "/report",
    request_body = ReportRequest,
    responses((status = 200, description = "Task snapshots", body = Vec<Task>))
)]
async fn report(
    State(state): State<SharedState>,
    Json(req): Json<ReportRequest>,
) -> Json<Vec<Task>> {
    *state.last_report.lock() = Instant::now();
    Json(state.registry.for_app(req.app_id, req.task_type.as_deref()))
}

/// Snapshot of a single task.
#[utoipa::path(
    get,
    path = "/tasks/{task_id}",
    params(("task_id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task snapshot", body = Task),
        (status = 404, description = "Unknown task")
    )
)]
async fn get_task(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, (StatusCode, String)> {
    state
        .registry
        .get(&task_id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("unknown task {task_id}")))
}

/// Graceful shutdown, requested by the add-on when the GUI closes.
#[utoipa::path(
    get,
    path = "/shutdown",
    responses((status = 200, description = "Shutdown acknowledged", body = String))
)]
async fn shutdown(State(state): State<SharedState>) -> &'static str {
    tracing::info!("shutdown requested");
    state.shutdown.notify_one();
    "ok"
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tokio::time::timeout;
    use tower::ServiceExt;

    use super::*;
    use crate::config::RemoteConfig;
    use crate::core::TaskStatus;

    /// State whose gateway points at a port nothing listens on.
    fn unreachable_state() -> SharedState {
        let config = Config {
            remote: RemoteConfig {
                server: "http://127.0.0.1:1".to_string(),
                request_timeout_secs: 2,
                connect_timeout_secs: 1,
            },
            ..Default::default()
        };
        Arc::new(AppState::new(&config).unwrap())
    }

    /// State whose gateway points at a server that accepts and stalls.
    async fn stalled_state() -> SharedState {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    while let Ok(n) = socket.read(&mut buf).await {
                        if n == 0 {
                            break;
                        }
                    }
                });
            }
        });

        let config = Config {
            remote: RemoteConfig {
                server: format!("http://{addr}"),
                request_timeout_secs: 5,
                connect_timeout_secs: 5,
            },
            ..Default::default()
        };
        Arc::new(AppState::new(&config).unwrap())
    }

    fn get_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn wait_for_terminal(state: &SharedState, task_id: &str) -> Task {
        timeout(Duration::from_secs(3), async {
            loop {
                if let Some(task) = state.registry.get(task_id) {
                    if task.status.is_terminal() {
                        return task;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("task never settled")
    }

    #[tokio::test]
    async fn index_reports_the_daemon_pid() {
        let state = unreachable_state();
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(&std::process::id().to_string()));
    }

    #[tokio::test]
    async fn report_returns_own_tasks_in_creation_order() {
        let state = unreachable_state();
        let first = state
            .registry
            .insert(Task::new(json!({}), 1, "ratings/get_rating", "queued"));
        let second = state
            .registry
            .insert(Task::new(json!({}), 1, "ratings/get_bookmarks", "queued"));
        state
            .registry
            .insert(Task::new(json!({}), 2, "ratings/get_rating", "queued"));
        let app = router(Arc::clone(&state));

        let response = app
            .oneshot(get_json("/report", json!({"app_id": 1})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let tasks: Vec<Task> = serde_json::from_str(&body_string(response).await).unwrap();
        let ids: Vec<String> = tasks.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn report_narrows_by_task_type() {
        let state = unreachable_state();
        state
            .registry
            .insert(Task::new(json!({}), 1, "ratings/get_rating", "queued"));
        let bookmarks = state
            .registry
            .insert(Task::new(json!({}), 1, "ratings/get_bookmarks", "queued"));
        let app = router(Arc::clone(&state));

        let response = app
            .oneshot(get_json(
                "/report",
                json!({"app_id": 1, "task_type": "ratings/get_bookmarks"}),
            ))
            .await
            .unwrap();

        let tasks: Vec<Task> = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, bookmarks);
    }

    #[tokio::test]
    async fn report_without_app_id_is_rejected() {
        let state = unreachable_state();
        let app = router(Arc::clone(&state));

        let response = app.oneshot(get_json("/report", json!({}))).await.unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_task_is_a_404() {
        let state = unreachable_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/tasks/task_does_not_exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn task_snapshot_is_served_by_id() {
        let state = unreachable_state();
        let id = state
            .registry
            .insert(Task::new(json!({}), 1, "ratings/get_rating", "queued"));
        let app = router(Arc::clone(&state));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/tasks/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let task: Task = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(task.id, id);
        assert_eq!(task.status, TaskStatus::Created);
    }

    #[tokio::test]
    async fn malformed_command_creates_no_task() {
        let state = unreachable_state();
        let app = router(Arc::clone(&state));

        // asset_id missing
        let response = app
            .oneshot(post_json(
                "/ratings/get_rating",
                json!({"app_id": 1, "api_key": ""}),
            ))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn command_ack_is_generic_and_precedes_completion() {
        let state = stalled_state().await;
        let app = router(Arc::clone(&state));

        let response = app
            .oneshot(post_json(
                "/ratings/get_rating",
                json!({"app_id": 1, "asset_id": "123", "api_key": ""}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");

        // The remote is stalled, so the task cannot have settled yet.
        let tasks = state.registry.for_app(1, None);
        assert_eq!(tasks.len(), 1);
        assert!(!tasks[0].status.is_terminal());
    }

    #[tokio::test]
    async fn command_failure_lands_on_the_task_only() {
        let state = unreachable_state();
        let app = router(Arc::clone(&state));

        let response = app
            .oneshot(post_json(
                "/ratings/send_rating",
                json!({
                    "app_id": 1,
                    "asset_id": "123",
                    "rating_type": "overall",
                    "rating_value": 5,
                    "api_key": "k"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let id = state.registry.for_app(1, None)[0].id.clone();
        let task = wait_for_terminal(&state, &id).await;
        assert_eq!(task.status, TaskStatus::Error);
        assert!(task.message.contains("Sending rating failed"));
        assert!(task.result.is_none());
    }

    #[tokio::test]
    async fn shutdown_endpoint_signals_the_server() {
        let state = unreachable_state();
        let app = router(Arc::clone(&state));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/shutdown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
        timeout(Duration::from_millis(100), state.shutdown.notified())
            .await
            .expect("shutdown was not signalled");
    }

    #[tokio::test]
    async fn idle_watchdog_fires_after_a_silent_window() {
        let state = unreachable_state();
        tokio::spawn(idle_watchdog(
            Arc::clone(&state),
            Duration::from_millis(120),
        ));

        timeout(Duration::from_secs(1), state.shutdown.notified())
            .await
            .expect("watchdog never fired");
    }

    #[tokio::test]
    async fn report_poll_resets_the_idle_window() {
        let state = unreachable_state();
        let app = router(Arc::clone(&state));
        tokio::spawn(idle_watchdog(
            Arc::clone(&state),
            Duration::from_millis(400),
        ));

        // Poll for two full windows; each poll must push the deadline back.
        for _ in 0..8 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let response = app
                .clone()
                .oneshot(get_json("/report", json!({"app_id": 1})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(
            timeout(Duration::from_millis(10), state.shutdown.notified())
                .await
                .is_err(),
            "watchdog fired despite steady polling"
        );

        // With polling stopped the window finally runs out.
        timeout(Duration::from_secs(2), state.shutdown.notified())
            .await
            .expect("watchdog never fired after polling stopped");
    }

    #[tokio::test]
    async fn openapi_document_lists_the_command_routes() {
        let state = unreachable_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let spec: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(spec["paths"]["/ratings/get_rating"].is_object());
        assert!(spec["paths"]["/report"].is_object());
        assert!(spec["paths"]["/shutdown"].is_object());
    }
}
