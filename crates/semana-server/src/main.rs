//! semana-server — the Semana functions service.
//!
//! Hosts the two planner functions over HTTP:
//!
//! - `POST /functions/weekly-planner` — generate and persist the week's plan
//! - `POST /functions/proactive-notifications` — scan tasks/feedback and
//!   insert due notifications
//! - `GET  /health` — server status
//!
//! Both POST routes require `Authorization: Bearer <token>`, where the token
//! comes from `[server] api_token` in the config file (or the
//! SEMANA_API_TOKEN environment variable). Requests without a valid token get
//! 401; persistence failures surface as 500 with the underlying message.
//!
//! Run: `cargo run -p semana-server`

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use semana_core::learning::ANALYSIS_WINDOW;
use semana_core::notify::proactive_scan;
use semana_core::planner::{
    PlanBundle, PlanOutcome, PlanStrategy, ProductivityHistory, WeeklyPlanner,
};
use semana_core::storage::{Config, Database};

// ── Server state ──────────────────────────────────────────────────────────

struct ServerState {
    api_token: Option<String>,
    user_id: String,
}

impl ServerState {
    fn from_config(config: &Config) -> Self {
        let api_token = std::env::var("SEMANA_API_TOKEN")
            .ok()
            .or_else(|| config.server.api_token.clone());
        Self {
            api_token,
            user_id: config.server.user_id.clone(),
        }
    }

    /// Check the Authorization header against the configured token.
    ///
    /// An unset token disables the service: every request is rejected.
    fn authorize(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.api_token.as_deref() else {
            return false;
        };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected)
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

fn internal_error(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

// ── Weekly planner function ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeeklyPlannerRequest {
    week_start_date: String,
    #[serde(default)]
    strategy: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeeklyPlannerResponse {
    success: bool,
    weekly_plan: Option<semana_core::planner::WeeklyPlan>,
    statistics: Option<semana_core::planner::PlanStatistics>,
    insights: Vec<semana_core::planner::PlanInsight>,
}

impl WeeklyPlannerResponse {
    fn empty() -> Self {
        Self {
            success: true,
            weekly_plan: None,
            statistics: None,
            insights: Vec::new(),
        }
    }

    fn from_bundle(bundle: PlanBundle) -> Self {
        Self {
            success: true,
            weekly_plan: Some(bundle.plan),
            statistics: Some(bundle.statistics),
            insights: bundle.insights,
        }
    }
}

async fn weekly_planner(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<WeeklyPlannerRequest>,
) -> Response {
    if !state.authorize(&headers) {
        return unauthorized();
    }

    let Ok(week_start) = NaiveDate::parse_from_str(&request.week_start_date, "%Y-%m-%d") else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("invalid weekStartDate '{}'", request.week_start_date)
            })),
        )
            .into_response();
    };
    let strategy = match request.strategy.as_deref() {
        None => PlanStrategy::default(),
        Some(raw) => match PlanStrategy::parse(raw) {
            Some(strategy) => strategy,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("invalid strategy '{raw}'") })),
                )
                    .into_response();
            }
        },
    };

    let user = state.user_id.clone();
    let result = tokio::task::spawn_blocking(move || run_planner(&user, week_start, strategy)).await;

    match result {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(e)) => {
            tracing::error!("weekly planner failed: {e}");
            internal_error(e.to_string())
        }
        Err(e) => internal_error(e.to_string()),
    }
}

fn run_planner(
    user: &str,
    week_start: NaiveDate,
    strategy: PlanStrategy,
) -> Result<WeeklyPlannerResponse, semana_core::CoreError> {
    let db = Database::open()?;
    let config = Config::load()?;

    let completed = db.completed_tasks_since(user, 30)?;
    let sessions = db.sessions_since(user, 30)?;
    let history = ProductivityHistory::from_records(&completed, &sessions);
    let tasks = db.list_tasks(user)?;

    let planner = WeeklyPlanner::new(&config.planner, &history);
    match planner.plan(user, week_start, strategy, &tasks) {
        PlanOutcome::NothingToPlan => Ok(WeeklyPlannerResponse::empty()),
        PlanOutcome::Planned(bundle) => {
            db.upsert_weekly_plan(&bundle.plan)?;
            Ok(WeeklyPlannerResponse::from_bundle(*bundle))
        }
    }
}

// ── Proactive notifications function ──────────────────────────────────────

#[derive(Debug, Serialize)]
struct NotificationsResponse {
    success: bool,
    notifications_created: u32,
}

async fn proactive_notifications(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Response {
    if !state.authorize(&headers) {
        return unauthorized();
    }

    let user = state.user_id.clone();
    let result = tokio::task::spawn_blocking(move || run_scan(&user)).await;

    match result {
        Ok(Ok(created)) => (
            StatusCode::OK,
            Json(NotificationsResponse {
                success: true,
                notifications_created: created,
            }),
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!("notification scan failed: {e}");
            internal_error(e.to_string())
        }
        Err(e) => internal_error(e.to_string()),
    }
}

fn run_scan(user: &str) -> Result<u32, semana_core::CoreError> {
    let db = Database::open()?;
    let tasks = db.list_tasks(user)?;
    let feedback = db.recent_feedback(user, ANALYSIS_WINDOW)?;
    let drafts = proactive_scan(user, &tasks, &feedback, Utc::now());

    let mut created = 0u32;
    for draft in &drafts {
        if db.insert_notification_unique(draft)? {
            created += 1;
        }
    }
    Ok(created)
}

// ── Health ────────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "semana-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Entry point ───────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::error!("failed to load configuration: {e}");
        std::process::exit(1);
    });
    let addr = std::env::var("SEMANA_SERVER_BIND").unwrap_or_else(|_| config.server.bind_addr.clone());

    let state = Arc::new(ServerState::from_config(&config));
    if state.api_token.is_none() {
        tracing::warn!("no api_token configured; all function requests will be rejected");
    }

    let app = Router::new()
        .route("/health", get(health))
        .route("/functions/weekly-planner", post(weekly_planner))
        .route("/functions/proactive-notifications", post(proactive_notifications))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        });
    tracing::info!("semana-server listening on {addr}");

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn state_with_token(token: Option<&str>) -> ServerState {
        ServerState {
            api_token: token.map(|t| t.to_string()),
            user_id: "local".to_string(),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_authorize_accepts_matching_token() {
        let state = state_with_token(Some("secreto"));
        assert!(state.authorize(&bearer("secreto")));
    }

    #[test]
    fn test_authorize_rejects_bad_or_missing_token() {
        let state = state_with_token(Some("secreto"));
        assert!(!state.authorize(&bearer("otro")));
        assert!(!state.authorize(&HeaderMap::new()));

        let mut malformed = HeaderMap::new();
        malformed.insert(header::AUTHORIZATION, HeaderValue::from_static("secreto"));
        assert!(!state.authorize(&malformed));
    }

    #[test]
    fn test_unset_token_rejects_everything() {
        let state = state_with_token(None);
        assert!(!state.authorize(&bearer("cualquiera")));
    }

    #[test]
    fn test_request_body_shape() {
        let parsed: WeeklyPlannerRequest =
            serde_json::from_str(r#"{"weekStartDate":"2025-03-10","strategy":"focused"}"#).unwrap();
        assert_eq!(parsed.week_start_date, "2025-03-10");
        assert_eq!(parsed.strategy.as_deref(), Some("focused"));

        let minimal: WeeklyPlannerRequest =
            serde_json::from_str(r#"{"weekStartDate":"2025-03-10"}"#).unwrap();
        assert!(minimal.strategy.is_none());
    }

    #[test]
    fn test_empty_response_shape() {
        let value = serde_json::to_value(WeeklyPlannerResponse::empty()).unwrap();
        assert_eq!(value["success"], true);
        assert!(value["weeklyPlan"].is_null());
    }
}
