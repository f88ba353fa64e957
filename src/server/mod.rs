//! HTTP API
//!
//! | Method | Path                          | 說明                     |
//! |--------|-------------------------------|--------------------------|
//! | GET    | `/healthz`                    | 存活檢查                 |
//! | GET    | `/health`                     | 序列筆數與更新統計       |
//! | GET    | `/metrics`                    | API 呼叫次數與回應時間   |
//! | GET    | `/api/carbon-price`           | 最新一筆報價             |
//! | GET    | `/api/carbon-price/history`   | 保留中的所有報價         |
//! | POST   | `/api/carbon-price/update`    | 立即執行一次更新         |

use std::{sync::Arc, time::Instant};

use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    event::carbon_price::{CycleStats, Updater},
    logging,
    server::metrics::{ApiMetrics, LatencyStats},
};

pub mod metrics;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub updater: Arc<Updater>,
    pub metrics: Arc<ApiMetrics>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(updater: Arc<Updater>) -> Self {
        AppState {
            updater,
            metrics: Arc::new(ApiMetrics::default()),
            started_at: Instant::now(),
        }
    }

    fn system(&self) -> SystemInfo {
        SystemInfo {
            uptime_secs: self.started_at.elapsed().as_secs(),
            version: VERSION,
            num_cpu: num_cpus::get(),
        }
    }

    fn data(&self) -> DataInfo {
        let store = self.updater.store();
        DataInfo {
            last_update: self.updater.stats().last_update,
            has_data: !store.is_empty(),
            records: store.len(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    uptime_secs: u64,
    version: &'static str,
    num_cpu: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    last_update: Option<DateTime<Local>>,
    has_data: bool,
    records: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    system: SystemInfo,
    data: DataInfo,
    stats: CycleStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInfo {
    calls: u64,
    errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    latency: LatencyStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    timestamp: String,
    system: SystemInfo,
    api: ApiInfo,
    data: DataInfo,
    update_count: u64,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    // 只有 /api 底下的路由計入呼叫統計
    let api = Router::new()
        .route("/api/carbon-price", get(latest))
        .route("/api/carbon-price/history", get(history))
        .route("/api/carbon-price/update", post(update))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_api));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(api)
        .layer(cors)
        .with_state(state)
}

async fn track_api(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(req).await;
    let status = response.status();
    state
        .metrics
        .record(start.elapsed(), status.is_client_error() || status.is_server_error());

    response
}

/// 啟動 HTTP 服務，直到發生錯誤才返回
pub async fn start(port: u16, state: AppState) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    logging::info_file_async(format!("HTTP server listening on {}", addr));

    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "time": Local::now().to_rfc3339() }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let data = state.data();

    Json(HealthResponse {
        status: if data.has_data { "ok" } else { "no_data" },
        system: state.system(),
        data,
        stats: state.updater.stats(),
    })
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let stats = state.updater.stats();

    Json(MetricsResponse {
        timestamp: Local::now().to_rfc3339(),
        system: state.system(),
        api: ApiInfo {
            calls: state.metrics.calls(),
            errors: state.metrics.errors(),
            last_error: stats.last_error,
            latency: state.metrics.latency_stats(),
        },
        data: state.data(),
        update_count: stats.update_count,
    })
}

async fn latest(State(state): State<AppState>) -> Response {
    match state.updater.store().latest() {
        Some(quote) => Json(quote).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No price info available" })),
        )
            .into_response(),
    }
}

async fn history(State(state): State<AppState>) -> Response {
    Json(state.updater.store().history()).into_response()
}

async fn update(State(state): State<AppState>) -> Response {
    match state.updater.run_update_cycle().await {
        Ok(quote) => Json(json!({ "message": "Price info updated", "data": quote })).into_response(),
        Err(why) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": why.to_string() })),
        )
            .into_response(),
    }
}
