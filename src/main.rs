use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use ems_core::adapters::http::HttpBundleSource;
use ems_core::adapters::mail_store::FsMailStore;
use ems_core::adapters::pdf::CommandPdfConverter;
use ems_core::adapters::transmitter_from_config;
use ems_core::constants::{DISPATCH_FAILED, INBOUND_FAILED};
use ems_core::{
    AdapterConfig, DispatchPipeline, EmailSettings, HtmlReportRenderer, InboundPipeline,
};

const HTTP_ADDR_ENV: &str = "EMS_HTTP_ADDR";
const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Shared state for the HTTP handlers.
///
/// Both pipelines share one lock so only a single dispatch runs at a time.
#[derive(Clone)]
struct AppState {
    dispatch: Arc<DispatchPipeline>,
    inbound: Option<Arc<InboundPipeline>>,
    lock: Arc<Mutex<()>>,
}

#[derive(Serialize, ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct DispatchReq {
    /// `Encounter/1`, an absolute encounter URL, or a bare id
    encounter_id: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, dispatch_report, inbound_report),
    components(schemas(HealthRes, DispatchReq))
)]
struct ApiDoc;

/// Main entry point for the EMS report service
///
/// Builds the dispatch and inbound pipelines from the environment and serves the REST API.
///
/// # Environment Variables
/// - `EMS_HTTP_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `EMS_REPORT_*`: outgoing email settings (required)
/// - `EMS_FHIR_BASE_URL`, `EMS_PDF_COMMAND`, `EMS_SMTP_*`, `EMS_OUTBOX_DIR`,
///   `EMS_MAIL_STORE_DIR`: adapter settings
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ems=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var(HTTP_ADDR_ENV).unwrap_or_else(|_| DEFAULT_HTTP_ADDR.into());

    // The blocking HTTP client must be created off the async runtime.
    let state = tokio::task::spawn_blocking(build_state).await??;

    tracing::info!("++ Starting EMS REST on {}", addr);

    let app = Router::new()
        .route("/health", get(health))
        .route("/encounter-reports", post(dispatch_report))
        .route("/inbound", post(inbound_report))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_state() -> anyhow::Result<AppState> {
    let settings = EmailSettings::from_env()?;
    let config = AdapterConfig::from_env()?;

    let dispatch = DispatchPipeline::new(
        settings.clone(),
        HttpBundleSource::new(config.fhir_base_url.clone(), config.http_timeout)?,
        HtmlReportRenderer::new(),
        CommandPdfConverter::new(config.pdf_command.clone()),
        transmitter_from_config(&config)?,
    );

    let inbound = match &config.mail_store_dir {
        Some(dir) => Some(Arc::new(InboundPipeline::new(
            settings,
            FsMailStore::new(dir.clone()),
            CommandPdfConverter::new(config.pdf_command.clone()),
            transmitter_from_config(&config)?,
        ))),
        None => {
            tracing::warn!("EMS_MAIL_STORE_DIR not set, inbound reports are disabled");
            None
        }
    };

    Ok(AppState {
        dispatch: Arc::new(dispatch),
        inbound,
        lock: Arc::new(Mutex::new(())),
    })
}

/// Run `job` on the blocking pool while holding the dispatch lock.
async fn run_serialised<T, F>(lock: Arc<Mutex<()>>, job: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        job()
    })
    .await;

    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("dispatch task failed: {:?}", e);
            None
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "EMS report service is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/encounter-reports",
    request_body = DispatchReq,
    responses(
        (status = 200, description = "Report sent", body = String),
        (status = 500, description = "Report could not be built or sent", body = String)
    )
)]
/// Build, convert and email the report for one encounter
async fn dispatch_report(
    State(state): State<AppState>,
    Json(req): Json<DispatchReq>,
) -> (StatusCode, &'static str) {
    let pipeline = state.dispatch.clone();
    let outcome = run_serialised(state.lock.clone(), move || {
        pipeline.dispatch(&req.encounter_id)
    })
    .await;

    match outcome {
        Some(outcome) if outcome.is_success() => (StatusCode::OK, outcome.status_line()),
        Some(outcome) => (StatusCode::INTERNAL_SERVER_ERROR, outcome.status_line()),
        None => (StatusCode::INTERNAL_SERVER_ERROR, DISPATCH_FAILED),
    }
}

#[utoipa::path(
    post,
    path = "/inbound",
    request_body = String,
    responses(
        (status = 200, description = "Inbound report re-sent", body = String),
        (status = 500, description = "Inbound report could not be processed", body = String)
    )
)]
/// Re-send a report received by email, given the mail notification event
async fn inbound_report(State(state): State<AppState>, body: String) -> (StatusCode, &'static str) {
    let Some(pipeline) = state.inbound.clone() else {
        tracing::error!("inbound report received but no mail store is configured");
        return (StatusCode::INTERNAL_SERVER_ERROR, INBOUND_FAILED);
    };

    let outcome = run_serialised(state.lock.clone(), move || pipeline.process(&body)).await;

    match outcome {
        Some(outcome) if outcome.is_success() => (StatusCode::OK, outcome.status_line()),
        Some(outcome) => (StatusCode::INTERNAL_SERVER_ERROR, outcome.status_line()),
        None => (StatusCode::INTERNAL_SERVER_ERROR, INBOUND_FAILED),
    }
}
