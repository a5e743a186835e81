use crate::app::AppContext;
use crate::error::{FaultKind, IngestError};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hyper::Server;
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "rss_ingest",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_text() -> Response {
    match crate::metrics::render() {
        Some(body) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Embed a value into an inline `<script>` block.
fn script_json(value: &Value) -> String {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    json.replace("</", "<\\/")
}

pub fn render_index(document: &Value, container: &str, blob: &str) -> String {
    INDEX_TEMPLATE
        .replace("{{ container }}", &script_json(&Value::from(container)))
        .replace("{{ blob }}", &script_json(&Value::from(blob)))
        .replace("{{ url_data }}", &script_json(document))
}

async fn index(State(ctx): State<AppContext>) -> Html<String> {
    let document = match ctx.loader.load_document().await {
        Ok(doc) => doc,
        Err(reason) => {
            info!("Rendering UI without configuration: {}", reason);
            Value::Null
        }
    };
    let (container, blob) = ctx.loader.location();
    Html(render_index(&document, container, blob))
}

#[derive(Debug, Deserialize)]
pub struct WriteBlobParams {
    pub container: Option<String>,
    #[serde(rename = "blobName", alias = "blob")]
    pub blob_name: Option<String>,
}

async fn write_blob(
    State(ctx): State<AppContext>,
    Query(params): Query<WriteBlobParams>,
    body: Bytes,
) -> Response {
    let container = params.container.filter(|c| !c.trim().is_empty());
    let blob_name = params.blob_name.filter(|b| !b.trim().is_empty());
    let (Some(container), Some(blob_name)) = (container, blob_name) else {
        return (StatusCode::BAD_REQUEST, "Missing 'container' or 'blobName' query parameters").into_response();
    };
    let data: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Rejected write to {}/{}: {}", container, blob_name, e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON body").into_response();
        }
    };

    match ctx.writer.overwrite(&container, &blob_name, &data).await {
        Ok(_) => (StatusCode::OK, "Blob overwritten successfully").into_response(),
        Err(e) => {
            error!("Write to {}/{} failed: {}", container, blob_name, e);
            (status_for(&e), e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IngestParams {
    pub key: Option<String>,
}

async fn ingest(State(ctx): State<AppContext>, Query(params): Query<IngestParams>) -> Response {
    let key = params.key.or_else(|| ctx.config.ingest.routing_key.clone());
    match ctx.ingest.run_cycle(key.as_deref()).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Ingest cycle failed: {}", e);
            (status_for(&e), Json(serde_json::json!({ "error": e.to_string(), "kind": e.kind().as_str() })))
                .into_response()
        }
    }
}

fn status_for(e: &IngestError) -> StatusCode {
    match e.kind() {
        FaultKind::InvalidInput => StatusCode::BAD_REQUEST,
        FaultKind::Network | FaultKind::Remote => StatusCode::BAD_GATEWAY,
        FaultKind::Storage | FaultKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Create the HTTP router: configuration UI, write and ingest endpoints, health and metrics.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let static_dir = ctx.config.server.static_dir.clone();

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/api/write_blob", post(write_blob))
        .route("/api/ingest", post(ingest))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(ctx)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
}

/// Start the HTTP server on the specified port; returns after Ctrl-C.
pub async fn start_server(ctx: AppContext, port: u16) -> anyhow::Result<()> {
    let app = create_router(ctx);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{}", port);
    info!("Health check: http://localhost:{}/health", port);

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down HTTP server");
        })
        .await?;
    Ok(())
}
