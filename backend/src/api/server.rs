//! HTTP Server for the sheetload API.
//!
//! Provides REST endpoints for spreadsheet upload and import.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/upload`         | Upload a spreadsheet for import      |
//! | POST   | `/api/upload`     | Same as `/upload`                    |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LogBroadcaster;
use super::types::{
    error_response, import_error_response, outcome_response, server_error_response, ApiResponse,
    MSG_NO_FILE, MSG_TOO_LARGE,
};
use crate::config::AppConfig;
use crate::error::{ServerError, ServerResult};
use crate::import::{run_import, ImportContext};
use crate::parser::SheetSelector;
use crate::store::{RecordStore, SqliteStore};

/// Room for multipart boundaries and the `sheet` field on top of the file cap.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub logs: LogBroadcaster,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: AppConfig) -> Self {
        Self {
            store,
            logs: LogBroadcaster::new(),
            config: Arc::new(config),
        }
    }

    pub fn with_logs(mut self, logs: LogBroadcaster) -> Self {
        self.logs = logs;
        self
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    // Permissive CORS for the browser client
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/api/upload", post(upload))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Open the datastore and start the HTTP server
pub async fn start_server(config: AppConfig) -> ServerResult<()> {
    let store = SqliteStore::connect(&config.database_url).await?;
    let port = config.port;
    let database_url = config.database_url.clone();
    let state = AppState::new(Arc::new(store), config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Sheetload server running on http://localhost:{}", port);
    println!("   POST /upload     - Upload spreadsheet");
    println!("   GET  /api/logs   - SSE log stream");
    println!("   GET  /health     - Health check");
    println!();
    println!("💾 Database: {}", database_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "sheetload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /upload",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.logs.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Parts of an upload request.
struct Upload {
    bytes: Vec<u8>,
    file_name: Option<String>,
    sheet: Option<String>,
}

async fn read_upload(multipart: &mut Multipart, max_bytes: usize) -> Result<Upload, ApiResponse> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut sheet: Option<String> = None;

    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            (StatusCode::PAYLOAD_TOO_LARGE, Json(error_response(MSG_TOO_LARGE)))
        } else {
            server_error_response(&ServerError::BadRequest(format!("Multipart error: {}", e)))
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                bytes = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            "sheet" => {
                sheet = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let bytes = bytes
        .filter(|b| !b.is_empty())
        .ok_or_else(|| server_error_response(&ServerError::BadRequest(MSG_NO_FILE.to_string())))?;

    if bytes.len() > max_bytes {
        return Err((StatusCode::PAYLOAD_TOO_LARGE, Json(error_response(MSG_TOO_LARGE))));
    }

    Ok(Upload { bytes, file_name, sheet })
}

/// Upload spreadsheet endpoint
async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResponse {
    let upload = match read_upload(&mut multipart, state.config.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW UPLOAD: {} ({} bytes)",
        upload.file_name.as_deref().unwrap_or("unknown"),
        upload.bytes.len()
    );
    println!("{}\n", "=".repeat(70));

    let mut ctx = ImportContext::today()
        .with_sheet(SheetSelector::from_name(upload.sheet.as_deref()))
        .with_header_policy(state.config.header_policy);
    if let Some(name) = upload.file_name {
        ctx = ctx.with_file_name(name);
    }

    match run_import(&upload.bytes, &ctx, state.store.as_ref(), &state.logs).await {
        Ok(outcome) => outcome_response(&outcome),
        Err(e) => {
            eprintln!("❌ Import error: {}", e);
            import_error_response(&e)
        }
    }
}
