use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, warn};

use crate::config::Settings;
use crate::errors::FlowError;
use crate::flows::{
    self, AnalyzeBlogPostFlow, CompletePostFlow, Flow, FlowEvent, FlowStream, PostSummariesFlow,
    StructuredOutputFlow, SubtopicsFlow,
};
use crate::provider::ModelProvider;
use crate::schema::StructuredOutputRequest;
use crate::stream::{WireError, WireFrame};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub provider: Arc<dyn ModelProvider>,
    pub settings: Settings,
}

pub type SharedState = Arc<AppState>;

/// Method, path and purpose of every route, logged at startup.
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("POST", "/api/blog/subtopics", "stream subtopics for a topic"),
    ("POST", "/api/blog/post-summaries", "stream post summaries for a subtopic"),
    ("POST", "/api/blog/post", "stream a complete blog post"),
    ("POST", "/api/blog/analyze-blog-post", "stream six outlines (legacy)"),
    ("POST", "/api/blog/structured-output", "one outline, non-streaming (legacy)"),
    ("GET", "/health", "health check"),
];

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Internal(msg) => msg,
        };
        (
            status,
            Json(serde_json::json!({"error": message, "status": status.as_u16()})),
        )
            .into_response()
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Validation(e) => ApiError::BadRequest(e.message),
            other => {
                error!(error = %other, "flow failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

// ── Request extraction ────────────────────────────────────────────────

/// Flow input taken from a JSON body, bare or wrapped as `{"data": ..}`,
/// together with whether the caller negotiated a streaming response.
pub struct FlowInput<T> {
    pub input: T,
    pub streaming: bool,
}

impl<S, T> FromRequest<S> for FlowInput<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let streaming = wants_stream(req.headers(), req.uri().query());
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge(e.body_text())
            } else {
                ApiError::BadRequest(e.body_text())
            }
        })?;

        let body: Value = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
        };

        let input = serde_json::from_value(unwrap_envelope(body))
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
        Ok(Self { input, streaming })
    }
}

/// `{"data": x}` becomes `x`; anything else is passed through.
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn wants_stream(headers: &HeaderMap, query: Option<&str>) -> bool {
    let accepts_sse = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("text/event-stream"));
    let stream_param = query
        .map(|q| {
            q.split('&')
                .any(|pair| matches!(pair, "stream=true" | "stream=1"))
        })
        .unwrap_or(false);
    accepts_sse || stream_param
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/blog/subtopics", post(flow_handler::<SubtopicsFlow>))
        .route(
            "/api/blog/post-summaries",
            post(flow_handler::<PostSummariesFlow>),
        )
        .route("/api/blog/post", post(flow_handler::<CompletePostFlow>))
        .route(
            "/api/blog/analyze-blog-post",
            post(flow_handler::<AnalyzeBlogPostFlow>),
        )
        .route("/api/blog/structured-output", post(structured_output))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct FlowResult<T> {
    result: T,
}

#[derive(Serialize)]
struct StructuredOutput<T> {
    success: bool,
    data: T,
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

async fn flow_handler<F: Flow>(
    State(state): State<SharedState>,
    FlowInput { input, streaming }: FlowInput<F::Input>,
) -> Result<Response, ApiError> {
    if streaming {
        let events = flows::stream::<F>(state.provider.as_ref(), input).await?;
        Ok(sse_response(events).into_response())
    } else {
        let result = flows::run::<F>(state.provider.as_ref(), input).await?;
        Ok(Json(FlowResult { result }).into_response())
    }
}

async fn structured_output(
    State(state): State<SharedState>,
    FlowInput { input, .. }: FlowInput<StructuredOutputRequest>,
) -> Result<Json<StructuredOutput<<StructuredOutputFlow as Flow>::Output>>, ApiError> {
    let data = flows::generate::<StructuredOutputFlow>(state.provider.as_ref(), input).await?;
    Ok(Json(StructuredOutput {
        success: true,
        data,
    }))
}

fn wire_frame<T: Serialize>(item: Result<FlowEvent<T>, FlowError>) -> WireFrame {
    match item {
        Ok(FlowEvent::Chunk(value)) => WireFrame::Message(value),
        Ok(FlowEvent::Done(output)) => match serde_json::to_value(output) {
            Ok(value) => WireFrame::Result(value),
            Err(e) => WireFrame::Error(WireError {
                status: 500,
                message: e.to_string(),
            }),
        },
        Err(e) => {
            warn!(error = %e, "flow failed after stream opened");
            WireFrame::Error(WireError {
                status: e.status_code(),
                message: e.to_string(),
            })
        }
    }
}

fn sse_response<T>(
    events: FlowStream<T>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Send + 'static,
{
    let frames = events.map(|item| Ok(Event::default().data(wire_frame(item).to_json())));
    Sse::new(frames).keep_alive(KeepAlive::default())
}
