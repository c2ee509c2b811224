//! Client for the flow endpoints.
//!
//! [`FlowTransport`] is the seam the board orchestrator talks through;
//! [`FlowClient`] implements it over HTTP with `reqwest`, decoding the SSE
//! frames the server emits. [`typed`] turns the raw frames of one stream
//! into typed partial snapshots followed by the typed final value.

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::errors::ClientError;
use crate::stream::{WireFrame, data_events};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Backend endpoints the client knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Subtopics,
    PostSummaries,
    Post,
    AnalyzeBlogPost,
    StructuredOutput,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Subtopics => "/api/blog/subtopics",
            Endpoint::PostSummaries => "/api/blog/post-summaries",
            Endpoint::Post => "/api/blog/post",
            Endpoint::AnalyzeBlogPost => "/api/blog/analyze-blog-post",
            Endpoint::StructuredOutput => "/api/blog/structured-output",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// One decoded frame of a flow stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Chunk(Value),
    Result(Value),
}

pub type FrameStream = BoxStream<'static, Result<StreamFrame, ClientError>>;

#[async_trait]
pub trait FlowTransport: Send + Sync {
    /// Open a streaming call. The stream yields chunks and then one result;
    /// a failure reported by the server arrives as an `Err` item.
    async fn stream(&self, endpoint: Endpoint, input: Value) -> Result<FrameStream, ClientError>;

    /// Non-streaming call; returns the payload of the response envelope.
    async fn call(&self, endpoint: Endpoint, input: Value) -> Result<Value, ClientError>;
}

/// One typed item of a flow stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Update<P, T> {
    Partial(P),
    Final(T),
}

struct TypedState {
    frames: FrameStream,
    done: bool,
}

/// Decode raw frames into typed updates.
///
/// Chunks that do not fit `P` are skipped. A result that does not fit `T`
/// is a validation error; a stream that ends without a result is
/// [`ClientError::Incomplete`].
pub fn typed<P, T>(frames: FrameStream) -> BoxStream<'static, Result<Update<P, T>, ClientError>>
where
    P: DeserializeOwned + Send + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let state = TypedState {
        frames,
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        loop {
            match st.frames.next().await {
                Some(Ok(StreamFrame::Chunk(value))) => match serde_json::from_value::<P>(value) {
                    Ok(partial) => return Some((Ok(Update::Partial(partial)), st)),
                    Err(e) => trace!(error = %e, "skipping chunk that does not fit partial shape"),
                },
                Some(Ok(StreamFrame::Result(value))) => {
                    st.done = true;
                    let item = serde_json::from_value::<T>(value)
                        .map(Update::Final)
                        .map_err(|e| ClientError::Validation(e.to_string()));
                    return Some((item, st));
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;
                    return Some((Err(ClientError::Incomplete), st));
                }
            }
        }
    })
    .boxed()
}

/// HTTP implementation of [`FlowTransport`].
#[derive(Clone)]
pub struct FlowClient {
    http: reqwest::Client,
    base_url: String,
}

impl FlowClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        input: Value,
        streaming: bool,
    ) -> Result<reqwest::Response, ClientError> {
        debug!(endpoint = %endpoint, streaming, "calling flow endpoint");
        let mut request = self
            .http
            .post(self.url(endpoint))
            .json(&json!({ "data": input }));
        if streaming {
            request = request.header(ACCEPT, "text/event-stream");
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&body, status),
        })
    }
}

/// Message of an `{error, status}` body, or the raw body, or the status text.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body)
        && let Some(message) = value.get("error").and_then(Value::as_str)
    {
        return message.to_string();
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn decode_frame(data: &str) -> Result<StreamFrame, ClientError> {
    let frame: WireFrame = serde_json::from_str(data)
        .map_err(|e| ClientError::Validation(format!("unreadable stream frame: {}", e)))?;
    match frame {
        WireFrame::Message(value) => Ok(StreamFrame::Chunk(value)),
        WireFrame::Result(value) => Ok(StreamFrame::Result(value)),
        WireFrame::Error(err) => Err(ClientError::Remote(err.message)),
    }
}

#[async_trait]
impl FlowTransport for FlowClient {
    async fn stream(&self, endpoint: Endpoint, input: Value) -> Result<FrameStream, ClientError> {
        let response = self.send(endpoint, input, true).await?;
        let frames = data_events(response.bytes_stream())
            .map(|data| decode_frame(&data.map_err(ClientError::from)?))
            .boxed();
        Ok(frames)
    }

    async fn call(&self, endpoint: Endpoint, input: Value) -> Result<Value, ClientError> {
        let response = self.send(endpoint, input, false).await?;
        let mut body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        ["result", "data"]
            .iter()
            .find_map(|key| body.get_mut(*key).map(Value::take))
            .ok_or_else(|| ClientError::Validation("response has no result".to_string()))
    }
}
