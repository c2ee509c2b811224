//! Model provider abstraction.
//!
//! A provider turns a prompt plus a response schema into JSON, either in one
//! shot ([`ModelProvider::generate`]) or as a stream of progressively more
//! complete snapshots ([`ModelProvider::generate_stream`]).
//!
//! Real implementation: [`GeminiProvider`]. Offline/test double:
//! [`ScriptedProvider`].

pub mod gemini;
pub mod partial_json;
pub mod scripted;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;

use crate::errors::ProviderError;

pub use gemini::GeminiProvider;
pub use scripted::ScriptedProvider;

/// A single structured-output generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Response schema the output must conform to.
    pub schema: Value,
}

/// One item of a generation stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// Best-effort parse of the output so far.
    Partial(Value),
    /// The complete output, parsed strictly.
    Complete(Value),
}

pub type GenerationStream = BoxStream<'static, Result<Generation, ProviderError>>;

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerateRequest) -> Result<Value, ProviderError>;

    /// Start a streaming generation. Errors before the first byte are returned
    /// directly; later errors arrive as stream items. The stream ends after a
    /// `Complete` item or an error.
    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerationStream, ProviderError>;
}

struct SnapshotState {
    deltas: BoxStream<'static, Result<String, ProviderError>>,
    text: String,
    last: Option<Value>,
    done: bool,
}

/// Turn a stream of raw text deltas into partial snapshots followed by the
/// strictly-parsed final value. A snapshot is only emitted when it differs
/// from the previous one.
pub fn snapshots(
    deltas: BoxStream<'static, Result<String, ProviderError>>,
) -> GenerationStream {
    let state = SnapshotState {
        deltas,
        text: String::new(),
        last: None,
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        loop {
            match st.deltas.next().await {
                Some(Ok(delta)) => {
                    st.text.push_str(&delta);
                    if let Some(value) = partial_json::parse(&st.text)
                        && st.last.as_ref() != Some(&value)
                    {
                        st.last = Some(value.clone());
                        return Some((Ok(Generation::Partial(value)), st));
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;
                    let result = parse_complete(&st.text).map(Generation::Complete);
                    return Some((result, st));
                }
            }
        }
    })
    .boxed()
}

/// Strict parse of a finished model output.
pub fn parse_complete(text: &str) -> Result<Value, ProviderError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyOutput);
    }
    serde_json::from_str(text).map_err(|e| ProviderError::Malformed(e.to_string()))
}
