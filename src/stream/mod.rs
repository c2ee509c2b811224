//! Server-sent-event framing shared by the provider client, the flow server
//! and the flow client.
//!
//! Two layers live here:
//! - [`SseDecoder`] / [`data_events`] turn a byte stream into the `data:`
//!   payloads of complete events.
//! - [`WireFrame`] is the JSON carried in each flow-stream event:
//!   `{"message": ..}` for a chunk, `{"result": ..}` for the final value and
//!   `{"error": {"status", "message"}}` for a failure after the stream opened.

use std::collections::VecDeque;

use futures::stream::{BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incremental decoder for `text/event-stream` bodies.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the data payload of every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(data) = event_data(&block[..end]) {
                events.push(data);
            }
        }
        events
    }

    /// Flush a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let block = std::mem::take(&mut self.buffer);
        event_data(&block)
    }
}

fn find_blank_line(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn event_data(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let lines: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

struct DecodeState<B, E> {
    bytes: BoxStream<'static, Result<B, E>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Adapt a byte stream into a stream of SSE data payloads.
pub fn data_events<B, E>(
    bytes: impl Stream<Item = Result<B, E>> + Send + 'static,
) -> BoxStream<'static, Result<String, E>>
where
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
{
    let state = DecodeState {
        bytes: bytes.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(data) = st.pending.pop_front() {
                return Some((Ok(data), st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(chunk.as_ref());
                    st.pending.extend(events);
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;
                    if let Some(data) = st.decoder.finish() {
                        st.pending.push_back(data);
                    }
                }
            }
        }
    })
    .boxed()
}

/// Failure details sent inside a stream that was already open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub status: u16,
    pub message: String,
}

/// One JSON frame of a flow stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFrame {
    Message(Value),
    Result(Value),
    Error(WireError),
}

impl WireFrame {
    pub fn to_json(&self) -> String {
        // Serializing a Value-bearing enum cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
