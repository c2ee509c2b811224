//! In-memory [`FlowTransport`] for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::StreamExt;
use serde::Serialize;
use serde_json::{Value, json};

use super::{Endpoint, FlowTransport, FrameStream, StreamFrame};
use crate::errors::ClientError;

#[derive(Debug, Clone)]
pub enum Reply {
    /// Open the stream and emit these items.
    Frames(Vec<Result<StreamFrame, ClientError>>),
    /// Fail before the stream opens.
    Fail(ClientError),
}

impl Reply {
    /// One partial chunk (the first half of the fields) then the final value.
    pub fn value<T: Serialize>(value: T) -> Self {
        let value = json!(value);
        Reply::Frames(vec![
            Ok(StreamFrame::Chunk(first_half(&value))),
            Ok(StreamFrame::Result(value)),
        ])
    }

    /// A chunk, then a mid-stream failure.
    pub fn broken(chunk: Value, error: ClientError) -> Self {
        Reply::Frames(vec![Ok(StreamFrame::Chunk(chunk)), Err(error)])
    }
}

fn first_half(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(first_half).collect()),
        Value::Object(map) => {
            let keep = map.len().div_ceil(2);
            Value::Object(
                map.iter()
                    .take(keep)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

struct Route {
    endpoint: Endpoint,
    needle: Option<String>,
    replies: VecDeque<Reply>,
}

/// Routes match on endpoint and, optionally, a substring of the serialized
/// input. The first matching route answers; a route with several replies
/// hands them out in order and then repeats the last one.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<(Endpoint, Value)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, endpoint: Endpoint, reply: Reply) -> Self {
        self.route(endpoint, None, vec![reply])
    }

    pub fn on_input(self, endpoint: Endpoint, needle: &str, replies: Vec<Reply>) -> Self {
        self.route(endpoint, Some(needle.to_string()), replies)
    }

    fn route(self, endpoint: Endpoint, needle: Option<String>, replies: Vec<Reply>) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(Route {
                endpoint,
                needle,
                replies: replies.into(),
            });
        }
        self
    }

    pub fn calls(&self) -> Vec<(Endpoint, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, input)| input)
            .collect()
    }

    fn reply(&self, endpoint: Endpoint, input: &Value) -> Reply {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((endpoint, input.clone()));
        }
        let text = input.to_string();
        let mut routes = match self.routes.lock() {
            Ok(routes) => routes,
            Err(_) => return Reply::Fail(ClientError::Remote("fake poisoned".into())),
        };
        let route = routes.iter_mut().find(|r| {
            r.endpoint == endpoint && r.needle.as_ref().is_none_or(|n| text.contains(n.as_str()))
        });
        let reply = match route {
            Some(route) if route.replies.len() > 1 => route.replies.pop_front(),
            Some(route) => route.replies.front().cloned(),
            None => None,
        };
        reply.unwrap_or_else(|| {
            Reply::Fail(ClientError::Status {
                status: 404,
                message: format!("no fake route for {}", endpoint),
            })
        })
    }
}

#[async_trait]
impl FlowTransport for FakeTransport {
    async fn stream(&self, endpoint: Endpoint, input: Value) -> Result<FrameStream, ClientError> {
        match self.reply(endpoint, &input) {
            Reply::Frames(items) => Ok(futures::stream::iter(items).boxed()),
            Reply::Fail(e) => Err(e),
        }
    }

    async fn call(&self, endpoint: Endpoint, input: Value) -> Result<Value, ClientError> {
        match self.reply(endpoint, &input) {
            Reply::Frames(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Ok(StreamFrame::Result(value)) => Some(Ok(value)),
                    Ok(StreamFrame::Chunk(_)) => None,
                    Err(e) => Some(Err(e)),
                })
                .next()
                .unwrap_or(Err(ClientError::Incomplete)),
            Reply::Fail(e) => Err(e),
        }
    }
}
