//! Single-article view: one structured post, or a set of streamed outlines.

use std::sync::Arc;

use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::{Endpoint, FlowTransport, Update, typed};
use crate::errors::ClientError;
use crate::schema::{BlogPost, PartialBlogPost};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostViewState {
    pub topic: String,
    pub audience: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Result of the non-streaming request.
    pub post: Option<BlogPost>,
    /// Outlines from the streaming request, as far as they have arrived.
    pub outlines: Vec<PartialBlogPost>,
}

pub struct PostView {
    transport: Arc<dyn FlowTransport>,
    state: PostViewState,
    updates: watch::Sender<PostViewState>,
}

impl PostView {
    pub fn new(transport: Arc<dyn FlowTransport>) -> Self {
        let (updates, _) = watch::channel(PostViewState::default());
        Self {
            transport,
            state: PostViewState::default(),
            updates,
        }
    }

    pub fn state(&self) -> &PostViewState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<PostViewState> {
        self.updates.subscribe()
    }

    fn update(&mut self, f: impl FnOnce(&mut PostViewState)) {
        f(&mut self.state);
        self.updates.send_replace(self.state.clone());
    }

    fn start(&mut self, topic: &str, audience: Option<&str>) -> Value {
        let audience = audience.map(str::trim).filter(|a| !a.is_empty());
        self.update(|s| {
            *s = PostViewState {
                topic: topic.to_string(),
                audience: audience.map(str::to_string),
                is_loading: true,
                ..Default::default()
            }
        });
        let mut input = json!({ "topic": topic });
        if let Some(audience) = audience {
            input["audience"] = Value::String(audience.to_string());
        }
        input
    }

    fn fail(&mut self, error: ClientError) {
        warn!(error = %error, "post view request failed");
        self.update(|s| {
            s.error = Some(error.to_string());
            s.is_loading = false;
        });
    }

    /// One complete post from the structured-output endpoint.
    pub async fn generate_non_streaming(&mut self, topic: &str, audience: Option<&str>) {
        let input = self.start(topic, audience);
        info!(topic, "requesting structured post");

        let result = self
            .transport
            .call(Endpoint::StructuredOutput, input)
            .await
            .and_then(|value| {
                serde_json::from_value::<BlogPost>(value)
                    .map_err(|e| ClientError::Validation(e.to_string()))
            });
        match result {
            Ok(post) => self.update(|s| {
                s.post = Some(post);
                s.is_loading = false;
            }),
            Err(e) => self.fail(e),
        }
    }

    /// Six outlines from the analyze endpoint, updated chunk by chunk.
    pub async fn generate_streaming(&mut self, topic: &str, audience: Option<&str>) {
        let input = self.start(topic, audience);
        info!(topic, "streaming post outlines");

        let frames = match self.transport.stream(Endpoint::AnalyzeBlogPost, input).await {
            Ok(frames) => frames,
            Err(e) => return self.fail(e),
        };
        let mut updates = typed::<Vec<PartialBlogPost>, Vec<BlogPost>>(frames);
        while let Some(update) = updates.next().await {
            match update {
                Ok(Update::Partial(outlines)) => self.update(|s| s.outlines = outlines),
                Ok(Update::Final(posts)) => self.update(|s| {
                    s.outlines = posts.into_iter().map(Into::into).collect();
                    s.is_loading = false;
                }),
                Err(e) => return self.fail(e),
            }
        }
    }
}
