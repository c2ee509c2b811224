//! Generation flows.
//!
//! A flow binds one input type, one prompt template and one output schema.
//! Running a flow validates the input before any model call, relays every
//! partial output as a [`FlowEvent::Chunk`], and finishes with the final
//! output parsed into the flow's typed output.

pub mod prompts;

use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::FlowError;
use crate::provider::{GenerateRequest, Generation, ModelProvider};
use crate::schema::{
    AnalyzeBlogPostRequest, BlogPost, CompletePostRequest, OutputSchema, PostSummariesRequest,
    PostSummary, StructuredOutputRequest, Subtopic, SubtopicsRequest, Validate,
};

pub trait Flow: Send + Sync + 'static {
    const NAME: &'static str;
    type Input: DeserializeOwned + Validate + Send + 'static;
    type Output: Serialize + DeserializeOwned + OutputSchema + Send + 'static;

    fn prompt(input: &Self::Input) -> String;
}

/// One item of a running flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent<T> {
    Chunk(Value),
    Done(T),
}

pub type FlowStream<T> = BoxStream<'static, Result<FlowEvent<T>, FlowError>>;

pub struct SubtopicsFlow;

impl Flow for SubtopicsFlow {
    const NAME: &'static str = "generateSubtopics";
    type Input = SubtopicsRequest;
    type Output = Vec<Subtopic>;

    fn prompt(input: &Self::Input) -> String {
        prompts::subtopics(input)
    }
}

pub struct PostSummariesFlow;

impl Flow for PostSummariesFlow {
    const NAME: &'static str = "generateBlogPostSummaries";
    type Input = PostSummariesRequest;
    type Output = Vec<PostSummary>;

    fn prompt(input: &Self::Input) -> String {
        prompts::post_summaries(input)
    }
}

pub struct CompletePostFlow;

impl Flow for CompletePostFlow {
    const NAME: &'static str = "generateCompleteBlogPost";
    type Input = CompletePostRequest;
    type Output = BlogPost;

    fn prompt(input: &Self::Input) -> String {
        prompts::complete_post(input)
    }
}

/// Legacy: six outlines for a topic in one stream.
pub struct AnalyzeBlogPostFlow;

impl Flow for AnalyzeBlogPostFlow {
    const NAME: &'static str = "analyzeBlogPost";
    type Input = AnalyzeBlogPostRequest;
    type Output = Vec<BlogPost>;

    fn prompt(input: &Self::Input) -> String {
        prompts::analyze_blog_post(input)
    }
}

/// Legacy: a single outline, generated without streaming.
pub struct StructuredOutputFlow;

impl Flow for StructuredOutputFlow {
    const NAME: &'static str = "generateStructuredOutput";
    type Input = StructuredOutputRequest;
    type Output = BlogPost;

    fn prompt(input: &Self::Input) -> String {
        prompts::structured_output(input)
    }
}

fn request_for<F: Flow>(input: &F::Input) -> GenerateRequest {
    GenerateRequest {
        prompt: F::prompt(input),
        schema: <F::Output as OutputSchema>::schema(),
    }
}

/// Parse a complete model output into the flow's typed output.
fn finalize<F: Flow>(value: Value) -> Result<F::Output, FlowError> {
    serde_json::from_value(value).map_err(|e| {
        warn!(flow = F::NAME, error = %e, "model output failed schema validation");
        FlowError::Schema {
            flow: F::NAME,
            message: e.to_string(),
        }
    })
}

/// Run a flow in streaming mode.
///
/// Validation and failures to open the provider stream are returned
/// directly; anything after that arrives as an `Err` item, which ends the
/// stream.
pub async fn stream<F: Flow>(
    provider: &dyn ModelProvider,
    input: F::Input,
) -> Result<FlowStream<F::Output>, FlowError> {
    input.validate()?;
    info!(flow = F::NAME, provider = provider.name(), "starting streaming flow");

    let generations = provider.generate_stream(request_for::<F>(&input)).await?;
    let events = generations
        .map(|item| match item {
            Ok(Generation::Partial(value)) => Ok(FlowEvent::Chunk(value)),
            Ok(Generation::Complete(value)) => {
                debug!(flow = F::NAME, "flow complete");
                finalize::<F>(value).map(FlowEvent::Done)
            }
            Err(e) => {
                warn!(flow = F::NAME, error = %e, "provider stream failed");
                Err(FlowError::from(e))
            }
        })
        .boxed();
    Ok(events)
}

/// Run a flow in streaming mode and keep only its final output.
pub async fn run<F: Flow>(
    provider: &dyn ModelProvider,
    input: F::Input,
) -> Result<F::Output, FlowError> {
    let mut events = stream::<F>(provider, input).await?;
    while let Some(event) = events.next().await {
        if let FlowEvent::Done(output) = event? {
            return Ok(output);
        }
    }
    Err(crate::errors::ProviderError::EmptyOutput.into())
}

/// Run a flow with a single non-streaming model call.
pub async fn generate<F: Flow>(
    provider: &dyn ModelProvider,
    input: F::Input,
) -> Result<F::Output, FlowError> {
    input.validate()?;
    info!(flow = F::NAME, provider = provider.name(), "starting flow");
    let value = provider.generate(request_for::<F>(&input)).await?;
    finalize::<F>(value)
}
