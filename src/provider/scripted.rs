use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::StreamExt;
use serde_json::Value;

use super::{GenerateRequest, GenerationStream, ModelProvider, parse_complete, snapshots};
use crate::errors::ProviderError;

const DEFAULT_FRAGMENT_LEN: usize = 12;

#[derive(Debug, Clone)]
enum Outcome {
    Respond(Value),
    Fail(ProviderError),
    /// Stream the first `keep` characters of the value, then fail.
    Interrupt {
        value: Value,
        keep: usize,
        error: ProviderError,
    },
}

#[derive(Debug, Clone)]
struct Script {
    needle: String,
    outcome: Outcome,
}

/// Provider that answers from canned responses, chosen by the first script
/// whose needle occurs in the prompt. Responses are streamed through the
/// same snapshot path as a real provider, split into small text fragments.
pub struct ScriptedProvider {
    scripts: Vec<Script>,
    fragment_len: usize,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            scripts: Vec::new(),
            fragment_len: DEFAULT_FRAGMENT_LEN,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, needle: impl Into<String>, value: Value) -> Self {
        self.scripts.push(Script {
            needle: needle.into(),
            outcome: Outcome::Respond(value),
        });
        self
    }

    pub fn fail(mut self, needle: impl Into<String>, error: ProviderError) -> Self {
        self.scripts.push(Script {
            needle: needle.into(),
            outcome: Outcome::Fail(error),
        });
        self
    }

    pub fn interrupt(
        mut self,
        needle: impl Into<String>,
        value: Value,
        keep: usize,
        error: ProviderError,
    ) -> Self {
        self.scripts.push(Script {
            needle: needle.into(),
            outcome: Outcome::Interrupt { value, keep, error },
        });
        self
    }

    pub fn with_fragment_len(mut self, len: usize) -> Self {
        self.fragment_len = len.max(1);
        self
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn lookup(&self, prompt: &str) -> Result<Outcome, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.scripts
            .iter()
            .find(|s| prompt.contains(&s.needle))
            .map(|s| s.outcome.clone())
            .ok_or_else(|| ProviderError::Status {
                status: 404,
                body: "no scripted response matches prompt".to_string(),
            })
    }

    fn fragments(&self, text: &str) -> Vec<Result<String, ProviderError>> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.fragment_len)
            .map(|c| Ok(c.iter().collect()))
            .collect()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<Value, ProviderError> {
        match self.lookup(&request.prompt)? {
            Outcome::Respond(value) => parse_complete(&value.to_string()),
            Outcome::Fail(error) | Outcome::Interrupt { error, .. } => Err(error),
        }
    }

    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerationStream, ProviderError> {
        let parts = match self.lookup(&request.prompt)? {
            Outcome::Respond(value) => self.fragments(&value.to_string()),
            Outcome::Fail(error) => return Err(error),
            Outcome::Interrupt { value, keep, error } => {
                let text: String = value.to_string().chars().take(keep).collect();
                let mut parts = self.fragments(&text);
                parts.push(Err(error));
                parts
            }
        };
        Ok(snapshots(futures::stream::iter(parts).boxed()))
    }
}
