use serde::{Deserialize, Serialize};

use super::blog::minutes;
use super::{Validate, check_max, check_required};
use crate::errors::ValidationError;

const TOPIC_MAX: usize = 500;
const SUBTOPIC_MAX: usize = 500;
const AUDIENCE_MAX: usize = 500;
const DESCRIPTION_MAX: usize = 1000;
const SUMMARY_MAX: usize = 1000;
const READING_TIME_MIN: f64 = 1.0;
const READING_TIME_MAX: f64 = 60.0;

fn check_topic(topic: &str) -> Result<(), ValidationError> {
    check_required("topic", topic, "Topic", TOPIC_MAX)
}

fn check_audience(audience: Option<&str>) -> Result<(), ValidationError> {
    match audience {
        Some(a) => check_max("audience", a, "Audience", AUDIENCE_MAX),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtopicsRequest {
    #[serde(default)]
    pub topic: String,
}

impl Validate for SubtopicsRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_topic(&self.topic)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostSummariesRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub subtopic: String,
    /// Subtopic description for context.
    #[serde(default)]
    pub description: String,
}

impl Validate for PostSummariesRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_topic(&self.topic)?;
        check_required("subtopic", &self.subtopic, "Subtopic", SUBTOPIC_MAX)?;
        check_required(
            "description",
            &self.description,
            "Description",
            DESCRIPTION_MAX,
        )
    }
}

/// Input of the complete-post flow. The board sends `audience`; callers that
/// know a target length send `readingTime`. Both are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePostRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub subtopic: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "minutes::serialize_opt"
    )]
    pub reading_time: Option<f64>,
}

impl Validate for CompletePostRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_topic(&self.topic)?;
        check_required("subtopic", &self.subtopic, "Subtopic", SUBTOPIC_MAX)?;
        check_required("summary", &self.summary, "Summary", SUMMARY_MAX)?;
        check_audience(self.audience.as_deref())?;
        if let Some(minutes) = self.reading_time {
            if minutes < READING_TIME_MIN {
                return Err(ValidationError::new(
                    "readingTime",
                    "Reading time must be at least 1 minute",
                ));
            }
            if minutes > READING_TIME_MAX {
                return Err(ValidationError::new(
                    "readingTime",
                    "Reading time must not exceed 60 minutes",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeBlogPostRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl Validate for AnalyzeBlogPostRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_topic(&self.topic)?;
        check_audience(self.audience.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredOutputRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl Validate for StructuredOutputRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_topic(&self.topic)?;
        check_audience(self.audience.as_deref())
    }
}
