use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{OutputSchema, array, number, object, string};

/// Reading times are any JSON number; whole values are written back as
/// integers so `7` stays `7` on the wire.
pub(crate) mod minutes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn serialize_opt<S: Serializer>(
        value: &Option<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtopic {
    pub id: String,
    pub title: String,
    pub description: String,
}

impl OutputSchema for Subtopic {
    fn schema() -> Value {
        object(
            &[
                ("id", string("Unique identifier for the subtopic")),
                ("title", string("The subtopic title")),
                ("description", string("Brief description of the subtopic")),
            ],
            &["id", "title", "description"],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "minutes::serialize_opt"
    )]
    pub reading_time: Option<f64>,
}

impl OutputSchema for PostSummary {
    fn schema() -> Value {
        object(
            &[
                ("id", string("Unique identifier for the blog post")),
                ("title", string("The blog post title")),
                ("summary", string("Compelling 2-3 sentence summary")),
                ("readingTime", number("Estimated reading time in minutes")),
            ],
            &["id", "summary"],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub title: String,
    pub summary: String,
    pub main_points: Vec<String>,
    #[serde(serialize_with = "minutes::serialize")]
    pub reading_time: f64,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl OutputSchema for BlogPost {
    fn schema() -> Value {
        object(
            &[
                ("title", string("The blog post title")),
                ("summary", string("Compelling 2-3 sentence summary")),
                (
                    "mainPoints",
                    array(string("One main point"), "5-7 main points from the post"),
                ),
                ("readingTime", number("Estimated reading time in minutes")),
                ("tags", array(string("One tag"), "Relevant tags for the post")),
                ("content", string("The complete blog post content")),
            ],
            &["title", "summary", "mainPoints", "readingTime", "tags"],
        )
    }
}

// ── Partial snapshots ─────────────────────────────────────────────────
//
// Chunks are parsed leniently: every field may still be missing while the
// model is writing.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialSubtopic {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<Subtopic> for PartialSubtopic {
    fn from(s: Subtopic) -> Self {
        Self {
            id: Some(s.id),
            title: Some(s.title),
            description: Some(s.description),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialPostSummary {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub title: Option<String>,
    #[serde(serialize_with = "minutes::serialize_opt")]
    pub reading_time: Option<f64>,
}

impl From<PostSummary> for PartialPostSummary {
    fn from(s: PostSummary) -> Self {
        Self {
            id: Some(s.id),
            summary: Some(s.summary),
            title: s.title,
            reading_time: s.reading_time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PartialBlogPost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_points: Option<Vec<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "minutes::serialize_opt"
    )]
    pub reading_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<BlogPost> for PartialBlogPost {
    fn from(p: BlogPost) -> Self {
        Self {
            title: Some(p.title),
            summary: Some(p.summary),
            main_points: Some(p.main_points),
            reading_time: Some(p.reading_time),
            tags: Some(p.tags),
            content: p.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blog_post_uses_camel_case_on_the_wire() {
        let post: BlogPost = serde_json::from_value(json!({
            "title": "T",
            "summary": "S",
            "mainPoints": ["a"],
            "readingTime": 4,
            "tags": ["x"]
        }))
        .unwrap();
        assert_eq!(post.reading_time, 4.0);
        assert_eq!(post.content, None);

        let back = serde_json::to_value(&post).unwrap();
        assert!(back.get("mainPoints").is_some());
        assert!(back.get("content").is_none());
    }

    #[test]
    fn reading_time_accepts_any_json_number() {
        let post: BlogPost = serde_json::from_value(json!({
            "title": "t",
            "summary": "s",
            "mainPoints": [],
            "readingTime": 7.5,
            "tags": []
        }))
        .unwrap();
        assert_eq!(post.reading_time, 7.5);
        assert_eq!(serde_json::to_value(&post).unwrap()["readingTime"], json!(7.5));

        let partial: PartialBlogPost =
            serde_json::from_value(json!({"title": "t", "readingTime": 5.0})).unwrap();
        assert_eq!(partial.reading_time, Some(5.0));

        let summary: PostSummary =
            serde_json::from_value(json!({"id": "p1", "summary": "s", "readingTime": 5.0}))
                .unwrap();
        assert_eq!(summary.reading_time, Some(5.0));
        let partial: PartialPostSummary =
            serde_json::from_value(json!({"id": "p1", "readingTime": 7.5})).unwrap();
        assert_eq!(partial.reading_time, Some(7.5));
    }

    #[test]
    fn whole_reading_times_serialize_as_integers() {
        let partial = PartialBlogPost {
            reading_time: Some(5.0),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&partial).unwrap()["readingTime"], json!(5));
        assert!(serde_json::to_value(PartialBlogPost::default())
            .unwrap()
            .get("readingTime")
            .is_none());
    }

    #[test]
    fn blog_post_rejects_missing_required_field() {
        let result: Result<BlogPost, _> = serde_json::from_value(json!({"title": "T"}));
        assert!(result.is_err());
    }

    #[test]
    fn partial_blog_post_accepts_any_prefix() {
        let partial: PartialBlogPost =
            serde_json::from_value(json!({"title": "Half", "mainPoints": ["one"]})).unwrap();
        assert_eq!(partial.title.as_deref(), Some("Half"));
        assert_eq!(partial.main_points, Some(vec!["one".to_string()]));
        assert!(partial.tags.is_none());
    }

    #[test]
    fn post_summary_optional_fields() {
        let summary: PostSummary =
            serde_json::from_value(json!({"id": "p1", "summary": "Short"})).unwrap();
        assert_eq!(summary.title, None);
        assert_eq!(summary.reading_time, None);
    }

    #[test]
    fn blog_post_schema_marks_content_optional() {
        let schema = BlogPost::schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"title"));
        assert!(!required.contains(&"content"));
    }
}
