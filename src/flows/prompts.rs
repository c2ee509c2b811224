//! Prompt templates, one per flow. Optional inputs are only mentioned when
//! the caller supplied them.

use crate::schema::{
    AnalyzeBlogPostRequest, CompletePostRequest, PostSummariesRequest, StructuredOutputRequest,
    SubtopicsRequest,
};

pub fn subtopics(input: &SubtopicsRequest) -> String {
    format!(
        "Generate 5-7 unique and compelling subtopics for the main topic: \"{topic}\".\n\
         For each subtopic, provide a short id, a clear title and a brief description that \
         explains how it relates to the main topic.\n\
         Ensure the subtopics are diverse, cover different aspects of the topic, and would \
         appeal to a general audience.",
        topic = input.topic
    )
}

pub fn post_summaries(input: &PostSummariesRequest) -> String {
    format!(
        "Generate 4-6 blog post ideas for the topic \"{topic}\" with a focus on the subtopic \
         \"{subtopic}\".\n\n\
         Subtopic Description: \"{description}\"\n\n\
         For each blog post, provide:\n\
         - A short unique id\n\
         - A compelling and SEO-friendly title\n\
         - A captivating 2-3 sentence summary that hooks the reader\n\
         - An estimated reading time in minutes (realistic for the content described)\n\n\
         Make sure the blog posts are diverse and cover different angles of the subtopic.\n\
         Each post should be unique and provide distinct value to the reader.",
        topic = input.topic,
        subtopic = input.subtopic,
        description = input.description
    )
}

pub fn complete_post(input: &CompletePostRequest) -> String {
    let mut prompt = format!(
        "Create a complete, well-structured blog post based on the following:\n\
         Main Topic: \"{}\"\n\
         Subtopic: \"{}\"\n\
         Summary: \"{}\"\n",
        input.topic, input.subtopic, input.summary
    );
    if let Some(audience) = &input.audience {
        prompt.push_str(&format!("Target Audience: {}\n", audience));
    }
    if let Some(minutes) = input.reading_time {
        prompt.push_str(&format!("Target Reading Time: {} minutes\n", minutes));
    }

    let length = match input.reading_time {
        Some(minutes) => format!("appropriate for a {}-minute read", minutes),
        None => "with detailed explanations".to_string(),
    };
    prompt.push_str(&format!(
        "\nStructure the blog post with:\n\
         - A compelling and SEO-optimized title\n\
         - An engaging 2-3 sentence summary\n\
         - 5-7 main points or sections {}\n\
         - Estimated reading time in minutes\n\
         - 5-8 relevant tags\n\
         - Well-written content that is informative, engaging, and reader-friendly\n\n\
         Make the content original, valuable, and suitable for publishing on a professional blog.",
        length
    ));
    prompt
}

pub fn analyze_blog_post(input: &AnalyzeBlogPostRequest) -> String {
    format!(
        "Create six detailed blog post outlines about \"{}\"{}. Structure each with a \
         compelling title, summary, main points, reading time estimate, and tags.",
        input.topic,
        audience_suffix(input.audience.as_deref())
    )
}

pub fn structured_output(input: &StructuredOutputRequest) -> String {
    format!(
        "Create a detailed blog post outline about \"{}\"{}. Structure it with a compelling \
         title, summary, main points, reading time estimate, and tags.",
        input.topic,
        audience_suffix(input.audience.as_deref())
    )
}

fn audience_suffix(audience: Option<&str>) -> String {
    match audience {
        Some(a) if !a.trim().is_empty() => format!(" for {}", a),
        _ => String::new(),
    }
}
