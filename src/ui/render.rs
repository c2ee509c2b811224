//! Plain-text rendering of board and post view state.
//!
//! Output is styled with `console`; colours are dropped automatically when
//! stdout is not a terminal. Long text is wrapped with `textwrap`.

use std::fmt::Write as _;

use console::{Emoji, style};

use super::icons::{CHECK, CLOCK, COLUMN, CROSS, HOURGLASS, PLUG, POST, RETRY, WARNING};
use crate::board::{BoardState, Card, CardError, ErrorKind, PostViewState};
use crate::schema::{BlogPost, PartialBlogPost};

pub const DEFAULT_WIDTH: usize = 88;

const CARD_INDENT: &str = "      ";

pub fn error_icon(kind: ErrorKind) -> Emoji<'static, 'static> {
    match kind {
        ErrorKind::Timeout => CLOCK,
        ErrorKind::Network => PLUG,
        ErrorKind::Validation => WARNING,
        ErrorKind::Summary | ErrorKind::Post => CROSS,
    }
}

fn wrap_into(out: &mut String, text: &str, indent: &str, width: usize) {
    let options = textwrap::Options::new(width.max(indent.len() + 20))
        .initial_indent(indent)
        .subsequent_indent(indent);
    for line in textwrap::wrap(text, options) {
        let _ = writeln!(out, "{}", line);
    }
}

fn card_error_line(error: &CardError) -> String {
    let text = format!(
        "{}{}: {}",
        error_icon(error.kind),
        error.kind.label(),
        error.message
    );
    let text = if error.kind.is_transient() {
        style(text).yellow()
    } else {
        style(text).red()
    };
    if error.retry_count > 0 {
        format!("{} {}", text, style(format!("(retries: {})", error.retry_count)).dim())
    } else {
        text.to_string()
    }
}

fn render_card(out: &mut String, card: &Card, width: usize) {
    let title = match &card.title {
        Some(title) => style(title.as_str()).bold().to_string(),
        None => style("Writing…").dim().to_string(),
    };
    let reading = card
        .reading_time
        .map(|m| format!(" {}", style(format!("· {} min", m)).dim()))
        .unwrap_or_default();
    let mark = if card.is_complete() { CHECK } else { POST };
    let _ = writeln!(out, "   {}{}{}", mark, title, reading);

    if let Some(summary) = &card.summary {
        wrap_into(out, summary, CARD_INDENT, width);
    }
    for point in card.main_points.iter().flatten() {
        wrap_into(out, &format!("• {}", point), CARD_INDENT, width);
    }
    if let Some(tags) = card.tags.as_ref().filter(|t| !t.is_empty()) {
        let tags: Vec<String> = tags.iter().map(|t| format!("#{}", t)).collect();
        let _ = writeln!(out, "{}{}", CARD_INDENT, style(tags.join(" ")).cyan());
    }
    if let Some(error) = &card.error {
        let _ = writeln!(out, "{}{}", CARD_INDENT, card_error_line(error));
    } else if card.retry_count > 0 {
        let _ = writeln!(
            out,
            "{}{}",
            CARD_INDENT,
            style(format!("{}regenerated after {} retries", RETRY, card.retry_count)).dim()
        );
    }
}

pub fn render_board(state: &BoardState, width: usize) -> String {
    let mut out = String::new();

    let mut heading = format!("Board: {}", style(&state.topic).bold());
    if let Some(audience) = &state.audience {
        let _ = write!(heading, " {}", style(format!("(for {})", audience)).dim());
    }
    let _ = writeln!(out, "{}", heading);

    if let Some(error) = &state.error {
        let _ = writeln!(out, "{}{}", CROSS, style(error).red().bold());
    }

    for column in &state.columns {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}{}", COLUMN, style(&column.subtopic).bold().underlined());
        if !column.description.is_empty() {
            wrap_into(&mut out, &column.description, "   ", width);
        }
        if column.is_loading {
            let _ = writeln!(out, "   {}{}", HOURGLASS, style("Loading summaries…").dim());
        }
        if let Some(error) = &column.error {
            let line = format!("{}{}: {}", CROSS, ErrorKind::Summary.label(), error);
            let _ = writeln!(out, "   {}", style(line).red());
        }
        for card in &column.cards {
            render_card(&mut out, card, width);
        }
    }

    if state.is_generating {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}{}", HOURGLASS, style("Generating…").dim());
    }
    out
}

fn render_outline(out: &mut String, index: usize, post: &PartialBlogPost, width: usize) {
    let title = post.title.as_deref().unwrap_or("…");
    let _ = writeln!(out, "{}. {}", index + 1, style(title).bold());
    if let Some(summary) = &post.summary {
        wrap_into(out, summary, "   ", width);
    }
    for point in post.main_points.iter().flatten() {
        wrap_into(out, &format!("• {}", point), "   ", width);
    }
}

fn render_full_post(out: &mut String, post: &BlogPost, width: usize) {
    let _ = writeln!(
        out,
        "{} {}",
        style(&post.title).bold().underlined(),
        style(format!("· {} min", post.reading_time)).dim()
    );
    wrap_into(out, &post.summary, "", width);
    let _ = writeln!(out);
    for point in &post.main_points {
        wrap_into(out, &format!("• {}", point), "  ", width);
    }
    if !post.tags.is_empty() {
        let tags: Vec<String> = post.tags.iter().map(|t| format!("#{}", t)).collect();
        let _ = writeln!(out, "{}", style(tags.join(" ")).cyan());
    }
    if let Some(content) = &post.content {
        let _ = writeln!(out);
        for paragraph in content.split("\n\n") {
            wrap_into(out, paragraph.trim(), "", width);
            let _ = writeln!(out);
        }
    }
}

pub fn render_post(state: &PostViewState, width: usize) -> String {
    let mut out = String::new();
    if let Some(error) = &state.error {
        let _ = writeln!(out, "{}{}", CROSS, style(error).red().bold());
    }
    if let Some(post) = &state.post {
        render_full_post(&mut out, post, width);
    }
    for (i, outline) in state.outlines.iter().enumerate() {
        if i > 0 {
            let _ = writeln!(out);
        }
        render_outline(&mut out, i, outline, width);
    }
    if state.is_loading {
        let _ = writeln!(out, "{}{}", HOURGLASS, style("Generating…").dim());
    }
    out
}
