//! Best-effort parsing of an incomplete JSON document.
//!
//! While the model is still writing, the accumulated text is a prefix of a
//! JSON value. [`parse`] closes any open string, drops a dangling comma and
//! closes every open array/object. When that does not yield valid JSON (a
//! half-written key, literal or escape) it backs off one character at a time
//! until it does.

use serde_json::Value;

/// Parse the longest usable prefix of `text`. Returns `None` when nothing
/// parseable has been written yet.
pub fn parse(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    let mut end = text.len();
    while end > 0 {
        let prefix = &text[..end];
        if let Some(candidate) = complete(prefix)
            && let Ok(value) = serde_json::from_str(&candidate)
        {
            return Some(value);
        }
        end = prev_char_boundary(text, end);
    }
    None
}

fn prev_char_boundary(text: &str, mut index: usize) -> usize {
    index -= 1;
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Append the closers `prefix` needs. `None` when the prefix cannot be
/// closed as-is (e.g. it ends inside an escape sequence).
fn complete(prefix: &str) -> Option<String> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in prefix.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }

    if escaped {
        return None;
    }

    let mut out = prefix.to_string();
    if in_string {
        out.push('"');
    } else {
        let trimmed_len = out.trim_end().len();
        out.truncate(trimmed_len);
        if out.ends_with(',') {
            out.pop();
        }
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    Some(out)
}
