//! Human-readable completion status line in subtopic bodies.

use once_cell::sync::Lazy;
use regex::Regex;

static STATUS_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*(?:[-*][ \t]+)?(?:\*\*)?Status:(?:\*\*)?[ \t]*)(.*?)\r?$")
        .expect("valid status line regex")
});

pub const STATUS_COMPLETED: &str = "✅ Completed";
pub const STATUS_NOT_COMPLETED: &str = "❌ Not completed";

pub fn status_text(completed: bool) -> &'static str {
    if completed {
        STATUS_COMPLETED
    } else {
        STATUS_NOT_COMPLETED
    }
}

/// Rewrites the first `Status:` line to match `completed`.
///
/// Bodies without such a line are returned unchanged.
pub fn rewrite_status_line(body: &str, completed: bool) -> String {
    let Some(value) = STATUS_LINE_RE.captures(body).and_then(|caps| caps.get(2)) else {
        return body.to_string();
    };
    let target = status_text(completed);
    if value.as_str() == target {
        return body.to_string();
    }

    let mut out = String::with_capacity(body.len() + target.len());
    out.push_str(&body[..value.start()]);
    out.push_str(target);
    out.push_str(&body[value.end()..]);
    out
}
