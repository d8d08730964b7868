//! Heading-delimited body sections.
//!
//! # Responsibility
//! - Locate a section by heading text and replace its content.
//! - Render the subtopic checklist into a section.
//!
//! # Invariants
//! - A section runs from its heading line to the next heading of the same or
//!   higher level, or to the end of the body.
//! - Missing headings leave the body untouched.
//! - Replacing a section with its current content returns the input unchanged.

use crate::model::reference::to_link;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*?)[ \t]*$").expect("valid heading regex"));

const FENCE_MARKERS: [&str; 2] = ["```", "~~~"];

/// Checklist glyph for one subtopic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistMark {
    /// Subtopic resolved and completed.
    Done,
    /// Subtopic resolved, not completed.
    Open,
    /// Reference is dangling.
    Missing,
}

impl ChecklistMark {
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Done => "✅",
            Self::Open => "❌",
            Self::Missing => "❓",
        }
    }

    /// Renders one checklist line for `item`.
    pub fn render(self, item: &str) -> String {
        let link = to_link(item);
        match self {
            Self::Done | Self::Open => format!("- {link} {}", self.glyph()),
            Self::Missing => format!("- {} {link} (Missing)", self.glyph()),
        }
    }
}

struct SectionSpan {
    content: Range<usize>,
    heading_terminated: bool,
    has_next_heading: bool,
}

/// Replaces the content under `heading` with `new_content`.
///
/// Blank lines around the old content are kept so repeated calls settle on
/// the same text. Returns `body` unchanged when the heading is absent.
pub fn replace_section(body: &str, heading: &str, new_content: &str) -> String {
    let Some(section) = find_section(body, heading) else {
        return body.to_string();
    };
    let newline = if body.contains("\r\n") { "\r\n" } else { "\n" };
    let content = &body[section.content.clone()];
    let new_core = new_content.trim_matches(is_blank).replace("\r\n", "\n");
    let new_core = if newline == "\n" {
        new_core
    } else {
        new_core.replace('\n', newline)
    };

    let core_start = content.len() - content.trim_start_matches(is_blank).len();
    let core_end = content.trim_end_matches(is_blank).len();

    if core_start >= core_end {
        if new_core.is_empty() {
            return body.to_string();
        }
        let mut replacement = String::new();
        if !section.heading_terminated {
            replacement.push_str(newline);
        }
        replacement.push_str(newline);
        replacement.push_str(&new_core);
        replacement.push_str(newline);
        if section.has_next_heading {
            replacement.push_str(newline);
        }
        return splice(body, section.content, &replacement);
    }

    if new_core.is_empty() {
        let replacement = if section.has_next_heading { newline } else { "" };
        return splice(body, section.content, replacement);
    }

    let start = section.content.start + core_start;
    let end = section.content.start + core_end;
    if body[start..end] == new_core {
        return body.to_string();
    }
    splice(body, start..end, &new_core)
}

/// Rewrites the section under `heading` as one checklist line per item, in
/// list order, using `status_fn` to pick each line's glyph.
pub fn rebuild_checklist<F>(body: &str, heading: &str, items: &[String], status_fn: F) -> String
where
    F: Fn(&str) -> ChecklistMark,
{
    let lines: Vec<String> = items
        .iter()
        .map(|item| status_fn(item).render(item))
        .collect();
    replace_section(body, heading, &lines.join("\n"))
}

fn find_section(body: &str, heading: &str) -> Option<SectionSpan> {
    let mut cursor = 0;
    let mut in_fence = false;
    let mut found: Option<(usize, usize, bool)> = None;

    while cursor < body.len() {
        let end = match body[cursor..].find('\n') {
            Some(offset) => cursor + offset + 1,
            None => body.len(),
        };
        let line = body[cursor..end].trim_end_matches(['\n', '\r']);
        let line_start = cursor;
        cursor = end;

        if FENCE_MARKERS
            .iter()
            .any(|marker| line.trim_start().starts_with(marker))
        {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some(caps) = HEADING_RE.captures(line) else {
            continue;
        };
        let level = caps.get(1).map_or(0, |m| m.as_str().len());
        let text = caps.get(2).map_or("", |m| m.as_str());

        match found {
            None if text == heading => {
                found = Some((level, end, body[line_start..end].ends_with('\n')));
            }
            Some((found_level, content_start, heading_terminated)) if level <= found_level => {
                return Some(SectionSpan {
                    content: content_start..line_start,
                    heading_terminated,
                    has_next_heading: true,
                });
            }
            _ => {}
        }
    }

    found.map(|(_, content_start, heading_terminated)| SectionSpan {
        content: content_start..body.len(),
        heading_terminated,
        has_next_heading: false,
    })
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

fn splice(text: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..range.start]);
    out.push_str(replacement);
    out.push_str(&text[range.end..]);
    out
}
