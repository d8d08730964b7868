//! Typed field access over a raw metadata block.
//!
//! # Responsibility
//! - Scan a block into an ordered list of top-level field descriptors.
//! - Read field values with shape-aware decoding (scalar, bool, date, lists).
//! - Upsert or extend one field while leaving every other byte untouched.
//!
//! # Invariants
//! - Upserting a value that is already present returns the input unchanged.
//! - Only the matched field's bytes are rewritten; other lines keep their
//!   original text, order and line terminators.
//! - Missing fields are appended in the default shape of the new value.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use super::document::{line_end, strip_terminator};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_LIST_INDENT: &str = "  ";

static KEY_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_\-]*):(?:[ \t]*)(.*?)[ \t]*$").expect("valid key line regex")
});
static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)-(?:[ \t]+(.*?))?[ \t]*$").expect("valid list item regex"));
static SINGLE_WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\[[^\[\]]*\]\]$").expect("valid wikilink regex"));
static DATE_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Layout of one field inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// `name: value`
    Scalar,
    /// `name: true|false`
    Bool,
    /// `name: YYYY-MM-DD`
    Date,
    /// `name: [a, b]`
    InlineList,
    /// `name:` followed by `- item` lines.
    BlockList,
}

impl FieldShape {
    fn is_list(self) -> bool {
        matches!(self, Self::InlineList | Self::BlockList)
    }
}

/// Value written into a field. The variant doubles as the shape hint used
/// when the field does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    List(Vec<String>),
}

impl FieldValue {
    /// Shape used when the field has to be appended.
    pub fn default_shape(&self) -> FieldShape {
        match self {
            Self::Text(_) => FieldShape::Scalar,
            Self::Bool(_) => FieldShape::Bool,
            Self::Date(_) => FieldShape::Date,
            Self::List(_) => FieldShape::BlockList,
        }
    }

    fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Text(value) => Some(value.clone()),
            Self::Bool(value) => Some(value.to_string()),
            Self::Date(value) => Some(value.format(DATE_FORMAT).to_string()),
            Self::List(_) => None,
        }
    }
}

/// One top-level field found in a metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    /// Field key as written.
    pub name: String,
    /// Detected layout.
    pub shape: FieldShape,
    /// Raw value text on the key line (empty for block lists).
    pub raw: String,
    /// Decoded list items; empty for scalar shapes.
    pub items: Vec<String>,
    span: Range<usize>,
    value_span: Range<usize>,
    item_indent: Option<String>,
    quote_style: QuoteStyle,
}

impl FieldEntry {
    /// Scalar value with surrounding quotes removed.
    pub fn as_text(&self) -> String {
        unquote(&self.raw).to_string()
    }

    /// Boolean value for `true`/`false` scalars.
    pub fn as_bool(&self) -> Option<bool> {
        match unquote(&self.raw) {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Date value for `YYYY-MM-DD` scalars.
    pub fn as_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(unquote(&self.raw), DATE_FORMAT).ok()
    }

    /// Unsigned integer value.
    pub fn as_u32(&self) -> Option<u32> {
        unquote(&self.raw).parse().ok()
    }

    /// Float value.
    pub fn as_f64(&self) -> Option<f64> {
        unquote(&self.raw).parse().ok()
    }

    /// List items. A non-empty scalar reads as a one-item list.
    pub fn as_list(&self) -> Vec<String> {
        if self.shape.is_list() {
            return self.items.clone();
        }
        let text = self.as_text();
        if text.is_empty() {
            Vec::new()
        } else {
            vec![text]
        }
    }

    fn holds(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Text(text) => {
                !self.shape.is_list() && (self.raw == *text || unquote(&self.raw) == text.as_str())
            }
            FieldValue::Bool(flag) => !self.shape.is_list() && self.as_bool() == Some(*flag),
            FieldValue::Date(date) => !self.shape.is_list() && self.as_date() == Some(*date),
            FieldValue::List(items) => self.as_list() == *items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteStyle {
    Bare,
    Double,
    Single,
    /// Quote only when the item would otherwise be misread.
    Auto,
}

/// Scans every top-level field in document order.
pub fn scan_fields(block: &str) -> Vec<FieldEntry> {
    let lines = split_lines(block);
    let mut entries = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = &lines[index];
        let Some(caps) = KEY_LINE_RE.captures(line.text) else {
            index += 1;
            continue;
        };
        let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
            index += 1;
            continue;
        };
        let raw = value.as_str().to_string();
        let value_span = (line.start + value.start())..(line.start + value.end());
        let mut span_end = line.end;
        index += 1;

        let shape;
        let mut items = Vec::new();
        let mut item_indent = None;
        let mut quote_style = QuoteStyle::Auto;

        if raw.is_empty() {
            let mut raw_items = Vec::new();
            while index < lines.len() {
                let Some(item_caps) = LIST_ITEM_RE.captures(lines[index].text) else {
                    break;
                };
                if item_indent.is_none() {
                    item_indent = item_caps.get(1).map(|m| m.as_str().to_string());
                }
                let item_raw = item_caps.get(2).map_or("", |m| m.as_str());
                raw_items.push(item_raw.to_string());
                span_end = lines[index].end;
                index += 1;
            }
            quote_style = detect_quote_style(&raw_items);
            items = raw_items
                .iter()
                .map(|item| unquote(item).to_string())
                .filter(|item| !item.is_empty())
                .collect();
            shape = if raw_items.is_empty() {
                FieldShape::Scalar
            } else {
                FieldShape::BlockList
            };
        } else if is_inline_list(&raw) {
            let raw_items = split_inline_items(&raw);
            quote_style = detect_quote_style(&raw_items);
            items = raw_items
                .iter()
                .map(|item| unquote(item).to_string())
                .filter(|item| !item.is_empty())
                .collect();
            shape = FieldShape::InlineList;
        } else {
            shape = classify_scalar(&raw);
        }

        entries.push(FieldEntry {
            name: name.as_str().to_string(),
            shape,
            raw,
            items,
            span: line.start..span_end,
            value_span,
            item_indent,
            quote_style,
        });
    }

    entries
}

/// Returns the first field named `name`.
pub fn get_field(block: &str, name: &str) -> Option<FieldEntry> {
    scan_fields(block)
        .into_iter()
        .find(|entry| entry.name == name)
}

/// Sets `name` to `value`, rewriting only that field.
///
/// The existing layout is kept when it can hold the new value (a scalar stays
/// on its line, an inline list stays inline, a block list keeps its indent
/// and quoting). Absent fields are appended in the value's default shape.
pub fn upsert_field(block: &str, name: &str, value: &FieldValue) -> String {
    let Some(entry) = get_field(block, name) else {
        return append_lines(block, &render_field(name, value));
    };
    if entry.holds(value) {
        return block.to_string();
    }

    match (value, entry.shape) {
        (FieldValue::List(items), FieldShape::InlineList) => {
            let rendered = render_inline(items, entry.quote_style);
            splice(block, entry.value_span.clone(), &rendered)
        }
        (FieldValue::List(items), FieldShape::BlockList) => {
            let lines = render_block_list(
                name,
                items,
                entry.item_indent.as_deref(),
                entry.quote_style,
                newline_of(block),
            );
            replace_field_lines(block, &entry, &lines)
        }
        (FieldValue::List(_), _) => {
            let lines = render_field(name, value);
            replace_field_lines(block, &entry, &lines)
        }
        (_, shape) if shape.is_list() => {
            let lines = render_field(name, value);
            replace_field_lines(block, &entry, &lines)
        }
        (_, _) => {
            let text = value.scalar_text().unwrap_or_default();
            if entry.raw.is_empty() && !text.is_empty() {
                // Key line ends right after the colon: add the separator too.
                let colon_end = entry.span.start + entry.name.len() + 1;
                return splice(block, colon_end..entry.value_span.end, &format!(" {text}"));
            }
            if text.is_empty() {
                let colon_end = entry.span.start + entry.name.len() + 1;
                return splice(block, colon_end..entry.value_span.end, "");
            }
            splice(block, entry.value_span.clone(), &text)
        }
    }
}

/// Adds `item` to a list field unless an identical item is already present.
///
/// Existing items are never re-rendered: block lists gain one `- item` line
/// after their last item and inline lists gain one `, item` entry.
pub fn append_to_list_field(block: &str, name: &str, item: &str) -> String {
    let Some(entry) = get_field(block, name) else {
        return upsert_field(block, name, &FieldValue::List(vec![item.to_string()]));
    };
    let current = entry.as_list();
    if current.iter().any(|existing| existing == item) {
        return block.to_string();
    }

    match entry.shape {
        FieldShape::BlockList => {
            let newline = newline_of(block);
            let indent = entry.item_indent.as_deref().unwrap_or(DEFAULT_LIST_INDENT);
            let line = format!("{indent}- {}", quote_item(item, entry.quote_style, false));
            let field_text = &block[entry.span.clone()];
            let insertion = if field_text.ends_with('\n') {
                format!("{line}{newline}")
            } else {
                format!("{newline}{line}")
            };
            splice(block, entry.span.end..entry.span.end, &insertion)
        }
        FieldShape::InlineList => {
            let raw = entry.raw.as_str();
            let inner = raw[1..raw.len() - 1].trim_end();
            let rendered_item = quote_item(item, entry.quote_style, true);
            let rendered = if inner.trim().is_empty() {
                format!("[{rendered_item}]")
            } else {
                format!("[{inner}, {rendered_item}]")
            };
            splice(block, entry.value_span.clone(), &rendered)
        }
        FieldShape::Scalar | FieldShape::Bool | FieldShape::Date => {
            let mut items = current;
            items.push(item.to_string());
            upsert_field(block, name, &FieldValue::List(items))
        }
    }
}

struct Line<'a> {
    start: usize,
    end: usize,
    text: &'a str,
}

fn split_lines(block: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut cursor = 0;
    while cursor < block.len() {
        let end = line_end(block, cursor);
        lines.push(Line {
            start: cursor,
            end,
            text: strip_terminator(&block[cursor..end]),
        });
        cursor = end;
    }
    lines
}

fn classify_scalar(raw: &str) -> FieldShape {
    let value = unquote(raw);
    if value == "true" || value == "false" {
        FieldShape::Bool
    } else if DATE_VALUE_RE.is_match(value) {
        FieldShape::Date
    } else {
        FieldShape::Scalar
    }
}

fn is_inline_list(raw: &str) -> bool {
    raw.starts_with('[') && raw.ends_with(']') && !SINGLE_WIKILINK_RE.is_match(raw)
}

/// Splits `[a, "b, c", [[d]]]` on top-level commas.
fn split_inline_items(raw: &str) -> Vec<String> {
    let inner = &raw[1..raw.len() - 1];
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in inner.chars() {
        match (quote, ch) {
            (Some(open), c) if c == open => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '[') => {
                depth += 1;
                current.push(ch);
            }
            (None, ']') => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            (None, ',') if depth == 0 => {
                items.push(current.trim().to_string());
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items.retain(|item| !item.is_empty());
    items
}

fn detect_quote_style(raw_items: &[String]) -> QuoteStyle {
    match raw_items.first().and_then(|item| item.chars().next()) {
        Some('"') => QuoteStyle::Double,
        Some('\'') => QuoteStyle::Single,
        Some(_) => QuoteStyle::Bare,
        None => QuoteStyle::Auto,
    }
}

fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

fn needs_quotes(item: &str, inline: bool) -> bool {
    item.starts_with(['[', '{', '"', '\''])
        || item.contains(": ")
        || item.contains(" #")
        || (inline && item.contains(','))
}

fn quote_item(item: &str, style: QuoteStyle, inline: bool) -> String {
    match style {
        QuoteStyle::Bare => item.to_string(),
        QuoteStyle::Double => format!("\"{}\"", item.replace('\\', "\\\\").replace('"', "\\\"")),
        QuoteStyle::Single => format!("'{}'", item.replace('\'', "''")),
        QuoteStyle::Auto => {
            if needs_quotes(item, inline) {
                quote_item(item, QuoteStyle::Double, inline)
            } else {
                item.to_string()
            }
        }
    }
}

fn render_inline(items: &[String], style: QuoteStyle) -> String {
    let rendered: Vec<String> = items
        .iter()
        .map(|item| quote_item(item, style, true))
        .collect();
    format!("[{}]", rendered.join(", "))
}

fn render_block_list(
    name: &str,
    items: &[String],
    indent: Option<&str>,
    style: QuoteStyle,
    newline: &str,
) -> String {
    let indent = indent.unwrap_or(DEFAULT_LIST_INDENT);
    let mut out = format!("{name}:");
    for item in items {
        out.push_str(newline);
        out.push_str(indent);
        out.push_str("- ");
        out.push_str(&quote_item(item, style, false));
    }
    out
}

/// Renders a whole field in its default shape, without a trailing newline.
fn render_field(name: &str, value: &FieldValue) -> String {
    match value {
        FieldValue::List(items) => render_block_list(name, items, None, QuoteStyle::Auto, "\n"),
        other => match other.scalar_text() {
            Some(text) if !text.is_empty() => format!("{name}: {text}"),
            _ => format!("{name}:"),
        },
    }
}

fn newline_of(block: &str) -> &'static str {
    if block.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Appends field lines, matching the block's line terminator convention.
fn append_lines(block: &str, lines: &str) -> String {
    let newline = newline_of(block);
    let lines = lines.replace('\n', newline);
    let mut out = String::with_capacity(block.len() + lines.len() + 2);
    out.push_str(block);
    if block.is_empty() || block.ends_with('\n') {
        out.push_str(&lines);
        out.push_str(newline);
    } else {
        out.push_str(newline);
        out.push_str(&lines);
    }
    out
}

fn replace_field_lines(block: &str, entry: &FieldEntry, lines: &str) -> String {
    let newline = newline_of(block);
    let field_text = &block[entry.span.clone()];
    let mut replacement = lines.replace("\r\n", "\n").replace('\n', newline);
    if field_text.ends_with('\n') {
        replacement.push_str(newline);
    }
    splice(block, entry.span.clone(), &replacement)
}

fn splice(block: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(block.len() + replacement.len());
    out.push_str(&block[..range.start]);
    out.push_str(replacement);
    out.push_str(&block[range.end..]);
    out
}
