//! Metadata block detection and verbatim reassembly.
//!
//! # Responsibility
//! - Split raw document text into opening marker, metadata block, closing
//!   marker and body.
//! - Reassemble the four parts byte-for-byte.
//!
//! # Invariants
//! - `ParsedDocument::parse(t).map(|d| d.serialize()) == Some(t)` whenever a
//!   block is detected.
//! - A missing or unterminated block yields `None`, never an error.

const METADATA_MARKER: &str = "---";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Document text split around its metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Opening marker line including its line terminator (and BOM, if any).
    opening: String,
    /// Raw text between the marker lines, line terminators included.
    block: String,
    /// Closing marker line including its terminator when present.
    closing: String,
    /// Everything after the closing marker line.
    body: String,
}

impl ParsedDocument {
    /// Detects a metadata block at the very top of `raw`.
    ///
    /// Returns `None` when the first line is not a marker or when no closing
    /// marker follows. Callers treat `None` as "no metadata, nothing to do".
    pub fn parse(raw: &str) -> Option<Self> {
        let opening_end = line_end(raw, 0);
        let first_line = strip_terminator(&raw[..opening_end]);
        let first_line = first_line
            .strip_prefix(BYTE_ORDER_MARK)
            .unwrap_or(first_line);
        if first_line != METADATA_MARKER || !raw[..opening_end].ends_with('\n') {
            return None;
        }

        let mut cursor = opening_end;
        while cursor < raw.len() {
            let end = line_end(raw, cursor);
            let line = strip_terminator(&raw[cursor..end]);
            if line.trim_end() == METADATA_MARKER {
                return Some(Self {
                    opening: raw[..opening_end].to_string(),
                    block: raw[opening_end..cursor].to_string(),
                    closing: raw[cursor..end].to_string(),
                    body: raw[end..].to_string(),
                });
            }
            cursor = end;
        }

        None
    }

    /// Raw metadata block text.
    pub fn block(&self) -> &str {
        &self.block
    }

    /// Raw body text following the closing marker.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Replaces the metadata block, keeping both marker lines.
    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.block = block.into();
        self
    }

    /// Replaces the body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Reassembles the full document text.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(
            self.opening.len() + self.block.len() + self.closing.len() + self.body.len(),
        );
        out.push_str(&self.opening);
        out.push_str(&self.block);
        out.push_str(&self.closing);
        out.push_str(&self.body);
        out
    }
}

/// Returns the byte offset just past the line starting at `start`.
pub(crate) fn line_end(text: &str, start: usize) -> usize {
    match text[start..].find('\n') {
        Some(offset) => start + offset + 1,
        None => text.len(),
    }
}

/// Drops one trailing `\n` and then one trailing `\r`.
pub(crate) fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
