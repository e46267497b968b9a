// Occurrence extraction and context windows.
//
// An occurrence is one exact, case-sensitive, non-overlapping match of the
// target word inside a document. Offsets are kept twice: character offsets
// (what gets reported) and byte offsets (what slicing needs).

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::corpus::Document;

/// How much text around a match the encoder sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStrategy {
    /// Fixed number of characters on each side of the match, clamped to the
    /// document bounds.
    CharRadius(usize),
    /// The sentence containing the match, delimited by 。？！
    Sentence,
}

impl Default for WindowStrategy {
    fn default() -> Self {
        WindowStrategy::CharRadius(250)
    }
}

/// One match of a target word in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence<'a> {
    pub document: &'a Document,
    /// Character offset of the first matched character.
    pub char_start: usize,
    /// Character offset one past the last matched character.
    pub char_end: usize,
    byte_start: usize,
    byte_end: usize,
}

impl<'a> Occurrence<'a> {
    pub fn document_id(&self) -> &'a str {
        &self.document.id
    }

    pub fn source_text(&self) -> &'a str {
        &self.document.text
    }

    pub fn matched_text(&self) -> &'a str {
        &self.document.text[self.byte_start..self.byte_end]
    }

    /// The text the encoder should see for this occurrence.
    pub fn context_window(&self, strategy: WindowStrategy) -> &'a str {
        match strategy {
            WindowStrategy::CharRadius(radius) => self.radius_window(radius),
            WindowStrategy::Sentence => self.sentence_window(),
        }
    }

    fn radius_window(&self, radius: usize) -> &'a str {
        let text = self.source_text();

        let start = text[..self.byte_start]
            .char_indices()
            .rev()
            .take(radius)
            .last()
            .map_or(self.byte_start, |(i, _)| i);

        let end = text[self.byte_end..]
            .char_indices()
            .nth(radius)
            .map_or(text.len(), |(i, _)| self.byte_end + i);

        &text[start..end]
    }

    fn sentence_window(&self) -> &'a str {
        let text = self.source_text();
        let mut start = 0;
        let mut end = text.len();

        for m in sentence_terminator().find_iter(text) {
            if m.end() <= self.byte_start {
                start = m.end();
            } else if m.start() >= self.byte_end {
                end = m.end();
                break;
            }
        }

        text[start..end].trim()
    }
}

fn sentence_terminator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[。？！]").expect("static pattern"))
}

/// Find every non-overlapping occurrence of `target` in `documents`.
///
/// Output order is corpus order, then left to right within a document. An
/// empty target or an empty corpus gives an empty list.
pub fn extract_occurrences<'a>(documents: &'a [Document], target: &str) -> Vec<Occurrence<'a>> {
    if target.is_empty() {
        return Vec::new();
    }

    let target_chars = target.chars().count();
    let mut occurrences = Vec::new();

    for document in documents {
        let text = document.text.as_str();
        let mut chars_before = 0usize;
        let mut scanned_to = 0usize;

        for (byte_start, _) in text.match_indices(target) {
            chars_before += text[scanned_to..byte_start].chars().count();
            let char_start = chars_before;
            let byte_end = byte_start + target.len();

            occurrences.push(Occurrence {
                document,
                char_start,
                char_end: char_start + target_chars,
                byte_start,
                byte_end,
            });

            chars_before += target_chars;
            scanned_to = byte_end;
        }
    }

    occurrences
}
