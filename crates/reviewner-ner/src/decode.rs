//! Turns per-token tags into entity spans.
//!
//! Handles IOB/BIO, BILUO (and its BIOES spelling) and plain IO tagging.

use tracing::{debug, warn};

use crate::document::EntitySpan;

/// Position of a token inside an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPosition {
    Outside,
    Begin,
    Inside,
    Last,
    Unit,
}

/// Split a tag like `B-ORG` into its position and entity type.
/// Unprefixed labels other than `O` are treated as `Inside` (IO tagging).
pub fn split_tag(tag: &str) -> (TagPosition, &str) {
    if tag.is_empty() || tag == "O" {
        return (TagPosition::Outside, "");
    }
    let bytes = tag.as_bytes();
    if bytes.len() > 2 && (bytes[1] == b'-' || bytes[1] == b'_') {
        let kind = &tag[2..];
        let position = match bytes[0] {
            b'B' => Some(TagPosition::Begin),
            b'I' => Some(TagPosition::Inside),
            b'L' | b'E' => Some(TagPosition::Last),
            b'U' | b'S' => Some(TagPosition::Unit),
            _ => None,
        };
        if let Some(position) = position {
            return (position, kind);
        }
    }
    (TagPosition::Inside, tag)
}

/// One token's prediction, in text order.
#[derive(Debug, Clone)]
pub struct TokenTag<'a> {
    /// Byte offsets into the source text.
    pub start: usize,
    pub end: usize,
    /// Word the token belongs to; pieces of the same word share it.
    pub word_id: Option<u32>,
    pub tag: &'a str,
    pub score: f32,
    /// Model-added marker such as `[CLS]`/`[SEP]`; never part of an entity.
    pub special: bool,
}

struct OpenEntity {
    label: String,
    start: usize,
    end: usize,
    score_sum: f32,
    pieces: usize,
    /// Saw an `L-`/`U-` tag; the entity ends with the current word.
    ending: bool,
}

impl OpenEntity {
    fn new(label: &str, token: &TokenTag<'_>, ending: bool) -> Self {
        Self {
            label: label.to_string(),
            start: token.start,
            end: token.end,
            score_sum: token.score,
            pieces: 1,
            ending,
        }
    }

    fn extend(&mut self, token: &TokenTag<'_>) {
        self.end = self.end.max(token.end);
        self.score_sum += token.score;
        self.pieces += 1;
    }

    fn finish(self, text: &str) -> Option<EntitySpan> {
        let Some(span_text) = text.get(self.start..self.end) else {
            warn!("Dropping entity with invalid offsets {}..{}", self.start, self.end);
            return None;
        };
        if self.start >= self.end {
            return None;
        }
        Some(EntitySpan {
            start: self.start,
            end: self.end,
            label: self.label,
            score: self.score_sum / self.pieces as f32,
            text: span_text.to_string(),
        })
    }
}

/// Decode token tags into non-overlapping entity spans, sorted by start.
pub fn decode_tags(text: &str, tokens: &[TokenTag<'_>]) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut open: Option<OpenEntity> = None;
    let mut prev_word: Option<u32> = None;

    let close = |open: &mut Option<OpenEntity>, spans: &mut Vec<EntitySpan>| {
        if let Some(entity) = open.take().and_then(|e| e.finish(text)) {
            spans.push(entity);
        }
    };

    for token in tokens {
        // Markers between windows must not break a word split across them.
        if token.special {
            continue;
        }

        let continuation = token.word_id.is_some() && token.word_id == prev_word;
        prev_word = token.word_id;

        // Later pieces of a word follow whatever the first piece decided.
        if continuation {
            if let Some(entity) = open.as_mut() {
                entity.extend(token);
            }
            continue;
        }

        if open.as_ref().map(|e| e.ending).unwrap_or(false) {
            close(&mut open, &mut spans);
        }

        let (position, kind) = split_tag(token.tag);
        debug!("'{}' -> {:?} {}", token.tag, position, kind);

        match position {
            TagPosition::Outside => close(&mut open, &mut spans),
            TagPosition::Begin | TagPosition::Unit => {
                close(&mut open, &mut spans);
                open = Some(OpenEntity::new(kind, token, position == TagPosition::Unit));
            }
            TagPosition::Inside | TagPosition::Last => {
                let ending = position == TagPosition::Last;
                match open.as_mut() {
                    Some(entity) if entity.label == kind => {
                        entity.extend(token);
                        entity.ending = ending;
                    }
                    _ => {
                        close(&mut open, &mut spans);
                        open = Some(OpenEntity::new(kind, token, ending));
                    }
                }
            }
        }
    }
    close(&mut open, &mut spans);

    spans
}
