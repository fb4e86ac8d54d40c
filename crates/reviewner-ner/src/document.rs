//! Annotated documents: text plus the entity spans found in it.

use serde::{Deserialize, Serialize};

use crate::entity_types::{normalize_entity_label, EntityType};

/// A recognized entity. Offsets are UTF-8 byte offsets into the document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub score: f32,
    pub text: String,
}

impl EntitySpan {
    pub fn entity_type(&self) -> EntityType {
        normalize_entity_label(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDoc {
    pub text: String,
    pub ents: Vec<EntitySpan>,
}

/// A run of document text, either plain or covered by an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Entity(&'a EntitySpan),
}

impl AnnotatedDoc {
    /// Build a document, sorting spans and dropping any that fall outside the
    /// text or overlap an earlier, higher-scoring span.
    pub fn new(text: impl Into<String>, ents: Vec<EntitySpan>) -> Self {
        let text = text.into();
        let mut ents: Vec<EntitySpan> = ents
            .into_iter()
            .filter(|e| e.start < e.end && text.get(e.start..e.end).is_some())
            .collect();

        // Sort by start position, then by score (descending)
        ents.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| b.score.total_cmp(&a.score))
        });

        let mut kept: Vec<EntitySpan> = Vec::with_capacity(ents.len());
        for entity in ents {
            match kept.last_mut() {
                Some(last) if entity.start < last.end => {
                    if entity.score > last.score {
                        *last = entity;
                    }
                }
                _ => kept.push(entity),
            }
        }

        Self { text, ents: kept }
    }

    /// Split the text into plain and entity segments, in order.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::with_capacity(self.ents.len() * 2 + 1);
        let mut cursor = 0;
        for entity in &self.ents {
            if entity.start > cursor {
                segments.push(Segment::Plain(&self.text[cursor..entity.start]));
            }
            segments.push(Segment::Entity(entity));
            cursor = entity.end;
        }
        if cursor < self.text.len() {
            segments.push(Segment::Plain(&self.text[cursor..]));
        }
        segments
    }

    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.ents.iter().map(|e| e.label.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }
}
