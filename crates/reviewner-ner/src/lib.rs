//! Named Entity Recognition using Candle.
//!
//! Loads a pretrained token classification model (Hugging Face layout) from a
//! local directory and turns its per-token tags into an annotated document.

mod decode;
mod document;
mod entity_types;
mod ner_model;

pub use decode::{decode_tags, split_tag, TagPosition, TokenTag};
pub use document::{AnnotatedDoc, EntitySpan, Segment};
pub use entity_types::{normalize_entity_label, EntityType};
pub use ner_model::{NerConfig, NerModel};

pub type Result<T> = std::result::Result<T, NerError>;

#[derive(Debug, thiserror::Error)]
pub enum NerError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<candle_core::Error> for NerError {
    fn from(e: candle_core::Error) -> Self {
        NerError::Inference(e.to_string())
    }
}

impl From<tokenizers::Error> for NerError {
    fn from(e: tokenizers::Error) -> Self {
        NerError::Tokenization(e.to_string())
    }
}

/// Anything that can annotate a text with entity spans.
pub trait Recognizer {
    fn annotate(&self, text: &str) -> Result<AnnotatedDoc>;
}

impl<R: Recognizer + ?Sized> Recognizer for &R {
    fn annotate(&self, text: &str) -> Result<AnnotatedDoc> {
        (**self).annotate(text)
    }
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn annotate(&self, text: &str) -> Result<AnnotatedDoc> {
        (**self).annotate(text)
    }
}
