//! Test fixtures shared across the workspace.
//!
//! [`write_tiny_bert`] writes a complete token-classification export small
//! enough to build in a test: a one-layer BERT whose only non-zero word
//! embedding is `hil`, and a classifier that tags that embedding `B-ORG`.
//! Every other token comes out `O`, so annotating [`SAMPLE_TEXT`] yields the
//! single span `Hilton` at [`HILTON_SPAN`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use candle_core::{DType, Device, Tensor};
use serde_json::json;

pub const SAMPLE_TEXT: &str = "Great stay at the Hilton.";

/// Byte range of "Hilton" in [`SAMPLE_TEXT`].
pub const HILTON_SPAN: (usize, usize) = (18, 24);

pub const VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "great", "stay", "at", "the", "hil", "##ton", ".",
];

pub const LABELS: &[&str] = &["O", "B-ORG", "I-ORG"];

const HIDDEN: usize = 4;
const INTERMEDIATE: usize = 8;
pub const MAX_POSITIONS: usize = 16;

/// Write the tiny model into `dir/model-best` and return that directory.
pub fn write_tiny_bert(dir: &Path) -> anyhow::Result<PathBuf> {
    write_tiny_model(dir, "bert")
}

/// Same weights as [`write_tiny_bert`], with `model_type` set in config.json.
pub fn write_tiny_model(dir: &Path, model_type: &str) -> anyhow::Result<PathBuf> {
    let model_dir = dir.join("model-best");
    std::fs::create_dir_all(&model_dir)
        .with_context(|| format!("Failed to create {}", model_dir.display()))?;

    let id2label: serde_json::Map<String, serde_json::Value> = LABELS
        .iter()
        .enumerate()
        .map(|(id, label)| (id.to_string(), json!(label)))
        .collect();
    let config = json!({
        "model_type": model_type,
        "vocab_size": VOCAB.len(),
        "hidden_size": HIDDEN,
        "num_hidden_layers": 1,
        "num_attention_heads": 1,
        "intermediate_size": INTERMEDIATE,
        "hidden_act": "gelu",
        "max_position_embeddings": MAX_POSITIONS,
        "type_vocab_size": 2,
        "id2label": id2label,
    });
    std::fs::write(model_dir.join("config.json"), serde_json::to_string_pretty(&config)?)?;
    std::fs::write(model_dir.join("vocab.txt"), format!("{}\n", VOCAB.join("\n")))?;

    let tensors = tiny_bert_tensors()?;
    candle_core::safetensors::save(&tensors, model_dir.join("model.safetensors"))?;
    Ok(model_dir)
}

/// Zero encoder weights with unit layer norms pass the normalized embedding
/// straight through, so the classifier sees `[√2, -√2, 0, 0]` for `hil`
/// and zeros elsewhere.
fn tiny_bert_tensors() -> anyhow::Result<HashMap<String, Tensor>> {
    let device = Device::Cpu;
    let zeros = |shape: &[usize]| Tensor::zeros(shape, DType::F32, &device);
    let ones = |n: usize| Tensor::ones(n, DType::F32, &device);

    let mut tensors = HashMap::new();
    let mut put = |name: &str, tensor: Tensor| {
        tensors.insert(format!("bert.{name}"), tensor);
    };

    let hil = VOCAB.iter().position(|t| *t == "hil").context("hil missing from vocab")?;
    let mut word_embeddings = vec![0f32; VOCAB.len() * HIDDEN];
    word_embeddings[hil * HIDDEN] = 1.0;
    word_embeddings[hil * HIDDEN + 1] = -1.0;
    put(
        "embeddings.word_embeddings.weight",
        Tensor::from_vec(word_embeddings, (VOCAB.len(), HIDDEN), &device)?,
    );
    put("embeddings.position_embeddings.weight", zeros(&[MAX_POSITIONS, HIDDEN])?);
    put("embeddings.token_type_embeddings.weight", zeros(&[2, HIDDEN])?);

    let layer = "encoder.layer.0";
    let norms = [
        "embeddings".to_string(),
        format!("{layer}.attention.output"),
        format!("{layer}.output"),
    ];
    for norm in &norms {
        put(&format!("{norm}.LayerNorm.weight"), ones(HIDDEN)?);
        put(&format!("{norm}.LayerNorm.bias"), zeros(&[HIDDEN])?);
    }

    let linears = [
        ("attention.self.query", HIDDEN, HIDDEN),
        ("attention.self.key", HIDDEN, HIDDEN),
        ("attention.self.value", HIDDEN, HIDDEN),
        ("attention.output.dense", HIDDEN, HIDDEN),
        ("intermediate.dense", INTERMEDIATE, HIDDEN),
        ("output.dense", HIDDEN, INTERMEDIATE),
    ];
    for (name, out_dim, in_dim) in linears {
        put(&format!("{layer}.{name}.weight"), zeros(&[out_dim, in_dim])?);
        put(&format!("{layer}.{name}.bias"), zeros(&[out_dim])?);
    }

    // O wins on a zero hidden state; B-ORG wins on the `hil` direction.
    let mut classifier = vec![0f32; LABELS.len() * HIDDEN];
    classifier[HIDDEN] = 10.0;
    classifier[HIDDEN + 1] = -10.0;
    tensors.insert(
        "classifier.weight".to_string(),
        Tensor::from_vec(classifier, (LABELS.len(), HIDDEN), &device)?,
    );
    tensors.insert(
        "classifier.bias".to_string(),
        Tensor::new(&[1f32, 0.0, 0.0], &device)?,
    );
    Ok(tensors)
}

/// Write `reviews.json` with one row per `(uid, body)` pair.
pub fn write_reviews(dir: &Path, rows: &[(&str, &str)]) -> anyhow::Result<PathBuf> {
    let path = dir.join("reviews.json");
    let rows: Vec<_> = rows
        .iter()
        .map(|(uid, body)| json!({"uid": uid, "body": body}))
        .collect();
    std::fs::write(&path, serde_json::to_string(&rows)?)?;
    Ok(path)
}
