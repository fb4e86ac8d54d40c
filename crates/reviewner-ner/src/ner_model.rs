//! BERT token classification model loaded from a local directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, HiddenAct, PositionEmbeddingType};
use hf_hub::api::sync::Api;
use reviewner_config::ModelConfig;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::decode::{decode_tags, TokenTag};
use crate::{AnnotatedDoc, NerError, Recognizer, Result};

/// NER configuration.
#[derive(Debug, Clone)]
pub struct NerConfig {
    /// Directory holding config.json, the tokenizer and the weights.
    pub model_path: PathBuf,
    /// Hugging Face model id fetched when `model_path` is missing.
    pub hub_fallback: Option<String>,
    pub max_length: usize,
    pub use_gpu: bool,
}

impl Default for NerConfig {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for NerConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            model_path: config.path.clone(),
            hub_fallback: config.hub_fallback.clone(),
            max_length: config.max_length,
            use_gpu: config.use_gpu,
        }
    }
}

enum TokenizerSource {
    Json(PathBuf),
    Vocab {
        vocab: PathBuf,
        tokenizer_config: Option<PathBuf>,
    },
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: TokenizerSource,
    weights: PathBuf,
}

impl ModelFiles {
    fn from_dir(dir: &Path) -> Result<Self> {
        let existing = |name: &str| {
            let path = dir.join(name);
            path.is_file().then_some(path)
        };

        let config = existing("config.json")
            .ok_or_else(|| NerError::ModelLoad(format!("no config.json in {}", dir.display())))?;

        let tokenizer = match (existing("tokenizer.json"), existing("vocab.txt")) {
            (Some(json), _) => TokenizerSource::Json(json),
            (None, Some(vocab)) => TokenizerSource::Vocab {
                vocab,
                tokenizer_config: existing("tokenizer_config.json"),
            },
            (None, None) => {
                return Err(NerError::Tokenization(format!(
                    "no tokenizer.json or vocab.txt in {}",
                    dir.display()
                )))
            }
        };

        let weights = existing("model.safetensors")
            .or_else(|| existing("pytorch_model.bin"))
            .ok_or_else(|| NerError::ModelLoad(format!("no model weights in {}", dir.display())))?;

        Ok(Self { config, tokenizer, weights })
    }

    fn download(model_id: &str) -> Result<Self> {
        let api = Api::new().map_err(|e| NerError::Download(format!("API init: {}", e)))?;
        let repo = api.model(model_id.to_string());

        info!("Downloading config.json for {}", model_id);
        let config = repo
            .get("config.json")
            .map_err(|e| NerError::Download(format!("config.json: {}", e)))?;

        let tokenizer = if let Ok(path) = repo.get("tokenizer.json") {
            TokenizerSource::Json(path)
        } else {
            let vocab = repo
                .get("vocab.txt")
                .map_err(|e| NerError::Download(format!("vocab.txt: {}", e)))?;
            TokenizerSource::Vocab {
                vocab,
                tokenizer_config: repo.get("tokenizer_config.json").ok(),
            }
        };

        info!("Downloading model weights for {}", model_id);
        let weights = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))
            .map_err(|e| NerError::Download(format!("Model weights: {}", e)))?;

        Ok(Self { config, tokenizer, weights })
    }
}

/// NER model wrapper.
pub struct NerModel {
    model: BertModel,
    tokenizer: Tokenizer,
    classifier: Tensor,
    bias: Option<Tensor>,
    labels: Vec<String>,
    cls_id: Option<u32>,
    sep_id: Option<u32>,
    /// Content tokens per forward pass, excluding [CLS]/[SEP].
    window: usize,
    device: Device,
}

impl std::fmt::Debug for NerModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NerModel")
            .field("labels", &self.labels)
            .field("window", &self.window)
            .field("device", &self.device)
            .finish()
    }
}

impl NerModel {
    /// Load the model from `config.model_path`, or from the Hub when the
    /// directory is missing and a fallback id is configured.
    pub async fn load(config: NerConfig) -> Result<Self> {
        let start = Instant::now();

        let files = if config.model_path.is_dir() {
            info!("Loading NER model from {}", config.model_path.display());
            ModelFiles::from_dir(&config.model_path)?
        } else if let Some(model_id) = config.hub_fallback.clone() {
            warn!(
                "Model directory {} not found, falling back to {}",
                config.model_path.display(),
                model_id
            );
            tokio::task::spawn_blocking(move || ModelFiles::download(&model_id))
                .await
                .map_err(|e| NerError::Download(e.to_string()))??
        } else {
            return Err(NerError::ModelLoad(format!(
                "model directory {} does not exist",
                config.model_path.display()
            )));
        };

        let device = if config.use_gpu {
            Device::cuda_if_available(0).unwrap_or(Device::Cpu)
        } else {
            Device::Cpu
        };
        debug!("Using device: {:?}", device);

        let config_json: serde_json::Value = std::fs::read_to_string(&files.config)
            .map_err(|e| NerError::ModelLoad(format!("{}: {}", files.config.display(), e)))
            .and_then(|s| {
                serde_json::from_str(&s).map_err(|e| NerError::ModelLoad(format!("Parse config: {}", e)))
            })?;
        check_model_type(&config_json)?;
        let labels = parse_labels(&config_json)?;
        let bert_config = bert_config(&config_json);

        let tokenizer = load_tokenizer(&files.tokenizer)?;
        let cls_id = tokenizer.token_to_id("[CLS]");
        let sep_id = tokenizer.token_to_id("[SEP]");

        info!("Loading model weights from {:?}", files.weights);
        let is_safetensors = files
            .weights
            .extension()
            .map(|e| e == "safetensors")
            .unwrap_or(false);
        let vb = if is_safetensors {
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)
                    .map_err(|e| NerError::ModelLoad(e.to_string()))?
            }
        } else {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)
                .map_err(|e| NerError::ModelLoad(e.to_string()))?
        };

        // Token-classification exports nest the encoder under `bert.`
        let model = BertModel::load(vb.pp("bert"), &bert_config)
            .or_else(|_| BertModel::load(vb.clone(), &bert_config))
            .map_err(|e| NerError::ModelLoad(format!("BertModel: {}", e)))?;

        let num_labels = labels.len();
        let hidden_size = bert_config.hidden_size;
        let head = vb.pp("classifier");
        let classifier = head
            .get((num_labels, hidden_size), "weight")
            .map_err(|e| NerError::ModelLoad(format!("Classifier: {}", e)))?;
        let bias = head.get(num_labels, "bias").ok();

        let max_length = config.max_length.min(bert_config.max_position_embeddings);
        let special = cls_id.is_some() as usize + sep_id.is_some() as usize;
        let window = max_length.saturating_sub(special).max(1);

        info!(
            "NER model loaded in {:?} ({} labels, window {})",
            start.elapsed(),
            num_labels,
            window
        );

        Ok(Self {
            model,
            tokenizer,
            classifier,
            bias,
            labels,
            cls_id,
            sep_id,
            window,
            device,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Classify one window of token ids. Returns `(label_id, probability)`
    /// for every position fed to the model, [CLS]/[SEP] included.
    fn classify(&self, ids: &[u32]) -> Result<Vec<(usize, f32)>> {
        let mut input = Vec::with_capacity(ids.len() + 2);
        input.extend(self.cls_id);
        input.extend_from_slice(ids);
        input.extend(self.sep_id);

        let input_ids = Tensor::new(input.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = input_ids.ones_like()?;

        // [1, seq, hidden] -> [seq, hidden]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?
            .squeeze(0)?;

        let mut logits = hidden.matmul(&self.classifier.t()?)?;
        if let Some(bias) = &self.bias {
            logits = logits.broadcast_add(bias)?;
        }

        let probs = candle_nn::ops::softmax(&logits, 1)?;
        let preds = probs.argmax(1)?.to_vec1::<u32>()?;
        let scores = probs.max(1)?.to_vec1::<f32>()?;

        if preds.len() != input.len() {
            return Err(NerError::Inference(format!(
                "expected {} predictions, got {}",
                input.len(),
                preds.len()
            )));
        }
        Ok(preds
            .into_iter()
            .zip(scores)
            .map(|(pred, score)| (pred as usize, score))
            .collect())
    }

    fn label(&self, pred: usize) -> &str {
        self.labels.get(pred).map(String::as_str).unwrap_or("O")
    }
}

impl Recognizer for NerModel {
    fn annotate(&self, text: &str) -> Result<AnnotatedDoc> {
        let start = Instant::now();

        let encoding = self.tokenizer.encode(text, false)?;
        let ids = encoding.get_ids();
        if ids.is_empty() {
            return Ok(AnnotatedDoc::new(text, Vec::new()));
        }

        let offsets = encoding.get_offsets();
        let word_ids = encoding.get_word_ids();
        let marker = |(pred, score): (usize, f32)| TokenTag {
            start: 0,
            end: 0,
            word_id: None,
            tag: self.label(pred),
            score,
            special: true,
        };

        let mut tokens: Vec<TokenTag<'_>> = Vec::with_capacity(ids.len() + 2);
        for (n, chunk) in ids.chunks(self.window).enumerate() {
            let base = n * self.window;
            let mut predictions = self.classify(chunk)?.into_iter();
            if self.cls_id.is_some() {
                tokens.extend(predictions.next().map(marker));
            }
            for (i, (pred, score)) in predictions.by_ref().take(chunk.len()).enumerate() {
                let index = base + i;
                tokens.push(TokenTag {
                    start: offsets[index].0,
                    end: offsets[index].1,
                    word_id: word_ids[index],
                    tag: self.label(pred),
                    score,
                    special: false,
                });
            }
            tokens.extend(predictions.map(marker));
        }

        let ents = decode_tags(text, &tokens);
        debug!(
            "Annotated {} tokens into {} entities in {:?}",
            tokens.len(),
            ents.len(),
            start.elapsed()
        );
        Ok(AnnotatedDoc::new(text, ents))
    }
}

/// Only BERT-layout encoders can be loaded. RoBERTa-family exports use
/// different position ids and a different tokenizer.
fn check_model_type(config_json: &serde_json::Value) -> Result<()> {
    match config_json.get("model_type").and_then(|v| v.as_str()) {
        None | Some("bert") => Ok(()),
        Some(other) => Err(NerError::ModelLoad(format!(
            "unsupported model_type '{}', expected a BERT token classifier",
            other
        ))),
    }
}

/// Read `id2label` into a dense vector; ids without a label decode as `O`.
fn parse_labels(config_json: &serde_json::Value) -> Result<Vec<String>> {
    let map: HashMap<usize, String> = config_json["id2label"]
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| Some((k.parse().ok()?, v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let Some(&max_id) = map.keys().max() else {
        return Err(NerError::ModelLoad("config.json has no id2label".to_string()));
    };

    Ok((0..=max_id)
        .map(|id| map.get(&id).cloned().unwrap_or_else(|| "O".to_string()))
        .collect())
}

fn bert_config(json: &serde_json::Value) -> Config {
    let hidden_act = match json.get("hidden_act").and_then(|v| v.as_str()) {
        Some("relu") => HiddenAct::Relu,
        Some("gelu_new") | Some("gelu_approximate") => HiddenAct::GeluApproximate,
        _ => HiddenAct::Gelu,
    };
    let usize_or = |key: &str, default: usize| {
        json.get(key).and_then(|v| v.as_u64()).map(|v| v as usize).unwrap_or(default)
    };
    let f64_or = |key: &str, default: f64| json.get(key).and_then(|v| v.as_f64()).unwrap_or(default);

    Config {
        vocab_size: usize_or("vocab_size", 30522),
        hidden_size: usize_or("hidden_size", 768),
        num_hidden_layers: usize_or("num_hidden_layers", 12),
        num_attention_heads: usize_or("num_attention_heads", 12),
        intermediate_size: usize_or("intermediate_size", 3072),
        hidden_act,
        hidden_dropout_prob: f64_or("hidden_dropout_prob", 0.1),
        max_position_embeddings: usize_or("max_position_embeddings", 512),
        type_vocab_size: usize_or("type_vocab_size", 2),
        initializer_range: f64_or("initializer_range", 0.02),
        layer_norm_eps: f64_or("layer_norm_eps", 1e-12),
        pad_token_id: usize_or("pad_token_id", 0),
        position_embedding_type: PositionEmbeddingType::Absolute,
        use_cache: true,
        classifier_dropout: None,
        model_type: json.get("model_type").and_then(|v| v.as_str()).map(str::to_string),
    }
}

fn load_tokenizer(source: &TokenizerSource) -> Result<Tokenizer> {
    let mut tokenizer = match source {
        TokenizerSource::Json(path) => {
            info!("Loading tokenizer from: {:?}", path);
            Tokenizer::from_file(path)?
        }
        TokenizerSource::Vocab { vocab, tokenizer_config } => {
            info!("Building tokenizer from {:?}", vocab);
            build_wordpiece(vocab, tokenizer_config.as_deref())?
        }
    };
    // Windowing is done by hand, so the tokenizer must not cut or pad.
    tokenizer.with_truncation(None)?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

fn build_wordpiece(vocab_path: &Path, tokenizer_config: Option<&Path>) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPieceBuilder;
    use tokenizers::normalizers::bert::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;

    let vocab_content = std::fs::read_to_string(vocab_path)
        .map_err(|e| NerError::Tokenization(format!("{}: {}", vocab_path.display(), e)))?;
    let vocab: ahash::AHashMap<String, u32> = vocab_content
        .lines()
        .enumerate()
        .map(|(i, line)| (line.to_string(), i as u32))
        .collect();

    let lowercase = tokenizer_config
        .and_then(|p| std::fs::read_to_string(p).ok())
        .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
        .and_then(|v| v.get("do_lower_case").and_then(|b| b.as_bool()))
        .unwrap_or(true);

    let wordpiece = WordPieceBuilder::new()
        .vocab(vocab)
        .continuing_subword_prefix("##".to_string())
        .max_input_chars_per_word(100)
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| NerError::Tokenization(format!("WordPiece: {}", e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
    Ok(tokenizer)
}
