//! ner-predict — annotate one review and show the entities in the browser.
//!
//! Run with: cargo run -p reviewner-cli -- [--uid <UID>]

use anyhow::Context;
use clap::Parser;
use reviewner_cli::{prepare, Args};
use reviewner_config::Config;
use reviewner_data::SampleSource;
use reviewner_ner::{NerConfig, NerModel};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries only the selected text.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reviewner=info,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().context("Failed to load configuration")?;

    let model_path = config.model.path.clone();
    let model = NerModel::load(NerConfig::from(&config.model))
        .await
        .with_context(|| format!("Failed to load NER model from {}", model_path.display()))?;
    info!("Model ready: {} labels", model.labels().len());

    let source = SampleSource::from(args.uid);
    let doc = prepare(
        &model,
        &source,
        &config.data,
        &mut rand::thread_rng(),
        &mut std::io::stdout().lock(),
    )?;

    reviewner_web::serve(doc, &config.server)
        .await
        .context("Visualizer server failed")?;

    Ok(())
}
