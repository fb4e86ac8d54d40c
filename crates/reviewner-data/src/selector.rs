//! Chooses which of the two datasets supplies the sample.

use rand::Rng;
use reviewner_config::DataConfig;
use tracing::info;

use crate::{Result, ReviewTable, TestSet};

/// Where the sample comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSource {
    /// Uniform pick from the stored test set.
    Random,
    /// Body of the review with this uid.
    Uid(String),
}

impl From<Option<String>> for SampleSource {
    fn from(uid: Option<String>) -> Self {
        match uid {
            Some(uid) => SampleSource::Uid(uid),
            None => SampleSource::Random,
        }
    }
}

/// Select the text to annotate. Only the file for the chosen source is read.
pub fn select_sample<R: Rng + ?Sized>(
    source: &SampleSource,
    config: &DataConfig,
    rng: &mut R,
) -> Result<String> {
    match source {
        SampleSource::Random => {
            let set = TestSet::load(&config.test_set)?;
            let example = set.choose(rng);
            info!("Selected a random test example ({} available)", set.len());
            Ok(example.text.clone())
        }
        SampleSource::Uid(uid) => {
            let table = ReviewTable::load(&config.reviews)?;
            let body = table.body_for(uid)?;
            info!("Selected review {uid}");
            Ok(body.to_string())
        }
    }
}
