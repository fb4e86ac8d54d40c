//! Sample selection for reviewner.
//!
//! Picks the text to annotate either at random from the stored test set or
//! by uid from the reviews dataset.

mod reviews;
mod selector;
mod test_set;

use std::path::PathBuf;

pub use reviews::{ReviewRecord, ReviewTable};
pub use selector::{select_sample, SampleSource};
pub use test_set::{TestExample, TestSet};

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode pickle {path}: {source}")]
    Pickle {
        path: PathBuf,
        #[source]
        source: serde_pickle::Error,
    },

    #[error("Failed to decode JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Test set {0} contains no examples")]
    EmptyTestSet(PathBuf),

    #[error("No review with uid {0:?}")]
    UnknownUid(String),
}

fn read_file(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}
