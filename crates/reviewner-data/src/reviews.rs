//! Reviews dataset: a JSON array of records keyed by `uid`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{read_file, DataError, Result};

/// A review record. Fields other than `uid` and `body` are carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub uid: String,
    pub body: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// In-memory table of review records with a uid index.
///
/// When several rows share a uid, the first one in file order wins.
#[derive(Debug, Clone, Default)]
pub struct ReviewTable {
    rows: Vec<ReviewRecord>,
    by_uid: HashMap<String, usize>,
}

impl ReviewTable {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = read_file(path)?;
        let rows: Vec<ReviewRecord> =
            serde_json::from_slice(&bytes).map_err(|source| DataError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Loaded {} reviews from {}", rows.len(), path.display());
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<ReviewRecord>) -> Self {
        let mut by_uid = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            by_uid.entry(row.uid.clone()).or_insert(i);
        }
        if by_uid.len() != rows.len() {
            debug!("{} duplicate uids in reviews", rows.len() - by_uid.len());
        }
        Self { rows, by_uid }
    }

    pub fn get(&self, uid: &str) -> Option<&ReviewRecord> {
        self.by_uid.get(uid).map(|&i| &self.rows[i])
    }

    /// Body of the review with exactly this uid.
    pub fn body_for(&self, uid: &str) -> Result<&str> {
        self.get(uid)
            .map(|r| r.body.as_str())
            .ok_or_else(|| DataError::UnknownUid(uid.to_string()))
    }

    pub fn rows(&self) -> &[ReviewRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
