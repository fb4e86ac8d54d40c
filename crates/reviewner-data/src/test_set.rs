//! Stored test examples.
//!
//! The test set is a pickled list of `(text, annotations)` tuples written by
//! the training tooling. Only the text is used here; everything after it is
//! skipped without being decoded into a concrete type.

use std::fmt;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::de::{self, Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{read_file, DataError, Result};

/// One stored test example. Only its leading text is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestExample {
    pub text: String,
}

impl<'de> Deserialize<'de> for TestExample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ExampleVisitor;

        impl<'de> Visitor<'de> for ExampleVisitor {
            type Value = TestExample;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a text or a sequence whose first element is a text")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(TestExample { text: v.to_owned() })
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
                Ok(TestExample { text: v })
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
                let text: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(TestExample { text })
            }
        }

        deserializer.deserialize_any(ExampleVisitor)
    }
}

/// Non-empty collection of test examples.
#[derive(Debug, Clone)]
pub struct TestSet {
    path: PathBuf,
    examples: Vec<TestExample>,
}

impl TestSet {
    /// Load a test set. Files ending in `.json` are read as JSON, anything
    /// else as a Python pickle.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = read_file(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let examples: Vec<TestExample> = if is_json {
            serde_json::from_slice(&bytes).map_err(|source| DataError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_pickle::from_slice(&bytes, serde_pickle::DeOptions::new()).map_err(|source| {
                DataError::Pickle {
                    path: path.to_path_buf(),
                    source,
                }
            })?
        };

        Self::from_examples(path.to_path_buf(), examples)
    }

    pub fn from_examples(path: PathBuf, examples: Vec<TestExample>) -> Result<Self> {
        if examples.is_empty() {
            return Err(DataError::EmptyTestSet(path));
        }
        info!("Loaded {} test examples from {}", examples.len(), path.display());
        Ok(Self { path, examples })
    }

    /// Pick one example uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &TestExample {
        let example = self
            .examples
            .choose(rng)
            .unwrap_or(&self.examples[0]);
        debug!("Chose test example from {}", self.path.display());
        example
    }

    pub fn examples(&self) -> &[TestExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;
    use std::io::Write;

    type Annotations = BTreeMap<String, Vec<(u32, u32, String)>>;

    fn training_rows() -> Vec<(String, Annotations)> {
        let mut ents = BTreeMap::new();
        ents.insert(
            "entities".to_string(),
            vec![(10, 16, "ORG".to_string())],
        );
        vec![
            ("Bought at Target last week.".to_string(), ents.clone()),
            ("The Sony headphones broke.".to_string(), ents.clone()),
            ("Shipping from Berlin took ages.".to_string(), ents),
        ]
    }

    fn write_fixture(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_load_pickled_tuples_keeps_text_only() {
        let bytes = serde_pickle::to_vec(&training_rows(), serde_pickle::SerOptions::new()).unwrap();
        let file = write_fixture(".data", &bytes);

        let set = TestSet::load(file.path()).unwrap();
        let texts: Vec<&str> = set.examples().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Bought at Target last week.",
                "The Sony headphones broke.",
                "Shipping from Berlin took ages.",
            ]
        );
    }

    #[test]
    fn test_load_json_accepts_pairs_and_bare_strings() {
        let file = write_fixture(
            ".json",
            br#"[["first review", {"entities": []}], "second review"]"#,
        );
        let set = TestSet::load(file.path()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.examples()[1].text, "second review");
    }

    #[test]
    fn test_empty_collection_is_an_error() {
        let bytes = serde_pickle::to_vec(&Vec::<(String, Annotations)>::new(), serde_pickle::SerOptions::new()).unwrap();
        let file = write_fixture(".data", &bytes);
        assert!(matches!(TestSet::load(file.path()), Err(DataError::EmptyTestSet(_))));
    }

    #[test]
    fn test_non_text_first_element_is_an_error() {
        let bytes = serde_pickle::to_vec(&vec![(1u32, 2u32)], serde_pickle::SerOptions::new()).unwrap();
        let file = write_fixture(".data", &bytes);
        assert!(matches!(TestSet::load(file.path()), Err(DataError::Pickle { .. })));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let file = write_fixture(".data", b"definitely not a pickle");
        assert!(matches!(TestSet::load(file.path()), Err(DataError::Pickle { .. })));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TestSet::load(&dir.path().join("test_set.data")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }

    #[test]
    fn test_choose_returns_a_member() {
        let examples: Vec<TestExample> = training_rows()
            .into_iter()
            .map(|(text, _)| TestExample { text })
            .collect();
        let set = TestSet::from_examples(PathBuf::from("mem"), examples.clone()).unwrap();

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = set.choose(&mut rng);
            assert!(examples.contains(picked));
        }
    }

    #[test]
    fn test_choose_varies_across_seeds() {
        let examples: Vec<TestExample> = (0..16)
            .map(|i| TestExample { text: format!("review {i}") })
            .collect();
        let set = TestSet::from_examples(PathBuf::from("mem"), examples).unwrap();

        let picked: std::collections::HashSet<String> = (0..64)
            .map(|seed| set.choose(&mut StdRng::seed_from_u64(seed)).text.clone())
            .collect();
        assert!(picked.len() > 1);
    }
}
