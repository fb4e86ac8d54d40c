//! Command-line flow for `ner-predict`: pick a sample, echo it, annotate it.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use reviewner_config::DataConfig;
use reviewner_data::{select_sample, DataError, SampleSource};
use reviewner_ner::{AnnotatedDoc, Recognizer};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "ner-predict", about = "Show NER model performance on a single review")]
pub struct Args {
    /// uid of a review
    #[arg(long, value_name = "UID")]
    pub uid: Option<String>,
}

/// Select the sample and write it, newline-terminated, to `out`.
pub fn select_and_print<R, W>(
    source: &SampleSource,
    data: &DataConfig,
    rng: &mut R,
    out: &mut W,
) -> anyhow::Result<String>
where
    R: Rng + ?Sized,
    W: Write,
{
    let text = select_sample(source, data, rng).map_err(|e| {
        let context = match &e {
            DataError::UnknownUid(_) => format!("Lookup in {} failed", data.reviews.display()),
            _ => "Failed to select a sample".to_string(),
        };
        anyhow::Error::new(e).context(context)
    })?;

    writeln!(out, "{text}").context("Failed to write sample to stdout")?;
    out.flush().context("Failed to flush stdout")?;
    Ok(text)
}

/// Select, echo and annotate the sample. The echoed text is exactly what the
/// recognizer sees.
pub fn prepare<Z, R, W>(
    recognizer: &Z,
    source: &SampleSource,
    data: &DataConfig,
    rng: &mut R,
    out: &mut W,
) -> anyhow::Result<AnnotatedDoc>
where
    Z: Recognizer + ?Sized,
    R: Rng + ?Sized,
    W: Write,
{
    let text = select_and_print(source, data, rng, out)?;
    let doc = recognizer
        .annotate(&text)
        .context("Failed to annotate sample")?;
    info!("Found {} entities", doc.ents.len());
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use reviewner_ner::EntitySpan;
    use std::cell::RefCell;

    /// Tags every occurrence of "Amazon" as ORG and remembers its inputs.
    #[derive(Default)]
    struct RecordingRecognizer {
        seen: RefCell<Vec<String>>,
    }

    impl Recognizer for RecordingRecognizer {
        fn annotate(&self, text: &str) -> reviewner_ner::Result<AnnotatedDoc> {
            self.seen.borrow_mut().push(text.to_string());
            let ents = text
                .match_indices("Amazon")
                .map(|(start, m)| EntitySpan {
                    start,
                    end: start + m.len(),
                    label: "ORG".into(),
                    score: 1.0,
                    text: m.to_string(),
                })
                .collect();
            Ok(AnnotatedDoc::new(text, ents))
        }
    }

    fn fixtures() -> (tempfile::TempDir, DataConfig) {
        let dir = tempfile::tempdir().unwrap();
        let reviews = dir.path().join("reviews.json");
        let test_set = dir.path().join("test_set.data");
        std::fs::write(
            &reviews,
            r#"[{"uid": "a1", "body": "Amazon lost my parcel.\nTwice."},
                {"uid": "b2", "body": "Great fit."}]"#,
        )
        .unwrap();
        let rows = vec![("Returned it to Amazon.".to_string(), ()), ("Meh.".to_string(), ())];
        std::fs::write(
            &test_set,
            serde_pickle::to_vec(&rows, serde_pickle::SerOptions::new()).unwrap(),
        )
        .unwrap();
        (dir, DataConfig { test_set, reviews })
    }

    #[test]
    fn test_printed_text_is_annotated_text() {
        let (_dir, data) = fixtures();
        let recognizer = RecordingRecognizer::default();
        let mut out = Vec::new();
        let mut rng = StdRng::seed_from_u64(3);

        let doc = prepare(&recognizer, &SampleSource::Uid("a1".into()), &data, &mut rng, &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed, "Amazon lost my parcel.\nTwice.\n");
        assert_eq!(recognizer.seen.borrow().as_slice(), ["Amazon lost my parcel.\nTwice.".to_string()]);
        assert_eq!(doc.text, "Amazon lost my parcel.\nTwice.");
        assert_eq!(doc.ents.len(), 1);
    }

    #[test]
    fn test_random_mode_prints_a_stored_example() {
        let (_dir, data) = fixtures();
        let recognizer = RecordingRecognizer::default();

        for seed in 0..8 {
            let mut out = Vec::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let doc = prepare(&recognizer, &SampleSource::Random, &data, &mut rng, &mut out).unwrap();
            assert!(["Returned it to Amazon.", "Meh."].contains(&doc.text.as_str()));
            assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", doc.text));
        }
    }

    #[test]
    fn test_unknown_uid_prints_nothing_and_fails() {
        let (_dir, data) = fixtures();
        let recognizer = RecordingRecognizer::default();
        let mut out = Vec::new();
        let mut rng = StdRng::seed_from_u64(0);

        let err = prepare(&recognizer, &SampleSource::Uid("zz".into()), &data, &mut rng, &mut out).unwrap_err();
        assert!(err.downcast_ref::<DataError>().is_some());
        assert!(out.is_empty());
        assert!(recognizer.seen.borrow().is_empty());
    }

    #[test]
    fn test_args_accept_optional_uid() {
        let args = Args::try_parse_from(["ner-predict"]).unwrap();
        assert_eq!(args.uid, None);
        let args = Args::try_parse_from(["ner-predict", "--uid", "abc-123"]).unwrap();
        assert_eq!(args.uid.as_deref(), Some("abc-123"));
        assert!(Args::try_parse_from(["ner-predict", "--model", "x"]).is_err());
    }

    #[test]
    fn test_only_uid_and_help_are_accepted() {
        for flag in ["--version", "-V"] {
            let err = Args::try_parse_from(["ner-predict", flag]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument, "{flag}");
        }
        let err = Args::try_parse_from(["ner-predict", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
