use crate::config::TrainingConfig;
use crate::model::{Label, PhishingModel};
use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub texts: Vec<String>,
    pub labels: Vec<Label>,
    /// Rows dropped for a missing/unknown label or empty text
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Metrics {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub total_samples: usize,
    pub dropped_rows: usize,
    pub legitimate_samples: usize,
    pub phishing_samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Held-out metrics; absent when no test split was requested
    pub metrics: Option<Metrics>,
}

pub fn parse_label(raw: &str) -> Option<Label> {
    match raw.trim().to_lowercase().as_str() {
        "ham" | "legitimate" | "safe" | "good" | "0" => Some(Label::Legitimate),
        "spam" | "phishing" | "bad" | "malicious" | "1" => Some(Label::Phishing),
        _ => None,
    }
}

impl Dataset {
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        text_column: &str,
        label_column: &str,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open dataset: {}", path.display()))?;
        Self::from_reader(reader, text_column, label_column)
            .with_context(|| format!("Failed to load dataset: {}", path.display()))
    }

    pub fn from_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
        text_column: &str,
        label_column: &str,
    ) -> anyhow::Result<Self> {
        let headers = reader.headers()?.clone();
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let Some(text_idx) = find(text_column) else {
            bail!("Dataset has no '{text_column}' column");
        };
        let Some(label_idx) = find(label_column) else {
            bail!("Dataset has no '{label_column}' column");
        };

        let mut dataset = Dataset::default();
        for record in reader.records() {
            let record = record?;
            let label = record.get(label_idx).and_then(parse_label);
            let text = record.get(text_idx).map(str::trim).unwrap_or("");
            match label {
                Some(label) if !text.is_empty() => dataset.push(text.to_string(), label),
                _ => dataset.dropped_rows += 1,
            }
        }

        let (legitimate, phishing) = dataset.label_distribution();
        log::info!(
            "Loaded dataset: {} rows (legitimate: {legitimate}, phishing: {phishing}, dropped: {})",
            dataset.len(),
            dataset.dropped_rows
        );
        Ok(dataset)
    }

    pub fn push(&mut self, text: String, label: Label) {
        self.texts.push(text);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(legitimate, phishing)` counts
    pub fn label_distribution(&self) -> (usize, usize) {
        let phishing = self.labels.iter().filter(|l| l.is_phishing()).count();
        (self.labels.len() - phishing, phishing)
    }

    /// Deterministic shuffled split into `(train, test)`
    pub fn train_test_split(&self, test_ratio: f64, seed: u64) -> (Dataset, Dataset) {
        let n = self.len();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let mut test_size = (n as f64 * test_ratio).round() as usize;
        if n > 1 && test_ratio > 0.0 {
            test_size = test_size.clamp(1, n - 1);
        } else if n <= 1 {
            test_size = 0;
        }

        let mut train = Dataset::default();
        let mut test = Dataset::default();
        for (position, &i) in indices.iter().enumerate() {
            let target = if position < test_size {
                &mut test
            } else {
                &mut train
            };
            target.push(self.texts[i].clone(), self.labels[i]);
        }
        (train, test)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn evaluate(model: &PhishingModel, samples: &Dataset) -> Metrics {
    let mut confusion = ConfusionMatrix::default();
    for (text, &actual) in samples.texts.iter().zip(&samples.labels) {
        let predicted = model.predict(text).label;
        match (predicted.is_phishing(), actual.is_phishing()) {
            (true, true) => confusion.true_positives += 1,
            (true, false) => confusion.false_positives += 1,
            (false, false) => confusion.true_negatives += 1,
            (false, true) => confusion.false_negatives += 1,
        }
    }

    let c = &confusion;
    let precision = ratio(c.true_positives, c.true_positives + c.false_positives);
    let recall = ratio(c.true_positives, c.true_positives + c.false_negatives);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Metrics {
        accuracy: ratio(c.true_positives + c.true_negatives, samples.len()),
        precision,
        recall,
        f1,
        confusion,
    }
}

/// Evaluates on a held-out split, then fits the returned model on every row.
pub fn train_pipeline(
    dataset: &Dataset,
    settings: &TrainingConfig,
) -> anyhow::Result<(PhishingModel, TrainingReport)> {
    if dataset.is_empty() {
        bail!("Dataset is empty after dropping unlabeled rows");
    }

    let (legitimate_samples, phishing_samples) = dataset.label_distribution();
    let mut report = TrainingReport {
        total_samples: dataset.len(),
        dropped_rows: dataset.dropped_rows,
        legitimate_samples,
        phishing_samples,
        train_samples: dataset.len(),
        test_samples: 0,
        metrics: None,
    };

    if settings.test_ratio > 0.0 {
        let (train, test) = dataset.train_test_split(settings.test_ratio, settings.seed);
        let (train_legitimate, train_phishing) = train.label_distribution();
        if train_legitimate == 0 || train_phishing == 0 {
            log::warn!(
                "Training split lacks a class (legitimate: {train_legitimate}, phishing: {train_phishing}); skipping held-out evaluation"
            );
        } else {
            report.metrics = Some(holdout_metrics(&train, &test, settings)?);
            report.train_samples = train.len();
            report.test_samples = test.len();
        }
    }

    let model = PhishingModel::train(
        &dataset.texts,
        &dataset.labels,
        settings.alpha,
        settings.stop_words,
    )?;
    Ok((model, report))
}

fn holdout_metrics(
    train: &Dataset,
    test: &Dataset,
    settings: &TrainingConfig,
) -> anyhow::Result<Metrics> {
    log::info!(
        "Evaluating on held-out split: {} train / {} test",
        train.len(),
        test.len()
    );
    let holdout = PhishingModel::train(
        &train.texts,
        &train.labels,
        settings.alpha,
        settings.stop_words,
    )
    .context("Failed to train on the training split")?;
    let metrics = evaluate(&holdout, test);
    log::info!(
        "Held-out accuracy {:.3}, precision {:.3}, recall {:.3}, f1 {:.3}",
        metrics.accuracy,
        metrics.precision,
        metrics.recall,
        metrics.f1
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::sample_corpus;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_bytes())
    }

    fn corpus_dataset() -> Dataset {
        let (texts, labels) = sample_corpus();
        let mut dataset = Dataset::default();
        for (text, label) in texts.into_iter().zip(labels) {
            dataset.push(text.to_string(), label);
        }
        dataset
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(parse_label("ham"), Some(Label::Legitimate));
        assert_eq!(parse_label(" SPAM "), Some(Label::Phishing));
        assert_eq!(parse_label("1"), Some(Label::Phishing));
        assert_eq!(parse_label("0"), Some(Label::Legitimate));
        assert_eq!(parse_label(""), None);
        assert_eq!(parse_label("unknown"), None);
    }

    #[test]
    fn test_reader_drops_bad_rows() {
        let data = "label,text\n\
                    spam,\"Verify your account, now\"\n\
                    ham,See you at lunch\n\
                    ,missing label\n\
                    maybe,unknown label\n\
                    ham,\n";
        let dataset = Dataset::from_reader(reader(data), "text", "label").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dropped_rows, 3);
        assert_eq!(dataset.texts[0], "Verify your account, now");
        assert_eq!(dataset.label_distribution(), (1, 1));
    }

    #[test]
    fn test_reader_requires_columns() {
        let result = Dataset::from_reader(reader("category,body\nspam,x\n"), "text", "label");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emails.csv");
        std::fs::write(&path, "text,label\nhello there friend,ham\nclaim prize now,spam\n").unwrap();
        let dataset = Dataset::from_csv(&path, "text", "label").unwrap();
        assert_eq!(dataset.len(), 2);
        assert!(Dataset::from_csv(dir.path().join("nope.csv"), "text", "label").is_err());
    }

    #[test]
    fn test_split_is_deterministic_and_complete() {
        let dataset = corpus_dataset();
        let (train_a, test_a) = dataset.train_test_split(0.2, 7);
        let (train_b, test_b) = dataset.train_test_split(0.2, 7);
        assert_eq!(test_a.len(), 2);
        assert_eq!(train_a.len(), 8);
        assert_eq!(test_a.texts, test_b.texts);
        assert_eq!(train_a.texts, train_b.texts);
    }

    #[test]
    fn test_split_edge_sizes() {
        let dataset = corpus_dataset();
        let (train, test) = dataset.train_test_split(0.01, 1);
        assert_eq!(test.len(), 1);
        assert_eq!(train.len(), 9);

        let (train, test) = dataset.train_test_split(0.0, 1);
        assert!(test.is_empty());
        assert_eq!(train.len(), 10);
    }

    #[test]
    fn test_metrics_on_training_data() {
        let dataset = corpus_dataset();
        let model = PhishingModel::train(&dataset.texts, &dataset.labels, 1.0, true).unwrap();
        let metrics = evaluate(&model, &dataset);
        assert_eq!(metrics.confusion.true_positives + metrics.confusion.false_negatives, 5);
        assert!(metrics.accuracy > 0.9);
        assert!(metrics.f1 > 0.9);
    }

    #[test]
    fn test_metrics_handle_empty_set() {
        let model = crate::model::tests::trained_model();
        let metrics = evaluate(&model, &Dataset::default());
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.f1, 0.0);
    }

    #[test]
    fn test_pipeline_without_holdout() {
        let settings = TrainingConfig {
            test_ratio: 0.0,
            ..TrainingConfig::default()
        };
        let (model, report) = train_pipeline(&corpus_dataset(), &settings).unwrap();
        assert!(report.metrics.is_none());
        assert_eq!(report.train_samples, 10);
        assert_eq!(model.metadata().training_samples, 10);
    }

    #[test]
    fn test_pipeline_rejects_empty_dataset() {
        assert!(train_pipeline(&Dataset::default(), &TrainingConfig::default()).is_err());
    }

    #[test]
    fn test_pipeline_skips_holdout_when_split_loses_a_class() {
        let mut dataset = Dataset::default();
        dataset.push("Verify your password at the secure login page".to_string(), Label::Phishing);
        dataset.push("See you at lunch on Friday".to_string(), Label::Legitimate);

        let (model, report) = train_pipeline(&dataset, &TrainingConfig::default()).unwrap();
        assert!(report.metrics.is_none());
        assert_eq!(report.train_samples, 2);
        assert_eq!(report.test_samples, 0);
        assert_eq!(model.metadata().training_samples, 2);
        assert_eq!(model.metadata().phishing_samples, 1);
    }
}
