pub mod naive_bayes;

pub use naive_bayes::{Label, MultinomialNb};

use crate::text::TfidfVectorizer;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    pub legitimate_samples: usize,
    pub phishing_samples: usize,
    pub vocabulary_size: usize,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: Label,
    pub phishing_probability: f64,
    /// Probability of the predicted class
    pub confidence: f64,
}

impl Prediction {
    pub fn is_phishing(&self) -> bool {
        self.label.is_phishing()
    }
}

/// A fitted vectorizer and classifier, persisted together so that feature
/// indices always agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhishingModel {
    vectorizer: TfidfVectorizer,
    classifier: MultinomialNb,
    metadata: ModelMetadata,
}

impl PhishingModel {
    pub fn train<S: AsRef<str>>(
        documents: &[S],
        labels: &[Label],
        alpha: f64,
        stop_words: bool,
    ) -> anyhow::Result<Self> {
        if documents.len() != labels.len() {
            bail!(
                "Document count ({}) does not match label count ({})",
                documents.len(),
                labels.len()
            );
        }

        let mut vectorizer = TfidfVectorizer::new(stop_words);
        let features = vectorizer.fit_transform(documents)?;
        let classifier =
            MultinomialNb::fit(&features, labels, vectorizer.vocabulary_size(), alpha)?;

        let phishing_samples = labels.iter().filter(|l| l.is_phishing()).count();
        let metadata = ModelMetadata {
            trained_at: Utc::now(),
            training_samples: labels.len(),
            legitimate_samples: labels.len() - phishing_samples,
            phishing_samples,
            vocabulary_size: vectorizer.vocabulary_size(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(Self {
            vectorizer,
            classifier,
            metadata,
        })
    }

    pub fn predict(&self, text: &str) -> Prediction {
        let features = self.vectorizer.transform(text);
        let label = self.classifier.predict(&features);
        let proba = self.classifier.predict_proba(&features);
        Prediction {
            label,
            phishing_probability: proba[Label::Phishing.index()],
            confidence: proba[0].max(proba[1]),
        }
    }

    pub fn detect_phishing(&self, text: &str) -> bool {
        self.predict(text).is_phishing()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create model directory: {}", parent.display())
                })?;
            }
        }
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write model file: {path}"))?;
        log::info!("Model saved to {path}");
        Ok(())
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {path}"))?;
        let model: PhishingModel = serde_json::from_str(&content)
            .with_context(|| format!("Model file is corrupt or incompatible: {path}"))?;
        log::info!(
            "Loaded model from {path} ({} samples, vocabulary {})",
            model.metadata.training_samples,
            model.metadata.vocabulary_size
        );
        Ok(model)
    }
}
