use crate::config::RiskConfig;
use crate::model::PhishingModel;
use crate::risk::{as_percent, verdict_label, RiskLevel};
use crate::url_features::UrlFeatures;
use anyhow::bail;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct TextVerdict {
    pub is_phishing: bool,
    pub label: &'static str,
    /// Confidence of the predicted class, as a percentage
    pub probability: f64,
    pub phishing_probability: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct UrlVerdict {
    pub url: String,
    pub is_phishing: bool,
    pub label: &'static str,
    pub probability: f64,
    pub phishing_probability: f64,
    pub heuristic_score: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub features: UrlFeatures,
    pub indicators: Vec<String>,
}

impl UrlVerdict {
    pub fn is_suspicious(&self) -> bool {
        self.is_phishing || self.risk_level >= RiskLevel::Medium
    }
}

#[derive(Clone)]
pub struct PhishingDetector {
    model: Arc<PhishingModel>,
    risk: RiskConfig,
}

impl PhishingDetector {
    pub fn new(model: Arc<PhishingModel>, risk: RiskConfig) -> Self {
        Self { model, risk }
    }

    pub fn model(&self) -> &PhishingModel {
        &self.model
    }

    pub fn check_text(&self, text: &str) -> anyhow::Result<TextVerdict> {
        let text = text.trim();
        if text.is_empty() {
            bail!("Text to classify is empty");
        }

        let prediction = self.model.predict(text);
        let risk_score = prediction.phishing_probability;
        let verdict = TextVerdict {
            is_phishing: prediction.is_phishing(),
            label: verdict_label(prediction.is_phishing()),
            probability: as_percent(prediction.confidence),
            phishing_probability: prediction.phishing_probability,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score, &self.risk.thresholds()),
        };
        log::debug!(
            "Text verdict: {} ({:.2}%, risk {})",
            verdict.label,
            verdict.probability,
            verdict.risk_level
        );
        Ok(verdict)
    }

    pub fn check_url(&self, url: &str) -> anyhow::Result<UrlVerdict> {
        let url = url.trim();
        if url.is_empty() {
            bail!("URL to classify is empty");
        }

        let prediction = self.model.predict(url);
        let features = UrlFeatures::extract(url);
        let heuristic_score = features.heuristic_score();
        let weight = self.risk.url_heuristic_weight;
        let risk_score =
            ((1.0 - weight) * prediction.phishing_probability + weight * heuristic_score)
                .clamp(0.0, 1.0);

        let verdict = UrlVerdict {
            url: url.to_string(),
            is_phishing: prediction.is_phishing(),
            label: verdict_label(prediction.is_phishing()),
            probability: as_percent(prediction.confidence),
            phishing_probability: prediction.phishing_probability,
            heuristic_score,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score, &self.risk.thresholds()),
            indicators: features.indicators(),
            features,
        };
        log::debug!(
            "URL verdict for {}: {} ({:.2}%, risk {})",
            verdict.url,
            verdict.label,
            verdict.probability,
            verdict.risk_level
        );
        Ok(verdict)
    }

    pub fn detect_phishing(&self, text: &str) -> bool {
        self.model.detect_phishing(text)
    }
}
