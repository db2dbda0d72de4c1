use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::risk::RiskThresholds;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub risk: RiskConfig,
    pub training: TrainingConfig,
    pub inbox: InboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub body_limit_kb: usize,
    /// When set, the JSON API requires `X-API-Key` or Basic auth with this key as password
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub medium_threshold: f64,
    pub high_threshold: f64,
    /// Share of the URL risk score taken from string heuristics rather than the model
    pub url_heuristic_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub dataset_path: String,
    pub text_column: String,
    pub label_column: String,
    pub test_ratio: f64,
    pub seed: u64,
    pub alpha: f64,
    pub stop_words: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    pub mailbox: String,
    pub fetch_limit: usize,
    pub timeout_seconds: u64,
    pub imap_host: Option<String>,
    pub imap_port: Option<u16>,
    pub resolve_shorteners: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            body_limit_kb: 256,
            api_key: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            model_path: "ml_model/phishing_model.json".to_string(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            medium_threshold: 0.5,
            high_threshold: 0.8,
            url_heuristic_weight: 0.3,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            dataset_path: "data/emails.csv".to_string(),
            text_column: "text".to_string(),
            label_column: "label".to_string(),
            test_ratio: 0.2,
            seed: 42,
            alpha: 1.0,
            stop_words: true,
        }
    }
}

impl Default for InboxConfig {
    fn default() -> Self {
        InboxConfig {
            mailbox: "INBOX".to_string(),
            fetch_limit: 20,
            timeout_seconds: 30,
            imap_host: None,
            imap_port: None,
            resolve_shorteners: false,
        }
    }
}

impl RiskConfig {
    pub fn thresholds(&self) -> RiskThresholds {
        RiskThresholds {
            medium: self.medium_threshold,
            high: self.high_threshold,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {path}"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let risk = &self.risk;
        for (name, value) in [
            ("risk.medium_threshold", risk.medium_threshold),
            ("risk.high_threshold", risk.high_threshold),
            ("risk.url_heuristic_weight", risk.url_heuristic_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be between 0 and 1, got {value}");
            }
        }
        if risk.medium_threshold > risk.high_threshold {
            bail!(
                "risk.medium_threshold ({}) must not exceed risk.high_threshold ({})",
                risk.medium_threshold,
                risk.high_threshold
            );
        }
        if !(0.0..1.0).contains(&self.training.test_ratio) {
            bail!(
                "training.test_ratio must be in [0, 1), got {}",
                self.training.test_ratio
            );
        }
        if self.training.alpha <= 0.0 {
            bail!("training.alpha must be positive, got {}", self.training.alpha);
        }
        if self.inbox.fetch_limit == 0 {
            bail!("inbox.fetch_limit must be at least 1");
        }
        if self.inbox.timeout_seconds == 0 {
            bail!("inbox.timeout_seconds must be at least 1");
        }
        Ok(())
    }
}
