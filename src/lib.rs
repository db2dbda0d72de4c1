pub mod config;
pub mod detector;
pub mod domain_utils;
pub mod inbox;
pub mod links;
pub mod model;
pub mod risk;
pub mod statistics;
pub mod text;
pub mod training;
pub mod url_features;
pub mod url_resolver;
pub mod web;

pub use config::Config;
pub use detector::{PhishingDetector, TextVerdict, UrlVerdict};
pub use model::{Label, PhishingModel};
pub use risk::RiskLevel;
pub use statistics::{StatEvent, StatisticsCollector};
