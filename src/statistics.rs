use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KindStats {
    pub checks: u64,
    pub phishing: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub urls: KindStats,
    pub texts: KindStats,
    pub inbox_scans: u64,
    pub inbox_emails_scanned: u64,
    pub inbox_emails_flagged: u64,
    pub inbox_failures: u64,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl GlobalStats {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            urls: KindStats::default(),
            texts: KindStats::default(),
            inbox_scans: 0,
            inbox_emails_scanned: 0,
            inbox_emails_flagged: 0,
            inbox_failures: 0,
            start_time: now,
            last_updated: now,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StatEvent {
    UrlChecked { is_phishing: bool },
    TextChecked { is_phishing: bool },
    InboxScanned { scanned: usize, flagged: usize },
    InboxFailed,
}

pub struct StatisticsCollector {
    stats: Mutex<GlobalStats>,
}

impl Default for StatisticsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self {
            stats: Mutex::new(GlobalStats::new()),
        }
    }

    pub fn record_event(&self, event: StatEvent) {
        match self.stats.lock() {
            Ok(mut stats) => Self::process_event(event, &mut stats),
            Err(e) => log::warn!("Failed to record statistics event: {e}"),
        }
    }

    fn process_event(event: StatEvent, stats: &mut GlobalStats) {
        stats.last_updated = Utc::now();

        match event {
            StatEvent::UrlChecked { is_phishing } => {
                stats.urls.checks += 1;
                if is_phishing {
                    stats.urls.phishing += 1;
                }
            }
            StatEvent::TextChecked { is_phishing } => {
                stats.texts.checks += 1;
                if is_phishing {
                    stats.texts.phishing += 1;
                }
            }
            StatEvent::InboxScanned { scanned, flagged } => {
                stats.inbox_scans += 1;
                stats.inbox_emails_scanned += scanned as u64;
                stats.inbox_emails_flagged += flagged as u64;
            }
            StatEvent::InboxFailed => {
                stats.inbox_failures += 1;
            }
        }
    }

    pub fn get_stats(&self) -> GlobalStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(e) => {
                log::error!("Failed to lock statistics mutex: {e}");
                GlobalStats::new()
            }
        }
    }

    pub fn reset_stats(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            *stats = GlobalStats::new();
        }
    }
}
