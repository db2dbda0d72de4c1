pub mod imap_source;
pub mod message;

pub use imap_source::{ImapProvider, ImapSource};
pub use message::{parse_message, FetchedEmail, RawMessage};

use crate::config::InboxConfig;
use crate::detector::{PhishingDetector, TextVerdict, UrlVerdict};
use crate::links::extract_links;
use crate::url_resolver::UrlResolver;
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::time::Duration;

/// Source of raw RFC 822 messages, newest first
pub trait MailSource {
    fn fetch_recent(&mut self, limit: usize) -> anyhow::Result<Vec<RawMessage>>;
}

/// In-memory message source
#[derive(Debug, Default)]
pub struct MemorySource {
    pub messages: Vec<RawMessage>,
}

impl MailSource for MemorySource {
    fn fetch_recent(&mut self, limit: usize) -> anyhow::Result<Vec<RawMessage>> {
        Ok(self.messages.iter().take(limit).cloned().collect())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailScan {
    pub uid: Option<u32>,
    pub subject: String,
    pub from: String,
    pub date: Option<String>,
    pub text_verdict: Option<TextVerdict>,
    pub links: Vec<UrlVerdict>,
    pub suspicious_links: Vec<UrlVerdict>,
    pub flagged: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InboxReport {
    pub scanned: usize,
    pub flagged: usize,
    pub failed: usize,
    pub emails: Vec<EmailScan>,
}

pub struct InboxScanner {
    detector: PhishingDetector,
    resolver: Option<UrlResolver>,
    limit: usize,
}

impl InboxScanner {
    pub fn new(detector: PhishingDetector, config: &InboxConfig) -> Self {
        let resolver = config
            .resolve_shorteners
            .then(|| UrlResolver::new(config.timeout_seconds.min(10)).unwrap_or_default());
        Self {
            detector,
            resolver,
            limit: config.fetch_limit,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub async fn scan(&self, source: &mut dyn MailSource) -> anyhow::Result<InboxReport> {
        let messages = source.fetch_recent(self.limit)?;
        Ok(self.analyze(messages).await)
    }

    async fn expand_link(&self, link: String) -> String {
        let Some(resolver) = &self.resolver else {
            return link;
        };
        if !resolver.is_shortener(&link) {
            return link;
        }
        match resolver.resolve_url(&link).await {
            Ok(resolved) => resolved,
            Err(e) => {
                log::debug!("Could not resolve shortened link {link}: {e}");
                link
            }
        }
    }

    async fn scan_email(&self, email: FetchedEmail) -> EmailScan {
        let text = email.classification_text();
        let text_verdict = self.detector.check_text(&text).ok();

        let mut links = Vec::new();
        for link in extract_links(&email.body) {
            let link = self.expand_link(link).await;
            match self.detector.check_url(&link) {
                Ok(verdict) => links.push(verdict),
                Err(e) => log::debug!("Skipping link {link}: {e}"),
            }
        }

        let suspicious_links: Vec<UrlVerdict> =
            links.iter().filter(|v| v.is_suspicious()).cloned().collect();
        let flagged = text_verdict.as_ref().is_some_and(|v| v.is_phishing)
            || !suspicious_links.is_empty();

        EmailScan {
            uid: email.uid,
            subject: email.subject,
            from: email.from,
            date: email.date,
            text_verdict,
            links,
            suspicious_links,
            flagged,
        }
    }

    pub async fn analyze(&self, messages: Vec<RawMessage>) -> InboxReport {
        self.analyze_with(messages, parse_message).await
    }

    async fn analyze_with<F>(&self, messages: Vec<RawMessage>, parse: F) -> InboxReport
    where
        F: Fn(&RawMessage) -> anyhow::Result<FetchedEmail>,
    {
        let mut report = InboxReport::default();
        for raw in &messages {
            let email = match parse(raw) {
                Ok(email) => email,
                Err(e) => {
                    log::warn!("{e:#}");
                    report.failed += 1;
                    continue;
                }
            };
            let scan = self.scan_email(email).await;
            if scan.flagged {
                report.flagged += 1;
            }
            report.scanned += 1;
            report.emails.push(scan);
        }
        log::info!(
            "Inbox scan complete: {} scanned, {} flagged, {} failed",
            report.scanned,
            report.flagged,
            report.failed
        );
        report
    }
}

/// Fetch over IMAP on a blocking thread, then analyze
pub async fn scan_imap(
    detector: PhishingDetector,
    config: &InboxConfig,
    address: &str,
    password: &str,
    limit: Option<usize>,
) -> anyhow::Result<InboxReport> {
    let provider = ImapProvider::resolve(address, config);
    let mut source = ImapSource::new(provider, address, password, config);
    let scanner = InboxScanner::new(detector, config);
    let scanner = match limit {
        Some(limit) => scanner.with_limit(limit.min(config.fetch_limit)),
        None => scanner,
    };
    let fetch_limit = scanner.limit;

    let fetch = tokio::task::spawn_blocking(move || source.fetch_recent(fetch_limit));
    let messages = tokio::time::timeout(Duration::from_secs(config.timeout_seconds), fetch)
        .await
        .map_err(|_| anyhow!("Timed out after {}s fetching {address}", config.timeout_seconds))?
        .context("IMAP worker panicked")??;

    Ok(scanner.analyze(messages).await)
}
