use super::message::RawMessage;
use super::MailSource;
use crate::config::InboxConfig;
use crate::domain_utils::DomainUtils;
use anyhow::{anyhow, Context};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ImapProvider {
    pub host: String,
    pub port: u16,
}

impl ImapProvider {
    pub fn from_email(email: &str) -> Self {
        let domain = DomainUtils::extract_domain(email).unwrap_or_default();

        let host = if domain.contains("outlook")
            || domain.contains("hotmail")
            || domain.contains("live.com")
        {
            "imap-mail.outlook.com"
        } else if domain.contains("yahoo") {
            "imap.mail.yahoo.com"
        } else if domain.contains("icloud") || domain.contains("me.com") || domain.contains("mac.com")
        {
            "imap.mail.me.com"
        } else {
            "imap.gmail.com"
        };

        Self {
            host: host.to_string(),
            port: 993,
        }
    }

    /// Configured host/port take precedence over detection by address
    pub fn resolve(email: &str, config: &InboxConfig) -> Self {
        let detected = Self::from_email(email);
        Self {
            host: config.imap_host.clone().unwrap_or(detected.host),
            port: config.imap_port.unwrap_or(detected.port),
        }
    }
}

pub struct ImapSource {
    provider: ImapProvider,
    username: String,
    password: String,
    mailbox: String,
    timeout: Duration,
}

impl ImapSource {
    pub fn new(provider: ImapProvider, username: &str, password: &str, config: &InboxConfig) -> Self {
        Self {
            provider,
            username: username.to_string(),
            password: password.to_string(),
            mailbox: config.mailbox.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

/// IMAP sequence set covering the newest `limit` of `exists` messages
pub fn newest_sequence_set(exists: u32, limit: usize) -> Option<String> {
    if exists == 0 || limit == 0 {
        return None;
    }
    let limit = u32::try_from(limit).unwrap_or(u32::MAX);
    let start = exists.saturating_sub(limit).saturating_add(1).max(1);
    Some(format!("{start}:{exists}"))
}

impl MailSource for ImapSource {
    fn fetch_recent(&mut self, limit: usize) -> anyhow::Result<Vec<RawMessage>> {
        let ImapProvider { host, port } = &self.provider;
        log::info!(
            "Connecting to {host}:{port} for {} (mailbox {})",
            self.username,
            self.mailbox
        );

        let tls = native_tls::TlsConnector::builder().build()?;
        let tcp = std::net::TcpStream::connect((host.as_str(), *port))
            .with_context(|| format!("Failed to connect to IMAP server {host}:{port}"))?;
        tcp.set_read_timeout(Some(self.timeout))?;
        tcp.set_write_timeout(Some(self.timeout))?;
        let stream = tls
            .connect(host, tcp)
            .map_err(|e| anyhow!("TLS handshake with {host} failed: {e}"))?;

        let mut client = imap::Client::new(stream);
        client.read_greeting()?;
        let mut session = client
            .login(&self.username, &self.password)
            .map_err(|(e, _)| anyhow!("IMAP login failed for {}: {e}", self.username))?;

        let mailbox = session
            .select(&self.mailbox)
            .with_context(|| format!("Failed to select mailbox {}", self.mailbox))?;

        let mut messages = Vec::new();
        if let Some(range) = newest_sequence_set(mailbox.exists, limit) {
            log::debug!("Fetching messages {range} of {}", mailbox.exists);
            let fetched = session.fetch(&range, "(UID RFC822)")?;
            for fetch in fetched.iter() {
                if let Some(body) = fetch.body() {
                    messages.push(RawMessage {
                        uid: fetch.uid,
                        bytes: body.to_vec(),
                    });
                }
            }
        }
        // Sequence numbers ascend with arrival time
        messages.reverse();

        if let Err(e) = session.logout() {
            log::warn!("IMAP logout failed: {e}");
        }
        log::info!("Fetched {} messages from {}", messages.len(), self.mailbox);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_detection() {
        assert_eq!(
            ImapProvider::from_email("someone@outlook.com").host,
            "imap-mail.outlook.com"
        );
        assert_eq!(
            ImapProvider::from_email("someone@yahoo.co.uk").host,
            "imap.mail.yahoo.com"
        );
        assert_eq!(
            ImapProvider::from_email("someone@icloud.com").host,
            "imap.mail.me.com"
        );
        let gmail = ImapProvider::from_email("someone@gmail.com");
        assert_eq!(gmail.host, "imap.gmail.com");
        assert_eq!(gmail.port, 993);
    }

    #[test]
    fn test_config_override() {
        let config = InboxConfig {
            imap_host: Some("mail.corp.example".to_string()),
            imap_port: Some(1993),
            ..InboxConfig::default()
        };
        let provider = ImapProvider::resolve("me@gmail.com", &config);
        assert_eq!(provider.host, "mail.corp.example");
        assert_eq!(provider.port, 1993);
    }

    #[test]
    fn test_sequence_set() {
        assert_eq!(newest_sequence_set(0, 20), None);
        assert_eq!(newest_sequence_set(5, 20), Some("1:5".to_string()));
        assert_eq!(newest_sequence_set(100, 20), Some("81:100".to_string()));
        assert_eq!(newest_sequence_set(20, 20), Some("1:20".to_string()));
        assert_eq!(newest_sequence_set(3, 0), None);
    }
}
