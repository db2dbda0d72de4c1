use anyhow::Context;
use reqwest::Client;
use std::time::Duration;
use url::Url;

pub const SHORTENER_HOSTS: &[&str] = &[
    "bit.ly", "tinyurl.com", "t.co", "goo.gl", "ow.ly", "short.link", "is.gd", "v.gd", "tiny.cc",
    "rb.gy", "cutt.ly", "shorturl.at", "1url.com", "u.to", "buff.ly", "rebrand.ly",
];

/// Known shortener host, matched exactly or as a parent domain
pub fn is_shortener_host(host: &str) -> bool {
    let host = host.to_lowercase();
    SHORTENER_HOSTS
        .iter()
        .any(|s| host == *s || host.ends_with(&format!(".{s}")))
}

pub struct UrlResolver {
    client: Client,
    max_redirects: u8,
}

impl UrlResolver {
    pub fn new(timeout_seconds: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("phishguard/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            max_redirects: 5,
        })
    }

    /// Follow HEAD redirects to the final destination of a shortened URL
    pub async fn resolve_url(&self, url: &str) -> anyhow::Result<String> {
        let mut current_url = url.to_string();
        let mut redirect_count = 0;

        while redirect_count < self.max_redirects {
            let response = self
                .client
                .head(&current_url)
                .send()
                .await
                .with_context(|| format!("HEAD request failed for {current_url}"))?;

            if !response.status().is_redirection() {
                break;
            }
            let Some(location) = response.headers().get(reqwest::header::LOCATION) else {
                break;
            };
            let location_str = location.to_str()?;

            current_url = if location_str.starts_with("http") {
                location_str.to_string()
            } else {
                let base = Url::parse(&current_url)?;
                base.join(location_str)?.to_string()
            };
            redirect_count += 1;
        }

        log::debug!("Resolved {url} -> {current_url} ({redirect_count} redirects)");
        Ok(current_url)
    }

    pub fn is_shortener(&self, url: &str) -> bool {
        match self.extract_domain(url) {
            Some(host) => is_shortener_host(&host),
            None => false,
        }
    }

    pub fn extract_domain(&self, url: &str) -> Option<String> {
        Url::parse(url).ok()?.host_str().map(|h| h.to_lowercase())
    }
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::new(10).unwrap_or_else(|e| {
            log::warn!("Failed to build HTTP client, using defaults: {e}");
            Self {
                client: Client::new(),
                max_redirects: 5,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_shortener() {
        let resolver = UrlResolver::default();

        assert!(resolver.is_shortener("https://bit.ly/abc123"));
        assert!(resolver.is_shortener("http://tinyurl.com/test"));
        assert!(resolver.is_shortener("https://t.co/xyz789"));
        assert!(!resolver.is_shortener("https://google.com"));
        assert!(!resolver.is_shortener("https://microsoft.com/path"));
        assert!(!resolver.is_shortener("not a url"));
    }

    #[test]
    fn test_extract_domain() {
        let resolver = UrlResolver::default();

        assert_eq!(
            resolver.extract_domain("https://Example.com/path"),
            Some("example.com".to_string())
        );
        assert_eq!(
            resolver.extract_domain("http://bit.ly/abc123"),
            Some("bit.ly".to_string())
        );
        assert_eq!(resolver.extract_domain("invalid-url"), None);
    }

    #[test]
    fn test_shortener_host_matching() {
        assert!(is_shortener_host("BIT.LY"));
        assert!(is_shortener_host("www.bit.ly"));
        assert!(!is_shortener_host("habit.ly"));
    }
}
