use crate::domain_utils::DomainUtils;
use crate::url_resolver::is_shortener_host;
use serde::Serialize;
use url::{Host, Url};

const SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "zip", "mov", "click", "country", "work", "icu",
    "buzz", "rest", "fit", "loan", "cam", "support",
];

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "login", "verify", "secure", "account", "update", "banking", "confirm", "password", "signin",
    "wallet", "suspend",
];

const LONG_URL: usize = 75;
const MAX_SUBDOMAINS: usize = 3;
const MAX_HYPHENS: usize = 4;

/// Character-level and structural features of a URL string
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UrlFeatures {
    pub length: usize,
    pub dot_count: usize,
    pub hyphen_count: usize,
    pub underscore_count: usize,
    pub slash_count: usize,
    pub at_count: usize,
    pub question_count: usize,
    pub equals_count: usize,
    pub ampersand_count: usize,
    pub percent_count: usize,
    pub digit_count: usize,
    pub has_ip_host: bool,
    pub uses_https: bool,
    pub subdomain_count: usize,
    pub host_length: usize,
    pub path_depth: usize,
    pub is_shortener: bool,
    pub suspicious_tld: bool,
    pub suspicious_keyword_count: usize,
}

fn parse_lenient(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) if url.host().is_some() => Some(url),
        _ => Url::parse(&format!("http://{raw}"))
            .ok()
            .filter(|u| u.host().is_some()),
    }
}

impl UrlFeatures {
    pub fn extract(raw: &str) -> Self {
        let raw = raw.trim();
        let count = |c: char| raw.chars().filter(|&x| x == c).count();
        let lowered = raw.to_lowercase();

        let mut features = UrlFeatures {
            length: raw.chars().count(),
            dot_count: count('.'),
            hyphen_count: count('-'),
            underscore_count: count('_'),
            slash_count: count('/'),
            at_count: count('@'),
            question_count: count('?'),
            equals_count: count('='),
            ampersand_count: count('&'),
            percent_count: count('%'),
            digit_count: raw.chars().filter(char::is_ascii_digit).count(),
            suspicious_keyword_count: SUSPICIOUS_KEYWORDS
                .iter()
                .filter(|k| lowered.contains(*k))
                .count(),
            ..Default::default()
        };

        if let Some(url) = parse_lenient(raw) {
            features.uses_https = url.scheme() == "https";
            features.path_depth = url
                .path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).count())
                .unwrap_or(0);

            match url.host() {
                Some(Host::Ipv4(ip)) => {
                    features.has_ip_host = true;
                    features.host_length = ip.to_string().len();
                }
                Some(Host::Ipv6(ip)) => {
                    features.has_ip_host = true;
                    features.host_length = ip.to_string().len();
                }
                Some(Host::Domain(domain)) => {
                    features.host_length = domain.len();
                    features.subdomain_count = DomainUtils::subdomain_count(domain);
                    features.is_shortener = is_shortener_host(domain);
                    features.suspicious_tld = DomainUtils::tld(domain)
                        .map(|tld| SUSPICIOUS_TLDS.contains(&tld.as_str()))
                        .unwrap_or(false);
                }
                None => {}
            }
        }

        features
    }

    /// Weighted sum of triggered indicators, clamped to `[0,1]`
    pub fn heuristic_score(&self) -> f64 {
        let mut score = 0.0;
        if self.has_ip_host {
            score += 0.3;
        }
        if self.at_count > 0 {
            score += 0.2;
        }
        if self.length > LONG_URL {
            score += 0.1;
        }
        if self.subdomain_count > MAX_SUBDOMAINS {
            score += 0.15;
        }
        if self.hyphen_count > MAX_HYPHENS {
            score += 0.1;
        }
        if !self.uses_https {
            score += 0.05;
        }
        if self.is_shortener {
            score += 0.15;
        }
        if self.suspicious_tld {
            score += 0.2;
        }
        score += (0.05 * self.suspicious_keyword_count as f64).min(0.2);
        score.clamp(0.0, 1.0)
    }

    pub fn indicators(&self) -> Vec<String> {
        let mut found = Vec::new();
        if self.has_ip_host {
            found.push("Host is a raw IP address".to_string());
        }
        if self.at_count > 0 {
            found.push("Contains '@', which can hide the real destination".to_string());
        }
        if self.length > LONG_URL {
            found.push(format!("Unusually long URL ({} characters)", self.length));
        }
        if self.subdomain_count > MAX_SUBDOMAINS {
            found.push(format!("Many subdomains ({})", self.subdomain_count));
        }
        if self.hyphen_count > MAX_HYPHENS {
            found.push(format!("Many hyphens ({})", self.hyphen_count));
        }
        if !self.uses_https {
            found.push("Does not use HTTPS".to_string());
        }
        if self.is_shortener {
            found.push("Uses a URL shortener".to_string());
        }
        if self.suspicious_tld {
            found.push("Top-level domain is frequently abused".to_string());
        }
        if self.suspicious_keyword_count > 0 {
            found.push(format!(
                "Contains {} credential-related keyword(s)",
                self.suspicious_keyword_count
            ));
        }
        found
    }
}
