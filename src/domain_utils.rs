/// Minimal domain helpers shared by URL features and IMAP provider lookup
pub struct DomainUtils;

impl DomainUtils {
    /// Extract domain from email address
    pub fn extract_domain(email: &str) -> Option<String> {
        let domain = email.trim().rsplit_once('@')?.1.trim_end_matches('>');
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_lowercase())
        }
    }

    /// Canonicalize domain (lowercase, no trailing dot, no www prefix)
    pub fn canonicalize_domain(domain: &str) -> String {
        let domain_lower = domain.trim_end_matches('.').to_lowercase();
        match domain_lower.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => domain_lower,
        }
    }

    /// Labels in front of the last two, after dropping `www`
    pub fn subdomain_count(host: &str) -> usize {
        let canonical = Self::canonicalize_domain(host);
        canonical
            .split('.')
            .filter(|l| !l.is_empty())
            .count()
            .saturating_sub(2)
    }

    pub fn tld(host: &str) -> Option<String> {
        let canonical = Self::canonicalize_domain(host);
        let (_, tld) = canonical.rsplit_once('.')?;
        if tld.is_empty() {
            None
        } else {
            Some(tld.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            DomainUtils::extract_domain("user@Example.com"),
            Some("example.com".to_string())
        );
        assert_eq!(
            DomainUtils::extract_domain("<user@mail.example.com>"),
            Some("mail.example.com".to_string())
        );
        assert_eq!(DomainUtils::extract_domain("invalid"), None);
        assert_eq!(DomainUtils::extract_domain("user@"), None);
    }

    #[test]
    fn test_canonicalize_domain() {
        assert_eq!(
            DomainUtils::canonicalize_domain("www.Example.com."),
            "example.com"
        );
        assert_eq!(DomainUtils::canonicalize_domain("example.com"), "example.com");
    }

    #[test]
    fn test_subdomains_and_tld() {
        assert_eq!(DomainUtils::subdomain_count("www.example.com"), 0);
        assert_eq!(DomainUtils::subdomain_count("a.b.example.com"), 2);
        assert_eq!(DomainUtils::subdomain_count("localhost"), 0);
        assert_eq!(DomainUtils::tld("login.example.XYZ"), Some("xyz".to_string()));
        assert_eq!(DomainUtils::tld("localhost"), None);
    }
}
