use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

struct LinkPatterns {
    href: Regex,
    bare: Regex,
}

fn patterns() -> &'static LinkPatterns {
    static PATTERNS: OnceLock<LinkPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LinkPatterns {
        href: Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).unwrap(),
        bare: Regex::new(r#"(?i)\bhttps?://[^\s<>"'\[\]{}]+"#).unwrap(),
    })
}

fn decode_html_entities(text: &str) -> String {
    let entities = [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&#x2F;", "/"),
        ("&#47;", "/"),
        ("&#46;", "."),
        ("&amp;", "&"),
    ];

    let mut result = text.to_string();
    for (entity, replacement) in &entities {
        result = result.replace(entity, replacement);
    }
    result
}

/// Drops trailing punctuation; a closing paren stays when it balances an opening one
fn trim_trailing(raw: &str) -> &str {
    let mut link = raw.trim();
    while let Some(last) = link.chars().last() {
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '>' | '\'' | '"' => true,
            ')' => link.matches(')').count() > link.matches('(').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        link = &link[..link.len() - last.len_utf8()];
    }
    link
}

fn clean_link(raw: &str) -> Option<String> {
    let link = trim_trailing(raw);
    let lower = link.to_lowercase();
    // mailto:, tel:, cid:, anchors and relative paths are not navigable targets
    let navigable = ["http://", "https://", "www."]
        .iter()
        .any(|prefix| lower.starts_with(prefix));
    if navigable && link.len() > 8 {
        Some(link.to_string())
    } else {
        None
    }
}

/// Links found in a plain-text or HTML email body, in first-seen order
pub fn extract_links(body: &str) -> Vec<String> {
    let decoded = decode_html_entities(body);
    let patterns = patterns();

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let hrefs: Vec<(usize, usize, &str)> = patterns
        .href
        .captures_iter(&decoded)
        .filter_map(|cap| cap.get(1).map(|m| (m.start(), m.end(), m.as_str())))
        .collect();
    // A bare match inside an href value would duplicate a truncated copy of it
    let inside_href = |position: usize| {
        hrefs
            .iter()
            .any(|&(start, end, _)| position >= start && position < end)
    };

    let mut ordered: Vec<(usize, &str)> = hrefs
        .iter()
        .map(|&(start, _, link)| (start, link))
        .chain(
            patterns
                .bare
                .find_iter(&decoded)
                .filter(|m| !inside_href(m.start()))
                .map(|m| (m.start(), m.as_str())),
        )
        .collect();
    ordered.sort_by_key(|(position, _)| *position);

    for (_, raw) in ordered {
        if let Some(link) = clean_link(raw) {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    log::debug!("Extracted {} links from body", links.len());
    links
}
