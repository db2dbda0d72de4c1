use anyhow::Context;
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct RawMessage {
    pub uid: Option<u32>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchedEmail {
    pub uid: Option<u32>,
    pub subject: String,
    pub from: String,
    pub date: Option<String>,
    pub body: String,
    pub is_html: bool,
}

#[derive(Default)]
struct BodyParts {
    plain: Vec<String>,
    html: Vec<String>,
}

fn collect_parts(part: &ParsedMail, parts: &mut BodyParts) {
    if part.get_content_disposition().disposition == DispositionType::Attachment {
        return;
    }
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_parts(sub, parts);
        }
        return;
    }

    let mimetype = part.ctype.mimetype.to_lowercase();
    if mimetype != "text/plain" && mimetype != "text/html" {
        return;
    }
    match part.get_body() {
        Ok(body) if mimetype == "text/plain" => parts.plain.push(body),
        Ok(body) => parts.html.push(body),
        Err(e) => log::debug!("Skipping undecodable {mimetype} part: {e}"),
    }
}

pub fn parse_message(raw: &RawMessage) -> anyhow::Result<FetchedEmail> {
    let parsed = mailparse::parse_mail(&raw.bytes).with_context(|| {
        format!("Failed to parse message {}", raw.uid.map_or("?".to_string(), |u| u.to_string()))
    })?;

    let mut parts = BodyParts::default();
    collect_parts(&parsed, &mut parts);
    let is_html = parts.plain.is_empty() && !parts.html.is_empty();
    let body = if is_html {
        parts.html.join("\n")
    } else {
        parts.plain.join("\n")
    };

    Ok(FetchedEmail {
        uid: raw.uid,
        subject: parsed.headers.get_first_value("Subject").unwrap_or_default(),
        from: parsed.headers.get_first_value("From").unwrap_or_default(),
        date: parsed.headers.get_first_value("Date"),
        body,
        is_html,
    })
}

/// Visible text of an HTML body, for classification
pub fn strip_html(html: &str) -> String {
    static TAGS: OnceLock<(Regex, Regex)> = OnceLock::new();
    let (blocks, tags) = TAGS.get_or_init(|| {
        (
            Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap(),
            Regex::new(r"(?s)<[^>]*>").unwrap(),
        )
    });
    let without_blocks = blocks.replace_all(html, " ");
    let text = tags.replace_all(&without_blocks, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl FetchedEmail {
    /// Subject and visible body text joined for the text classifier
    pub fn classification_text(&self) -> String {
        let body = if self.is_html {
            strip_html(&self.body)
        } else {
            self.body.clone()
        };
        format!("{}\n{}", self.subject, body).trim().to_string()
    }
}
