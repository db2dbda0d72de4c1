use crate::detector::UrlVerdict;
use crate::inbox::InboxReport;
use std::fmt::Write;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 56rem; margin: 2rem auto; padding: 0 1rem; }}
.phishing {{ color: #b00020; }}
.legitimate {{ color: #1b5e20; }}
.error {{ color: #b00020; }}
table {{ border-collapse: collapse; width: 100%; }}
td, th {{ border: 1px solid #ccc; padding: 0.3rem 0.5rem; text-align: left; vertical-align: top; }}
</style>
</head>
<body>
<nav><a href="/">Check a URL</a> | <a href="/scan-inbox/">Scan inbox</a></nav>
<h1>{title}</h1>
{content}
</body>
</html>
"#,
        title = escape_html(title),
    )
}

fn verdict_class(is_phishing: bool) -> &'static str {
    if is_phishing {
        "phishing"
    } else {
        "legitimate"
    }
}

pub fn detect_url_page(url: &str, verdict: Option<&UrlVerdict>) -> String {
    let mut content = format!(
        r#"<form method="post" action="/">
<label for="url">URL</label>
<input type="text" id="url" name="url" size="60" value="{}">
<button type="submit">Check</button>
</form>
"#,
        escape_html(url)
    );

    if let Some(v) = verdict {
        let _ = write!(
            content,
            r#"<section id="result">
<h2 class="{class}">{label}</h2>
<p>Confidence: {probability:.2}%</p>
<p>Risk level: <strong>{risk}</strong></p>
"#,
            class = verdict_class(v.is_phishing),
            label = escape_html(v.label),
            probability = v.probability,
            risk = v.risk_level,
        );
        if !v.indicators.is_empty() {
            content.push_str("<ul>\n");
            for indicator in &v.indicators {
                let _ = writeln!(content, "<li>{}</li>", escape_html(indicator));
            }
            content.push_str("</ul>\n");
        }
        content.push_str("</section>\n");
    }

    layout("Phishing URL Detector", &content)
}

pub fn scan_inbox_page(email: &str, error: Option<&str>, report: Option<&InboxReport>) -> String {
    let mut content = String::new();
    if let Some(message) = error {
        let _ = writeln!(content, r#"<p class="error">{}</p>"#, escape_html(message));
    }
    let _ = write!(
        content,
        r#"<form method="post" action="/scan-inbox/">
<label for="email">Email</label>
<input type="email" id="email" name="email" value="{}">
<label for="password">App password</label>
<input type="password" id="password" name="password">
<label for="limit">Messages</label>
<input type="number" id="limit" name="limit" min="1">
<button type="submit">Scan</button>
</form>
"#,
        escape_html(email)
    );

    if let Some(report) = report {
        let _ = write!(
            content,
            "<p>Scanned {} messages, {} flagged, {} could not be read.</p>\n",
            report.scanned, report.flagged, report.failed
        );
        content.push_str(
            "<table>\n<tr><th>From</th><th>Subject</th><th>Verdict</th><th>Suspicious links</th></tr>\n",
        );
        for email in &report.emails {
            let verdict = match &email.text_verdict {
                Some(v) => format!(
                    r#"<span class="{}">{}</span> ({:.2}%)"#,
                    verdict_class(v.is_phishing),
                    escape_html(v.label),
                    v.probability
                ),
                None => "No text".to_string(),
            };
            let links = email
                .suspicious_links
                .iter()
                .map(|l| format!("{} ({})", escape_html(&l.url), l.risk_level))
                .collect::<Vec<_>>()
                .join("<br>");
            let _ = writeln!(
                content,
                r#"<tr class="{}"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                if email.flagged { "flagged" } else { "clean" },
                escape_html(&email.from),
                escape_html(&email.subject),
                verdict,
                links
            );
        }
        content.push_str("</table>\n");
    }

    layout("Inbox Scanner", &content)
}
