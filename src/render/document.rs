//! HTML preparation before rendering

use super::RenderJob;

/// Apply CSS and base URL to the submitted HTML
pub fn compose(job: &RenderJob) -> String {
    let mut html = match job.css.as_deref().filter(|c| !c.is_empty()) {
        Some(css) => inject_css(&job.html, css),
        None => job.html.clone(),
    };
    if let Some(base_url) = job.base_url.as_deref().filter(|b| !b.is_empty()) {
        html = inject_base(&html, base_url);
    }
    html
}

/// Insert a `<style>` block before `</head>`, or wrap a fragment in a document
pub fn inject_css(html: &str, css: &str) -> String {
    let style = format!("<style>{}</style>", css);
    match find_ignore_case(html, "</head>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + style.len());
            out.push_str(&html[..idx]);
            out.push_str(&style);
            out.push_str(&html[idx..]);
            out
        }
        None => format!(
            "<!DOCTYPE html><html><head>{}</head><body>{}</body></html>",
            style, html
        ),
    }
}

/// Add `<base href>` so relative URLs resolve against `base_url`
pub fn inject_base(html: &str, base_url: &str) -> String {
    let tag = format!("<base href=\"{}\">", escape_attr(base_url));

    let open = find_ignore_case(html, "<head>").or_else(|| find_ignore_case(html, "<head "));
    match open.and_then(|start| html[start..].find('>').map(|end| start + end + 1)) {
        Some(at) => format!("{}{}{}", &html[..at], tag, &html[at..]),
        None => format!("{}{}", tag, html),
    }
}

/// Numeric margin with an optional px/mm/cm/in unit; anything else is `0`
pub fn normalize_margin(margin: &str) -> String {
    let margin = margin.trim().to_ascii_lowercase();
    let (number, unit) = ["px", "mm", "cm", "in"]
        .iter()
        .find_map(|u| margin.strip_suffix(u).map(|n| (n.trim().to_string(), *u)))
        .unwrap_or((margin.clone(), "px"));

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => format!("{}{}", value, unit),
        _ => "0px".to_string(),
    }
}

/// Download name: defaults to `document.pdf`, always ends in `.pdf`
pub fn normalize_filename(filename: Option<&str>) -> String {
    let cleaned: String = filename
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | '"'))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else if cleaned.to_ascii_lowercase().ends_with(".pdf") {
        cleaned.to_string()
    } else {
        format!("{}.pdf", cleaned)
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets aligned with the original
    haystack.to_ascii_lowercase().find(needle)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
