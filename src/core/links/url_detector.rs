use std::sync::OnceLock;

use regex::Regex;

// Matches http(s) links and bare www. links. Trailing sentence punctuation
// is stripped afterwards so "check https://example.com!" logs cleanly.
fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).expect("url regex is valid")
    })
}

/// Returns every URL-like substring in `text`, in order of appearance.
pub fn find_urls(text: &str) -> Vec<String> {
    url_regex()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', '!', '?', ';', ')']).to_string())
        .filter(|url| !url.is_empty())
        .collect()
}
