use crate::config::Delimiter;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static API_KEY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(api_key=)[^&]*").expect("valid api_key pattern"));

/// Mask proxy credentials embedded in a request URL before it is logged
pub fn redact_url(url: &str) -> String {
    API_KEY_PARAM.replace_all(url, "${1}***").into_owned()
}

/// Convert a string to a sanitized filename component
pub fn sanitize_filename(name: &str) -> String {
    let mut name: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '&' | '=' | '#' | '%' | '*' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    // Limit filename length
    if name.chars().count() > 100 {
        name = name.chars().take(100).collect();
    }
    name
}

/// Default output path: `products_<label>_<count>.<ext>`
pub fn default_output_path(label: &str, count: usize, delimiter: Delimiter) -> PathBuf {
    PathBuf::from(format!(
        "products_{}_{}.{}",
        sanitize_filename(label),
        count,
        delimiter.extension()
    ))
}
