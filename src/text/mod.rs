//! Pure text helpers kept free of IO so services can compose them.

use std::sync::OnceLock;

use regex::Regex;

/// Matches inline markdown image references: `![alt](target)`.
fn image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[.*?\]\(.*?\)").expect("valid image regex"))
}

/// Remove markdown image references and trim surrounding whitespace.
///
/// Idempotent: text without image syntax passes through unchanged, so
/// running the cleanup twice is the same as running it once.
pub fn strip_markdown_images(text: &str) -> String {
    image_regex().replace_all(text, "").trim().to_string()
}
