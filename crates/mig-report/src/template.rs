//! Positional `{word}` message templates

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\w*\}").expect("placeholder pattern is valid"));

/// Substitute placeholders with `params` in order of occurrence
///
/// Placeholders without a matching parameter render empty; text after the
/// last placeholder is kept verbatim; surplus parameters are ignored.
///
/// # Examples
/// ```
/// use mig_report::template::render;
///
/// let message = render("Element {name} of type {type} is deprecated", &["foo"]);
/// assert_eq!(message, "Element foo of type  is deprecated");
/// ```
#[must_use]
pub fn render<S: AsRef<str>>(template: &str, params: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for (i, found) in PLACEHOLDER.find_iter(template).enumerate() {
        out.push_str(&template[cursor..found.start()]);
        if let Some(param) = params.get(i) {
            out.push_str(param.as_ref());
        }
        cursor = found.end();
    }
    out.push_str(&template[cursor..]);
    out
}

/// Number of placeholders in a template
#[must_use]
pub fn placeholder_count(template: &str) -> usize {
    PLACEHOLDER.find_iter(template).count()
}
