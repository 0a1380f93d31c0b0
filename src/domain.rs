//! Domain string helpers.

use once_cell::sync::Lazy;
use regex::Regex;

/// One or more dot-separated labels of `[a-z0-9_-]`, at least two labels.
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_-]+(\.[a-z0-9_-]+)+$").expect("domain pattern is valid")
});

/// Extract the domain part of an email address, or return the input as a domain.
///
/// The input is trimmed and lower-cased. For an email address everything after
/// the last `@` is returned. Returns an empty string when nothing usable remains.
///
/// # Examples
/// ```
/// use disposable::domain::extract_domain;
///
/// assert_eq!(extract_domain("User@TempMail.com"), "tempmail.com");
/// assert_eq!(extract_domain("tempmail.com"), "tempmail.com");
/// assert_eq!(extract_domain("user@"), "");
/// ```
pub fn extract_domain(email_or_domain: &str) -> String {
    let normalized = normalize_domain(email_or_domain);

    match normalized.rfind('@') {
        Some(idx) => normalized[idx + 1..].to_string(),
        None => normalized,
    }
}

/// Normalize a domain for storage and lookup: trim and lower-case.
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().to_lowercase()
}

/// Basic syntax check: lower-case labels of letters, digits, `-` or `_`,
/// separated by single dots, with at least one dot.
pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN_PATTERN.is_match(domain)
}
