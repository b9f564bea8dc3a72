//! Utility functions for the settlement core.

/// Validate email address format.
///
/// Basic RFC 5322 shape check: exactly one `@`, non-empty local and domain
/// parts, dotted domain, sane character set and length. For full
/// compliance consider the `email_address` crate.
///
/// # Examples
///
/// ```
/// use causeway_core::utils::is_valid_email;
///
/// assert!(is_valid_email("donor@example.org"));
/// assert!(is_valid_email("donor+gift@mail.example.org"));
/// assert!(!is_valid_email("not-an-email"));
/// assert!(!is_valid_email("@example.org"));
/// assert!(!is_valid_email("donor@"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    let valid_local_chars =
        |c: char| c.is_alphanumeric() || c == '.' || c == '-' || c == '+' || c == '_';
    let valid_domain_chars = |c: char| c.is_alphanumeric() || c == '.' || c == '-';

    if !local.chars().all(valid_local_chars) {
        return false;
    }

    if !domain.chars().all(valid_domain_chars) {
        return false;
    }

    // Domain labels between dots must be non-empty
    domain.split('.').all(|label| !label.is_empty())
}
