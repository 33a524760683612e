const VISIBLE_PREFIX: usize = 6;

/// Shortens a secret to a few leading characters so it can be logged.
pub(crate) fn redact(secret: &str) -> String {
    match secret.char_indices().nth(VISIBLE_PREFIX) {
        Some((end, _)) => format!("{}...", &secret[..end]),
        None => "***".to_owned(),
    }
}
