//! Log-safe rendering of connection failures.

use crate::server_registry::domain::truncate_message;

const REDACTED: &str = "[redacted]";

/// Replaces every occurrence of each secret in `message` and truncates the
/// result to the status message limit.
#[must_use]
pub fn redact_and_truncate(message: &str, secrets: &[&str]) -> String {
    let redacted = secrets
        .iter()
        .filter(|secret| !secret.is_empty())
        .fold(message.to_owned(), |text, secret| text.replace(secret, REDACTED));
    truncate_message(&redacted)
}
