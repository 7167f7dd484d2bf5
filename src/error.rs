//! Error taxonomy for ledger, store, and rendering operations.

use thiserror::Error;

/// An ingredient whose (name, lot) pair has no matching entry in the
/// incoming-goods registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFailure {
    pub name: String,
    pub lot: String,
}

#[derive(Error, Debug)]
pub enum RegistroError {
    /// Traceability check failed or a required field is missing. The write is
    /// blocked; nothing is appended.
    #[error("traceability check failed: {}", format_failures(.0))]
    Validation(Vec<TraceFailure>),

    /// A required field is empty or malformed.
    #[error("invalid input: {0}")]
    Incomplete(String),

    /// The remote-store session is absent or expired.
    #[error("not connected to the remote store: {0}")]
    NotConnected(String),

    /// Network or store failure during a read/write/list/download.
    #[error("remote store I/O failed: {0}")]
    RemoteIo(String),

    /// Image decode or drawing failure inside the signature compositor.
    /// Recovered locally with a text-marker fallback, never surfaced from the
    /// renderer itself.
    #[error("render failed: {0}")]
    Render(String),

    /// The ledger header does not describe a whole number of ingredient
    /// slots, or a row does not fit the declared capacity.
    #[error("ledger schema: {0}")]
    Schema(String),
}

fn format_failures(fails: &[TraceFailure]) -> String {
    let parts: Vec<String> = fails
        .iter()
        .map(|fail| {
            if fail.lot.is_empty() {
                format!("{} (no lot)", fail.name)
            } else {
                format!("{} (lot {})", fail.name, fail.lot)
            }
        })
        .collect();
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_each_failing_ingredient() {
        let err = RegistroError::Validation(vec![
            TraceFailure {
                name: "Pomodoro".to_string(),
                lot: "LTN-WRONG".to_string(),
            },
            TraceFailure {
                name: "Sale".to_string(),
                lot: String::new(),
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("Pomodoro (lot LTN-WRONG)"));
        assert!(message.contains("Sale (no lot)"));
    }
}
