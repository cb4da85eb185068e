use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The live system evaluated the command batch and refused it.
    #[error("rejected by live system: {0}")]
    Rejected(String),
    #[error("transport i/o: {0}")]
    Io(String),
}

/// Boundary to the live object database. One call per command batch; the
/// transport owns transaction semantics and retries, this crate does neither.
pub trait Transport: Send {
    fn execute(&mut self, command: &str) -> Result<String, TransportError>;
}

/// Test/offline double: records every submitted command and serves canned
/// responses for read-before-write queries.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub submitted: Vec<String>,
    responses: HashMap<String, String>,
    fail_matching: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned response for an exact command string.
    pub fn respond(&mut self, command: impl Into<String>, response: impl Into<String>) {
        self.responses.insert(command.into(), response.into());
    }

    /// Any command containing `needle` fails with a rejection.
    pub fn fail_on(&mut self, needle: impl Into<String>) {
        self.fail_matching = Some(needle.into());
    }
}

impl Transport for RecordingTransport {
    fn execute(&mut self, command: &str) -> Result<String, TransportError> {
        if let Some(needle) = &self.fail_matching {
            if command.contains(needle.as_str()) {
                return Err(TransportError::Rejected(format!(
                    "canned failure for '{needle}'"
                )));
            }
        }
        self.submitted.push(command.to_string());
        Ok(self.responses.get(command).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_answers() {
        let mut t = RecordingTransport::new();
        t.respond("print menu \"Tree\"", "true");
        assert_eq!(t.execute("print menu \"Tree\"").unwrap(), "true");
        assert_eq!(t.execute("mod command \"C\";").unwrap(), "");
        assert_eq!(t.submitted.len(), 2);
    }

    #[test]
    fn injected_failure_matches_substring() {
        let mut t = RecordingTransport::new();
        t.fail_on("remove menu");
        assert!(t.execute("mod menu \"Tree\" remove menu \"M\"").is_err());
        assert!(t.submitted.is_empty());
        assert!(t.execute("print menu \"Tree\"").is_ok());
    }
}
