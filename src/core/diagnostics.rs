use serde::Serialize;
use tracing::warn;

use crate::error::BlocksmithError;

/// A non-fatal problem tied to the member it was found on
#[derive(Debug)]
pub struct Diagnostic {
    /// Dotted name of the member, e.g. `wpilib.Drive.arcade`
    pub subject: String,
    pub error: BlocksmithError,
}

/// Warnings collected over a run; none of them stop it
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticSummary {
    pub subject: String,
    pub message: String,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subject: impl Into<String>, error: BlocksmithError) {
        let subject = subject.into();
        warn!("⚠️ {}: {}", subject, error);
        self.entries.push(Diagnostic { subject, error });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summaries(&self) -> Vec<DiagnosticSummary> {
        self.entries.iter()
            .map(|d| DiagnosticSummary {
                subject: d.subject.clone(),
                message: d.error.to_string(),
            })
            .collect()
    }
}
