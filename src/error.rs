use thiserror::Error;

/// Main error type for Blocksmith operations
#[derive(Error, Debug)]
pub enum BlocksmithError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Structural problem in the host graph (dangling or duplicate identity)
    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Signature not parseable: {0}")]
    Parse(String),

    #[error("No documentation for routine {0}")]
    MissingDocumentation(String),

    #[error("Signature names {found} but routine is bound as {expected}")]
    SignatureNameMismatch { expected: String, found: String },

    #[error("Type reference {0} does not resolve to a known class")]
    UnresolvedTypeReference(String),

    #[error("Alias cycle detected while resolving {0}")]
    AliasCycle(String),

    #[error("Expected {expected} default value, found \"{value}\"")]
    InvalidDefaultValue { expected: String, value: String },
}

impl BlocksmithError {
    /// Whether a run must stop when this error shows up
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BlocksmithError::AliasCycle(_)
                | BlocksmithError::Graph(_)
                | BlocksmithError::Config(_)
                | BlocksmithError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BlocksmithError>;
