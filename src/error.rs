//! Error types with fix suggestions

use std::path::PathBuf;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum ProbeError {
    // ─────────────────────────────────────────────────────────────
    // Workflow scanner errors (CIP-010 to CIP-011)
    // ─────────────────────────────────────────────────────────────
    #[error("CIP-010: Cannot read workflow file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CIP-011: YAML parse error in '{}': {source}", path.display())]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Converter errors (CIP-020 to CIP-022)
    // ─────────────────────────────────────────────────────────────
    #[error("CIP-020: Byte string is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    #[error("CIP-021: Byte string left in tree at '{path}' (convert before exporting)")]
    BytesRemain { path: String },

    #[error("CIP-022: JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl FixSuggestion for ProbeError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ProbeError::Io { .. } => Some("Check file path and permissions"),
            ProbeError::YamlParse { .. } => Some("Check YAML syntax: indentation and quoting"),
            ProbeError::Decode(_) => {
                Some("Binary content must be UTF-8; fix the producer of this value")
            }
            ProbeError::BytesRemain { .. } => {
                Some("Run to_serializable or convert_all on the tree first")
            }
            ProbeError::Json(_) => Some("Ensure every leaf decodes to text"),
        }
    }
}
