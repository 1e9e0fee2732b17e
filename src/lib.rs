//! ciprobe - CI workflow probing and byte-safe serialization helpers
//!
//! - [`workflow`]: finds Veracode artifact upload steps in GitHub Actions workflows
//! - [`serializable`]: decodes byte strings in nested trees for text serializers

pub mod error;
pub mod serializable;
pub mod workflow;

pub use error::{FixSuggestion, ProbeError};
pub use serializable::{convert_all, serialize_all, to_json_string, to_serializable, Key, Value};
pub use workflow::{scan, ScanConfig, ScanReport, WorkflowScanner};
