//! Workflow scanner - detects Veracode artifact uploads in GitHub Actions
//!
//! Workflows live in `.github/workflows`. A workflow produces a Veracode
//! artifact when one of its steps hands the artifact to
//! `Workiva/gha-store-artifacts`:
//!
//! ```yaml
//! steps:
//!   - name: Upload Veracode Artifact
//!     uses: Workiva/gha-store-artifacts@v1.0.0
//!     with:
//!       VERACODE: /path/to/artifact
//! ```
//!
//! Detection is a key-presence test: the `VERACODE` key anywhere in the
//! document, whatever its value.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ProbeError;

/// Directory GitHub Actions reads workflow definitions from
pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// Key marking a Veracode artifact upload step
pub const SENTINEL_KEY: &str = "VERACODE";

/// Scanner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Repository root the workflows directory is resolved against
    pub root: PathBuf,
    /// Workflows directory, relative to `root`
    pub workflows_dir: PathBuf,
    /// Key whose presence marks a match
    pub sentinel: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            workflows_dir: PathBuf::from(WORKFLOWS_DIR),
            sentinel: SENTINEL_KEY.to_string(),
        }
    }
}

impl ScanConfig {
    /// Default layout under a given repository root
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn workflows_path(&self) -> PathBuf {
        self.root.join(&self.workflows_dir)
    }
}

/// Outcome of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub artifact_produced: bool,
    /// First workflow file containing the sentinel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_file: Option<PathBuf>,
    /// Files examined, up to and including the match
    #[serde(skip)]
    pub files_scanned: usize,
}

/// Scans a repository's workflow files for the sentinel key
#[derive(Debug, Clone, Default)]
pub struct WorkflowScanner {
    config: ScanConfig,
}

impl WorkflowScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Regular files directly inside the workflows directory, sorted by name.
    ///
    /// A missing directory is an empty set.
    pub fn workflow_files(&self) -> Vec<PathBuf> {
        let dir = self.config.workflows_path();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "No workflows directory");
            return Vec::new();
        }

        WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(dir = %dir.display(), "Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Whether one workflow file contains the sentinel.
    ///
    /// Files that cannot be read or parsed are logged and count as no match.
    pub fn has_artifact(&self, path: &Path) -> bool {
        match parse_workflow(path) {
            Ok(tree) => contains_key(&tree, &self.config.sentinel),
            Err(e @ ProbeError::YamlParse { .. }) => {
                warn!("Error parsing the YAML file: {}", e);
                false
            }
            Err(e) => {
                warn!("Error reading workflow file: {}", e);
                false
            }
        }
    }

    /// Scan workflow files in order, stopping at the first match
    pub fn scan(&self) -> ScanReport {
        let mut report = ScanReport::default();

        for path in self.workflow_files() {
            report.files_scanned += 1;
            debug!(file = %path.display(), "Scanning workflow");

            if self.has_artifact(&path) {
                info!(file = %path.display(), sentinel = %self.config.sentinel, "Artifact step found");
                report.artifact_produced = true;
                report.matched_file = Some(path);
                break;
            }
        }

        report
    }
}

/// Scan `.github/workflows` under the current directory
pub fn scan() -> ScanReport {
    WorkflowScanner::default().scan()
}

/// Read and parse one workflow file
pub fn parse_workflow(path: &Path) -> Result<Value, ProbeError> {
    let yaml = std::fs::read_to_string(path).map_err(|source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_workflow_str(&yaml).map_err(|source| ProbeError::YamlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse workflow text. An empty document parses to `Null`.
///
/// Only YAML core-schema tags (`!!str`, `!!map`, ...) are accepted; a node
/// with an application tag such as `!custom` fails the whole document.
pub fn parse_workflow_str(yaml: &str) -> Result<Value, serde_yaml::Error> {
    let tree: Value = serde_yaml::from_str(yaml)?;
    reject_custom_tags(&tree)?;
    Ok(tree)
}

fn is_core_tag(tag: &str) -> bool {
    tag.starts_with("!!") || tag.starts_with("tag:yaml.org,2002:")
}

fn reject_custom_tags(tree: &Value) -> Result<(), serde_yaml::Error> {
    match tree {
        Value::Mapping(map) => map.iter().try_for_each(|(k, v)| {
            reject_custom_tags(k)?;
            reject_custom_tags(v)
        }),
        Value::Sequence(items) => items.iter().try_for_each(reject_custom_tags),
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            if !is_core_tag(&tag) {
                return Err(serde::de::Error::custom(format!(
                    "could not determine a constructor for the tag '{}'",
                    tag
                )));
            }
            reject_custom_tags(&tagged.value)
        }
        _ => Ok(()),
    }
}

/// Whether `key` appears as a mapping key anywhere in `tree`
pub fn contains_key(tree: &Value, key: &str) -> bool {
    match tree {
        Value::Mapping(map) => {
            map.iter().any(|(k, _)| k.as_str() == Some(key))
                || map.iter().any(|(_, v)| contains_key(v, key))
        }
        Value::Sequence(items) => items.iter().any(|v| contains_key(v, key)),
        Value::Tagged(tagged) => contains_key(&tagged.value, key),
        _ => false,
    }
}
