use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a record came from: `{archive}/{member}` plus the walk's import time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_filename: String,
    pub imported_timestamp: Option<String>,
    /// Position of the person node in a flat person document
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node_index: Option<usize>,
}

impl Provenance {
    pub fn new(source_filename: impl Into<String>, imported_timestamp: Option<String>) -> Self {
        Self {
            source_filename: source_filename.into(),
            imported_timestamp,
            node_index: None,
        }
    }

    pub fn with_node_index(&self, node_index: usize) -> Self {
        Self {
            node_index: Some(node_index),
            ..self.clone()
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_filename)
    }
}
