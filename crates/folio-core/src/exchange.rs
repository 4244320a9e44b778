//! JSON export/import of a workspace's notes and mind map.
//!
//! The PDF itself is never part of the document.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{MindMapEdge, MindMapNode, Note};

/// Portable document holding the three workspace collections.
///
/// Keys absent from an imported document default to empty collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkspaceExport {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub nodes: Vec<MindMapNode>,
    #[serde(default)]
    pub edges: Vec<MindMapEdge>,
}

impl WorkspaceExport {
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_slice(input: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(input)?)
    }

    /// Pretty-printed JSON, two-space indented.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.nodes.is_empty() && self.edges.is_empty()
    }
}
