//! Core data models for folio.
//!
//! Two families of types live here: the client-side shapes held by the
//! [`Workspace`](crate::Workspace) (and written by export), and the row
//! shapes the durable store persists. The Sync Engine maps between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::PDF_CONTENT_TYPE;
use crate::error::{Error, Result};

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A page-scoped annotation in the active workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub page_number: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Persisted note row (`notes` table).
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub page_number: i32,
    pub color: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl NoteRow {
    /// Stamp a workspace note with its owning project and acting identity.
    ///
    /// The row gets a fresh identifier; note ids are not stable across a save.
    /// Page numbers beyond the column's `INTEGER` range are rejected.
    pub fn from_note(note: &Note, project_id: Uuid, user_id: Uuid) -> Result<Self> {
        let page_number = i32::try_from(note.page_number).map_err(|_| {
            Error::InvalidInput(format!("Page number {} is out of range", note.page_number))
        })?;
        Ok(Self {
            id: crate::new_v7(),
            project_id,
            user_id,
            content: note.content.clone(),
            page_number,
            color: note.color.clone(),
            tags: note.tags.clone(),
            created_at: note.timestamp,
        })
    }

    /// Map a persisted row back to the workspace shape.
    pub fn into_note(self) -> Note {
        Note {
            id: self.id,
            content: self.content,
            page_number: self.page_number.max(1) as u32,
            timestamp: self.created_at,
            color: self.color,
            tags: self.tags,
        }
    }
}

// =============================================================================
// MIND MAP TYPES
// =============================================================================

/// Variant of a mind-map node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Default,
    Input,
    Output,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "input" => Ok(Self::Input),
            "output" => Ok(Self::Output),
            _ => Err(format!("Invalid node type: {}", s)),
        }
    }
}

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Payload carried by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// References to notes associated with this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
}

impl NodeData {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }
}

/// A node in the mind-map graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    pub position: Position,
    pub data: NodeData,
}

/// A node before it has been given an identifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewMindMapNode {
    pub kind: NodeKind,
    pub position: Position,
    pub data: NodeData,
}

/// Partial update for a node. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub kind: Option<NodeKind>,
    pub position: Option<Position>,
    pub data: Option<NodeData>,
}

/// Persisted node row (`mindmap_nodes` table).
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub id: String,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub kind: NodeKind,
    pub position: Position,
    pub data: NodeData,
}

impl NodeRow {
    pub fn from_node(node: &MindMapNode, project_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: node.id.clone(),
            project_id,
            user_id,
            kind: node.kind,
            position: node.position,
            data: node.data.clone(),
        }
    }

    pub fn into_node(self) -> MindMapNode {
        MindMapNode {
            id: self.id,
            kind: self.kind,
            position: self.position,
            data: self.data,
        }
    }
}

/// Rendering style of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Default,
    Straight,
    Step,
    #[serde(rename = "smoothstep")]
    SmoothStep,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Straight => "straight",
            Self::Step => "step",
            Self::SmoothStep => "smoothstep",
        }
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "straight" => Ok(Self::Straight),
            "step" => Ok(Self::Step),
            "smoothstep" => Ok(Self::SmoothStep),
            _ => Err(format!("Invalid edge type: {}", s)),
        }
    }
}

/// Stroke styling for an edge. Rendering only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EdgeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
}

/// A directed edge in the mind-map graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EdgeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<EdgeStyle>,
}

impl MindMapEdge {
    /// Edge identifier for a source/target pair.
    pub fn edge_id(source: &str, target: &str) -> String {
        format!("{}-{}", source, target)
    }

    /// Whether this edge touches the given node as source or target.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// An edge before its identifier is derived.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewMindMapEdge {
    pub source: String,
    pub target: String,
    pub kind: Option<EdgeKind>,
    pub animated: Option<bool>,
    pub style: Option<EdgeStyle>,
}

impl NewMindMapEdge {
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }
}

/// Persisted edge row (`mindmap_edges` table).
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRow {
    pub id: String,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub source_id: String,
    pub target_id: String,
    pub kind: Option<EdgeKind>,
    pub animated: Option<bool>,
    pub style: Option<EdgeStyle>,
}

impl EdgeRow {
    pub fn from_edge(edge: &MindMapEdge, project_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: edge.id.clone(),
            project_id,
            user_id,
            source_id: edge.source.clone(),
            target_id: edge.target.clone(),
            kind: edge.kind,
            animated: edge.animated,
            style: edge.style.clone(),
        }
    }

    pub fn into_edge(self) -> MindMapEdge {
        MindMapEdge {
            id: self.id,
            source: self.source_id,
            target: self.target_id,
            kind: self.kind,
            animated: self.animated,
            style: self.style,
        }
    }
}

// =============================================================================
// PROJECT TYPES
// =============================================================================

/// A named, persisted container for one workspace snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project with counts derived at listing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub pdf_count: i64,
    pub note_count: i64,
    pub node_count: i64,
    /// Sum of the byte sizes of the project's PDFs.
    pub total_size: i64,
}

impl ProjectDetails {
    /// Details for a project that has no children yet.
    pub fn empty(project: Project) -> Self {
        Self {
            project,
            pdf_count: 0,
            note_count: 0,
            node_count: 0,
            total_size: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.project.id
    }
}

/// Request for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update for a project's metadata.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    /// Apply this patch to a local copy of a project.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
    }
}

// =============================================================================
// PDF TYPES
// =============================================================================

/// Metadata row for a PDF stored under a project (`saved_pdfs` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPdf {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Original filename at upload time.
    pub name: String,
    /// Blob storage key.
    pub storage_path: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

/// Request for recording an uploaded PDF.
#[derive(Debug, Clone)]
pub struct NewSavedPdf {
    pub project_id: Uuid,
    pub name: String,
    pub storage_path: String,
    pub file_size: i64,
}

/// A PDF held in memory by the workspace.
#[derive(Clone, PartialEq)]
pub struct PdfFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PdfFile {
    /// Build a PDF file, sniffing the content type from magic bytes.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| PDF_CONTENT_TYPE.to_string());
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }

    /// Build a PDF file reconstructed from storage, tagged as `application/pdf`.
    pub fn from_storage(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the bytes carry a PDF signature.
    pub fn looks_like_pdf(&self) -> bool {
        infer::is(&self.bytes, "pdf")
    }

    /// Filename without a trailing `.pdf`, used to suggest a project name.
    pub fn stem(&self) -> &str {
        self.name
            .strip_suffix(".pdf")
            .or_else(|| self.name.strip_suffix(".PDF"))
            .unwrap_or(&self.name)
    }
}

impl std::fmt::Debug for PdfFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// The authenticated user acting on the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_serializes_in_client_shape() {
        let note = Note {
            id: Uuid::nil(),
            content: "Key claim".to_string(),
            page_number: 4,
            timestamp: Utc::now(),
            color: None,
            tags: None,
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["pageNumber"], 4);
        assert!(json.get("timestamp").is_some());
        assert!(json.get("color").is_none());
    }

    #[test]
    fn note_row_rejects_page_beyond_integer_column() {
        let mut note = Note {
            id: Uuid::nil(),
            content: "Appendix".to_string(),
            page_number: i32::MAX as u32,
            timestamp: Utc::now(),
            color: None,
            tags: None,
        };
        let row = NoteRow::from_note(&note, Uuid::nil(), Uuid::nil()).unwrap();
        assert_eq!(row.page_number, i32::MAX);
        assert_eq!(row.into_note().page_number, i32::MAX as u32);

        note.page_number = i32::MAX as u32 + 1;
        let err = NoteRow::from_note(&note, Uuid::nil(), Uuid::nil()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("2147483648"));
    }

    #[test]
    fn node_kind_serializes_under_type() {
        let node = MindMapNode {
            id: "n1".to_string(),
            kind: NodeKind::Input,
            position: Position::new(10.0, 20.0),
            data: NodeData::labeled("Start"),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "input");
        assert_eq!(json["position"]["x"], 10.0);
        assert_eq!(json["data"]["label"], "Start");
    }

    #[test]
    fn node_kind_defaults_when_missing() {
        let node: MindMapNode = serde_json::from_str(
            r#"{"id":"1","position":{"x":0,"y":0},"data":{"label":"A"}}"#,
        )
        .unwrap();
        assert_eq!(node.kind, NodeKind::Default);
    }

    #[test]
    fn edge_kind_smoothstep_wire_name() {
        let kind: EdgeKind = serde_json::from_str(r#""smoothstep""#).unwrap();
        assert_eq!(kind, EdgeKind::SmoothStep);
        assert_eq!("smoothstep".parse::<EdgeKind>().unwrap(), EdgeKind::SmoothStep);
        assert!("curvy".parse::<EdgeKind>().is_err());
    }

    #[test]
    fn edge_row_renames_endpoints() {
        let edge = MindMapEdge {
            id: MindMapEdge::edge_id("a", "b"),
            source: "a".to_string(),
            target: "b".to_string(),
            kind: Some(EdgeKind::Step),
            animated: Some(true),
            style: Some(EdgeStyle {
                stroke: Some("#f00".to_string()),
            }),
        };
        let row = EdgeRow::from_edge(&edge, Uuid::nil(), Uuid::nil());
        assert_eq!(row.source_id, "a");
        assert_eq!(row.target_id, "b");
        assert_eq!(row.into_edge(), edge);
    }

    #[test]
    fn note_row_keeps_page_and_content() {
        let note = Note {
            id: Uuid::new_v4(),
            content: "Margin".to_string(),
            page_number: 7,
            timestamp: Utc::now(),
            color: Some("yellow".to_string()),
            tags: Some(vec!["todo".to_string()]),
        };
        let row = NoteRow::from_note(&note, Uuid::new_v4(), Uuid::new_v4()).unwrap();
        assert_ne!(row.id, note.id);
        let back = row.into_note();
        assert_eq!(back.page_number, 7);
        assert_eq!(back.content, "Margin");
        assert_eq!(back.color.as_deref(), Some("yellow"));
        assert_eq!(back.timestamp, note.timestamp);
    }

    #[test]
    fn project_patch_applies_only_supplied_fields() {
        let mut project = Project {
            id: Uuid::nil(),
            name: "Thesis".to_string(),
            description: Some("draft".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        ProjectPatch {
            name: None,
            description: Some(None),
        }
        .apply_to(&mut project);
        assert_eq!(project.name, "Thesis");
        assert!(project.description.is_none());
        assert!(ProjectPatch::default().is_empty());
    }

    #[test]
    fn pdf_file_sniffs_signature() {
        let pdf = PdfFile::new("paper.pdf", b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n".to_vec());
        assert!(pdf.looks_like_pdf());
        assert_eq!(pdf.content_type, "application/pdf");
        assert_eq!(pdf.stem(), "paper");

        let text = PdfFile::new("notes.txt", b"plain text".to_vec());
        assert!(!text.looks_like_pdf());
        assert_eq!(text.stem(), "notes.txt");
    }

    #[test]
    fn project_details_flatten_project_fields() {
        let details = ProjectDetails::empty(Project {
            id: Uuid::nil(),
            name: "Thesis".to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["name"], "Thesis");
        assert_eq!(json["note_count"], 0);
    }
}
