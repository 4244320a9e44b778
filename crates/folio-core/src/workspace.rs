//! The in-memory editing session.
//!
//! A [`Workspace`] holds the active PDF, the page-scoped notes and the
//! mind-map graph. Mutations are local and synchronous; nothing is persisted
//! until the Sync Engine saves a [`WorkspaceSnapshot`]. Every state change is
//! published on the workspace's [`EventBus`].

use chrono::Utc;
use uuid::Uuid;

use crate::defaults::{FIRST_PAGE, MAX_FILE_SIZE_BYTES};
use crate::error::{Error, Result};
use crate::events::{EventBus, StoreEvent, StoreKind};
use crate::exchange::WorkspaceExport;
use crate::models::*;

/// Owned copy of the persisted parts of a workspace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkspaceSnapshot {
    pub pdf_file: Option<PdfFile>,
    pub notes: Vec<Note>,
    pub nodes: Vec<MindMapNode>,
    pub edges: Vec<MindMapEdge>,
}

/// Editable session state.
#[derive(Debug)]
pub struct Workspace {
    pdf_file: Option<PdfFile>,
    notes: Vec<Note>,
    nodes: Vec<MindMapNode>,
    edges: Vec<MindMapEdge>,
    current_page: u32,
    loading: bool,
    error: Option<String>,
    max_file_bytes: u64,
    events: EventBus,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

impl Workspace {
    /// Create an empty workspace publishing on `events`.
    pub fn new(events: EventBus) -> Self {
        Self {
            pdf_file: None,
            notes: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            current_page: FIRST_PAGE,
            loading: false,
            error: None,
            max_file_bytes: MAX_FILE_SIZE_BYTES,
            events,
        }
    }

    /// Override the single-file size limit enforced by [`set_pdf_file`](Self::set_pdf_file).
    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    // ─── Accessors ─────────────────────────────────────────────────────────

    pub fn pdf_file(&self) -> Option<&PdfFile> {
        self.pdf_file.as_ref()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Notes attached to `page`, in insertion order.
    pub fn notes_on_page(&self, page: u32) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(move |n| n.page_number == page)
    }

    pub fn nodes(&self) -> &[MindMapNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[MindMapEdge] {
        &self.edges
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ─── PDF and paging ────────────────────────────────────────────────────

    /// Replace the active PDF. Oversized files are rejected and the current
    /// PDF is left in place.
    pub fn set_pdf_file(&mut self, file: Option<PdfFile>) -> Result<()> {
        if let Some(f) = &file {
            if f.size() > self.max_file_bytes {
                return Err(Error::FileTooLarge {
                    size: f.size(),
                    limit: self.max_file_bytes,
                });
            }
        }
        let name = file.as_ref().map(|f| f.name.clone());
        self.pdf_file = file;
        self.events.emit(StoreEvent::PdfChanged { name });
        Ok(())
    }

    pub fn set_current_page(&mut self, page: u32) -> Result<()> {
        if page < FIRST_PAGE {
            return Err(Error::InvalidInput(format!(
                "Page number must be at least {}",
                FIRST_PAGE
            )));
        }
        self.current_page = page;
        self.events.emit(StoreEvent::PageChanged { page });
        Ok(())
    }

    // ─── Notes ─────────────────────────────────────────────────────────────

    /// Append a note on the current page and return its id.
    pub fn add_note(&mut self, content: impl Into<String>) -> Uuid {
        let note = Note {
            id: Uuid::new_v4(),
            content: content.into(),
            page_number: self.current_page,
            timestamp: Utc::now(),
            color: None,
            tags: None,
        };
        let id = note.id;
        self.notes.push(note);
        self.emit_notes();
        id
    }

    /// Replace a note's content. Unknown ids are ignored.
    pub fn update_note(&mut self, id: Uuid, content: impl Into<String>) {
        if let Some(note) = self.notes.iter_mut().find(|n| n.id == id) {
            note.content = content.into();
            self.emit_notes();
        }
    }

    /// Remove a note. Unknown ids are ignored.
    pub fn delete_note(&mut self, id: Uuid) {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() != before {
            self.emit_notes();
        }
    }

    /// Replace the whole note collection.
    pub fn replace_notes(&mut self, notes: Vec<Note>) {
        self.notes = notes;
        self.emit_notes();
    }

    // ─── Mind map ──────────────────────────────────────────────────────────

    /// Append a node and return its generated id.
    pub fn add_node(&mut self, node: NewMindMapNode) -> String {
        let id = Uuid::new_v4().to_string();
        self.nodes.push(MindMapNode {
            id: id.clone(),
            kind: node.kind,
            position: node.position,
            data: node.data,
        });
        self.emit_mindmap();
        id
    }

    /// Merge the supplied fields into a node. Unknown ids are ignored.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return;
        };
        if let Some(kind) = patch.kind {
            node.kind = kind;
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(data) = patch.data {
            node.data = data;
        }
        self.emit_mindmap();
    }

    /// Remove a node and every edge that starts or ends at it.
    pub fn delete_node(&mut self, id: &str) {
        let before = (self.nodes.len(), self.edges.len());
        self.nodes.retain(|n| n.id != id);
        self.edges.retain(|e| !e.touches(id));
        if (self.nodes.len(), self.edges.len()) != before {
            self.emit_mindmap();
        }
    }

    /// Append an edge with id `"{source}-{target}"` and return that id.
    ///
    /// Adding the same pair twice yields two edges sharing one id.
    pub fn add_edge(&mut self, edge: NewMindMapEdge) -> String {
        let id = MindMapEdge::edge_id(&edge.source, &edge.target);
        self.edges.push(MindMapEdge {
            id: id.clone(),
            source: edge.source,
            target: edge.target,
            kind: edge.kind,
            animated: edge.animated,
            style: edge.style,
        });
        self.emit_mindmap();
        id
    }

    /// Remove every edge carrying `id`.
    pub fn delete_edge(&mut self, id: &str) {
        let before = self.edges.len();
        self.edges.retain(|e| e.id != id);
        if self.edges.len() != before {
            self.emit_mindmap();
        }
    }

    pub fn replace_mindmap(&mut self, nodes: Vec<MindMapNode>, edges: Vec<MindMapEdge>) {
        self.nodes = nodes;
        self.edges = edges;
        self.emit_mindmap();
    }

    pub fn replace_nodes(&mut self, nodes: Vec<MindMapNode>) {
        self.nodes = nodes;
        self.emit_mindmap();
    }

    pub fn replace_edges(&mut self, edges: Vec<MindMapEdge>) {
        self.edges = edges;
        self.emit_mindmap();
    }

    // ─── Whole-session operations ──────────────────────────────────────────

    /// Clear the PDF, all collections, the loading flag and the error, and
    /// return to the first page.
    pub fn reset_workspace(&mut self) {
        self.pdf_file = None;
        self.notes.clear();
        self.nodes.clear();
        self.edges.clear();
        self.current_page = FIRST_PAGE;
        self.loading = false;
        self.error = None;
        self.events.emit(StoreEvent::WorkspaceReset);
    }

    pub fn export(&self) -> WorkspaceExport {
        WorkspaceExport {
            notes: self.notes.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Replace notes, nodes and edges wholesale. The PDF and page are kept.
    pub fn import(&mut self, export: WorkspaceExport) {
        self.replace_notes(export.notes);
        self.replace_mindmap(export.nodes, export.edges);
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            pdf_file: self.pdf_file.clone(),
            notes: self.notes.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    // ─── Status ────────────────────────────────────────────────────────────

    pub fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.events.emit(StoreEvent::LoadingChanged {
                store: StoreKind::Workspace,
                loading,
            });
        }
    }

    pub fn set_error(&mut self, error: Option<String>) {
        if self.error != error {
            self.error = error.clone();
            self.events.emit(StoreEvent::ErrorChanged {
                store: StoreKind::Workspace,
                error,
            });
        }
    }

    fn emit_notes(&self) {
        self.events.emit(StoreEvent::NotesChanged {
            count: self.notes.len(),
        });
    }

    fn emit_mindmap(&self) {
        self.events.emit(StoreEvent::MindMapChanged {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str, size: usize) -> PdfFile {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(size.max(bytes.len()), b' ');
        PdfFile::new(name, bytes)
    }

    fn node(ws: &mut Workspace, label: &str) -> String {
        ws.add_node(NewMindMapNode {
            data: NodeData::labeled(label),
            ..Default::default()
        })
    }

    #[test]
    fn test_new_workspace_is_empty_on_first_page() {
        let ws = Workspace::default();
        assert!(ws.pdf_file().is_none());
        assert!(ws.notes().is_empty());
        assert_eq!(ws.current_page(), 1);
        assert!(!ws.is_loading());
        assert!(ws.error().is_none());
    }

    #[test]
    fn test_add_note_stamps_current_page() {
        let mut ws = Workspace::default();
        ws.set_current_page(4).unwrap();
        let first = ws.add_note("first");
        let second = ws.add_note("second");

        assert_eq!(ws.notes().len(), 2);
        assert_eq!(ws.notes()[0].id, first);
        assert_eq!(ws.notes()[1].id, second);
        assert!(ws.notes().iter().all(|n| n.page_number == 4));
        assert_eq!(ws.notes_on_page(4).count(), 2);
        assert_eq!(ws.notes_on_page(1).count(), 0);
    }

    #[test]
    fn test_page_zero_rejected() {
        let mut ws = Workspace::default();
        let err = ws.set_current_page(0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(ws.current_page(), 1);
    }

    #[test]
    fn test_update_and_delete_note_ignore_unknown_ids() {
        let mut ws = Workspace::default();
        let id = ws.add_note("draft");
        ws.update_note(Uuid::new_v4(), "nope");
        ws.delete_note(Uuid::new_v4());
        assert_eq!(ws.notes().len(), 1);
        assert_eq!(ws.notes()[0].content, "draft");

        ws.update_note(id, "final");
        assert_eq!(ws.notes()[0].content, "final");
        ws.delete_note(id);
        assert!(ws.notes().is_empty());
    }

    #[test]
    fn test_oversized_pdf_rejected_and_previous_kept() {
        let mut ws = Workspace::default().with_max_file_bytes(100);
        ws.set_pdf_file(Some(pdf("small.pdf", 50))).unwrap();

        let err = ws.set_pdf_file(Some(pdf("big.pdf", 101))).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { size: 101, limit: 100 }));
        assert_eq!(ws.pdf_file().unwrap().name, "small.pdf");

        ws.set_pdf_file(None).unwrap();
        assert!(ws.pdf_file().is_none());
    }

    #[test]
    fn test_pdf_at_default_limit_admitted() {
        let mut ws = Workspace::default();
        ws.set_pdf_file(Some(pdf("max.pdf", MAX_FILE_SIZE_BYTES as usize)))
            .unwrap();
        let err = ws
            .set_pdf_file(Some(pdf("over.pdf", MAX_FILE_SIZE_BYTES as usize + 1)))
            .unwrap_err();
        assert_eq!(err.to_string(), "File size exceeds 10MB limit");
    }

    #[test]
    fn test_update_node_merges_supplied_fields() {
        let mut ws = Workspace::default();
        let id = node(&mut ws, "Topic");
        ws.update_node(
            &id,
            NodePatch {
                position: Some(Position::new(5.0, 6.0)),
                ..Default::default()
            },
        );
        let n = &ws.nodes()[0];
        assert_eq!(n.position, Position::new(5.0, 6.0));
        assert_eq!(n.data.label, "Topic");
        assert_eq!(n.kind, NodeKind::Default);
    }

    #[test]
    fn test_delete_node_cascades_to_touching_edges_only() {
        let mut ws = Workspace::default();
        let a = node(&mut ws, "A");
        let b = node(&mut ws, "B");
        let c = node(&mut ws, "C");
        ws.add_edge(NewMindMapEdge::between(&a, &b));
        ws.add_edge(NewMindMapEdge::between(&c, &a));
        ws.add_edge(NewMindMapEdge::between(&b, &c));

        ws.delete_node(&a);

        assert_eq!(ws.nodes().len(), 2);
        assert_eq!(ws.edges().len(), 1);
        assert_eq!(ws.edges()[0].id, format!("{}-{}", b, c));
    }

    #[test]
    fn test_duplicate_edges_share_id_and_delete_together() {
        let mut ws = Workspace::default();
        let first = ws.add_edge(NewMindMapEdge::between("a", "b"));
        let second = ws.add_edge(NewMindMapEdge::between("a", "b"));
        ws.add_edge(NewMindMapEdge::between("b", "a"));

        assert_eq!(first, "a-b");
        assert_eq!(first, second);
        assert_eq!(ws.edges().len(), 3);

        ws.delete_edge("a-b");
        assert_eq!(ws.edges().len(), 1);
        assert_eq!(ws.edges()[0].id, "b-a");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ws = Workspace::default();
        ws.set_pdf_file(Some(pdf("paper.pdf", 32))).unwrap();
        ws.set_current_page(9).unwrap();
        ws.add_note("n");
        let a = node(&mut ws, "A");
        ws.add_edge(NewMindMapEdge::between(&a, &a));
        ws.set_loading(true);
        ws.set_error(Some("boom".to_string()));

        ws.reset_workspace();

        assert!(ws.pdf_file().is_none());
        assert!(ws.notes().is_empty());
        assert!(ws.nodes().is_empty());
        assert!(ws.edges().is_empty());
        assert_eq!(ws.current_page(), 1);
        assert!(!ws.is_loading());
        assert!(ws.error().is_none());
    }

    #[test]
    fn test_export_import_round_trip_keeps_pdf() {
        let mut ws = Workspace::default();
        ws.set_pdf_file(Some(pdf("paper.pdf", 32))).unwrap();
        ws.add_note("one");
        let a = node(&mut ws, "A");
        let b = node(&mut ws, "B");
        ws.add_edge(NewMindMapEdge::between(&a, &b));
        let export = ws.export();

        let mut other = Workspace::default();
        other.add_note("stale");
        other.import(export.clone());

        assert_eq!(other.export(), export);
        assert!(other.pdf_file().is_none());

        ws.import(WorkspaceExport::default());
        assert!(ws.notes().is_empty());
        assert_eq!(ws.pdf_file().unwrap().name, "paper.pdf");
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut ws = Workspace::default();
        ws.add_note("before");
        let snap = ws.snapshot();
        ws.add_note("after");
        assert_eq!(snap.notes.len(), 1);
        assert_eq!(ws.notes().len(), 2);
    }

    #[tokio::test]
    async fn test_mutations_publish_events() {
        let mut ws = Workspace::default();
        let mut rx = ws.events().subscribe();

        ws.add_note("hello");
        ws.set_current_page(2).unwrap();
        ws.add_edge(NewMindMapEdge::between("x", "y"));
        ws.set_loading(true);
        ws.set_loading(true);
        ws.reset_workspace();

        let mut seen = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            seen.push(envelope.payload);
        }
        assert_eq!(
            seen,
            vec![
                StoreEvent::NotesChanged { count: 1 },
                StoreEvent::PageChanged { page: 2 },
                StoreEvent::MindMapChanged { nodes: 0, edges: 1 },
                StoreEvent::LoadingChanged {
                    store: StoreKind::Workspace,
                    loading: true
                },
                StoreEvent::WorkspaceReset,
            ]
        );
    }

    #[test]
    fn test_noop_mutations_stay_silent() {
        let mut ws = Workspace::default();
        let mut rx = ws.events().subscribe();
        ws.delete_note(Uuid::new_v4());
        ws.delete_node("missing");
        ws.delete_edge("missing");
        ws.update_node("missing", NodePatch::default());
        assert!(rx.try_recv().is_err());
    }
}
