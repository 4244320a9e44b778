//! Save/load/delete protocol tests against the in-memory backend.

use folio_db::{
    Backend, Error, Fault, MemoryBackend, NewMindMapEdge, NewMindMapNode, NodeData, NodeKind,
    PdfFile, Position, ProjectRepository, CreateProjectRequest, StaticIdentity, Workspace,
};
use folio_sync::SyncEngine;
use uuid::Uuid;

const MIB: usize = 1024 * 1024;

fn pdf(name: &str, size: usize) -> PdfFile {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(size, b'0');
    PdfFile::new(name, bytes)
}

struct Harness {
    mem: MemoryBackend,
    engine: SyncEngine,
    user: Uuid,
}

impl Harness {
    fn new() -> Self {
        let mem = MemoryBackend::new();
        let user = Uuid::new_v4();
        let engine = SyncEngine::new(mem.backend(StaticIdentity::user(user)));
        Self { mem, engine, user }
    }

    fn backend(&self) -> &Backend {
        self.engine.backend()
    }

    async fn project(&self, name: &str) -> Uuid {
        self.backend()
            .projects
            .insert(
                self.user,
                CreateProjectRequest {
                    name: name.to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
            .id
    }
}

/// A workspace with a PDF, three notes on page 2, two nodes and one edge.
fn thesis_workspace() -> Workspace {
    let mut ws = Workspace::default();
    ws.set_pdf_file(Some(pdf("thesis.pdf", 2 * MIB))).unwrap();
    ws.set_current_page(2).unwrap();
    ws.add_note("Research question");
    ws.add_note("Method");
    ws.add_note("Open issue");
    let a = ws.add_node(NewMindMapNode {
        kind: NodeKind::Input,
        position: Position::new(0.0, 0.0),
        data: NodeData::labeled("Thesis"),
    });
    let b = ws.add_node(NewMindMapNode {
        position: Position::new(200.0, 80.0),
        data: NodeData::labeled("Chapter 1"),
        ..Default::default()
    });
    ws.add_edge(NewMindMapEdge::between(a, b));
    ws
}

#[tokio::test]
async fn test_thesis_save_then_load_in_fresh_session() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();

    let saved = h.engine.save_to_project(&mut ws, project_id).await.unwrap();
    assert_eq!(saved.notes, 3);
    assert_eq!(saved.nodes, 2);
    assert_eq!(saved.edges, 1);
    assert!(!ws.is_loading());
    assert!(ws.error().is_none());

    let mut fresh = Workspace::default();
    let loaded = h.engine.load_from_project(&mut fresh, project_id).await.unwrap();
    assert_eq!(loaded.pdf_name.as_deref(), Some("thesis.pdf"));

    let pdf = fresh.pdf_file().unwrap();
    assert_eq!(pdf.name, "thesis.pdf");
    assert_eq!(pdf.content_type, "application/pdf");
    assert_eq!(pdf.bytes, ws.pdf_file().unwrap().bytes);

    let contents: Vec<_> = fresh.notes().iter().map(|n| n.content.as_str()).collect();
    assert_eq!(contents, vec!["Research question", "Method", "Open issue"]);
    assert!(fresh.notes().iter().all(|n| n.page_number == 2));

    assert_eq!(fresh.nodes(), ws.nodes());
    assert_eq!(fresh.edges(), ws.edges());
    assert_eq!(h.engine.project_aggregate_size(project_id).await.unwrap(), 2 * MIB as u64);
}

#[tokio::test]
async fn test_save_without_identity_fails_before_writing() {
    let mem = MemoryBackend::new();
    let engine = SyncEngine::new(mem.backend(StaticIdentity::anonymous()));
    let mut ws = thesis_workspace();

    let err = engine
        .save_to_project(&mut ws, Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "User not authenticated");
    assert_eq!(ws.error(), Some("User not authenticated"));
    assert!(!ws.is_loading());
    assert!(mem.calls().is_empty());
}

#[tokio::test]
async fn test_failed_note_insert_keeps_pdf_and_skips_mindmap() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.mem.fail_next(Fault::InsertNotes);

    let err = h.engine.save_to_project(&mut ws, project_id).await.unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(ws.error(), Some(err.to_string().as_str()));
    assert!(!ws.is_loading());

    let pdfs = h.mem.pdf_rows(project_id);
    assert_eq!(pdfs.len(), 1);
    assert!(h.mem.blob(&pdfs[0].storage_path).is_some());
    assert!(h.mem.note_rows(project_id).is_empty());
    assert!(h.mem.node_rows(project_id).is_empty());
    assert!(h.mem.edge_rows(project_id).is_empty());
    assert!(!h.mem.calls().contains(&"nodes.insert"));
}

#[tokio::test]
async fn test_failed_pdf_row_leaves_orphaned_blob() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.mem.fail_next(Fault::InsertPdf);

    h.engine.save_to_project(&mut ws, project_id).await.unwrap_err();

    assert!(h.mem.pdf_rows(project_id).is_empty());
    assert_eq!(h.mem.blob_paths().len(), 1);
    assert!(h.mem.note_rows(project_id).is_empty());
}

#[tokio::test]
async fn test_oversized_pdf_rejected_before_upload() {
    let mem = MemoryBackend::new();
    let user = Uuid::new_v4();
    let engine = SyncEngine::with_quota(
        mem.backend(StaticIdentity::user(user)),
        folio_db::QuotaPolicy {
            max_file_bytes: 1024,
            ..Default::default()
        },
    );
    let mut ws = Workspace::default();
    ws.set_pdf_file(Some(pdf("big.pdf", 4096))).unwrap();

    let err = engine
        .save_to_project(&mut ws, Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::FileTooLarge { size: 4096, limit: 1024 }));
    assert!(mem.blob_paths().is_empty());
    assert!(!mem.calls().contains(&"blobs.upload"));
}

#[tokio::test]
async fn test_resave_replaces_previous_snapshot() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();
    let first_key = h.mem.pdf_rows(project_id)[0].storage_path.clone();

    ws.add_note("Added later");
    ws.set_pdf_file(Some(pdf("thesis-v2.pdf", 1024))).unwrap();
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();

    let pdfs = h.mem.pdf_rows(project_id);
    assert_eq!(pdfs.len(), 1);
    assert_eq!(pdfs[0].name, "thesis-v2.pdf");
    assert!(h.mem.blob(&first_key).is_none());
    assert_eq!(h.mem.note_rows(project_id).len(), 4);
    assert_eq!(h.mem.node_rows(project_id).len(), 2);
}

fn note_contents(ws: &Workspace) -> Vec<&str> {
    ws.notes().iter().map(|n| n.content.as_str()).collect()
}

#[tokio::test]
async fn test_failed_upload_on_resave_keeps_previous_snapshot() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();
    let first_key = h.mem.pdf_rows(project_id)[0].storage_path.clone();

    ws.add_note("Never persisted");
    ws.set_pdf_file(Some(pdf("thesis-v2.pdf", 1024))).unwrap();
    h.mem.fail_next(Fault::Upload);
    h.engine.save_to_project(&mut ws, project_id).await.unwrap_err();

    let mut fresh = Workspace::default();
    h.engine.load_from_project(&mut fresh, project_id).await.unwrap();
    assert_eq!(fresh.pdf_file().unwrap().name, "thesis.pdf");
    assert_eq!(
        note_contents(&fresh),
        vec!["Research question", "Method", "Open issue"]
    );
    assert_eq!(fresh.nodes().len(), 2);
    assert_eq!(fresh.edges().len(), 1);
    assert!(h.mem.blob(&first_key).is_some());
}

#[tokio::test]
async fn test_failed_pdf_row_on_resave_keeps_previous_snapshot() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();

    ws.set_pdf_file(Some(pdf("thesis-v2.pdf", 1024))).unwrap();
    h.mem.fail_next(Fault::InsertPdf);
    h.engine.save_to_project(&mut ws, project_id).await.unwrap_err();

    let pdfs = h.mem.pdf_rows(project_id);
    assert_eq!(pdfs.len(), 1);
    assert_eq!(pdfs[0].name, "thesis.pdf");
    assert_eq!(h.mem.note_rows(project_id).len(), 3);
    assert_eq!(h.mem.blob_paths().len(), 2, "new blob is orphaned");
}

#[tokio::test]
async fn test_project_quota_counts_only_the_retained_pdfs() {
    let mem = MemoryBackend::new();
    let user = Uuid::new_v4();
    let engine = SyncEngine::with_quota(
        mem.backend(StaticIdentity::user(user)),
        folio_db::QuotaPolicy {
            max_file_bytes: 4 * MIB as u64,
            max_project_bytes: 3 * MIB as u64,
            ..Default::default()
        },
    );
    let project_id = engine
        .backend()
        .projects
        .insert(
            user,
            CreateProjectRequest {
                name: "Thesis".to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
        .id;
    let mut ws = thesis_workspace();
    engine.save_to_project(&mut ws, project_id).await.unwrap();

    // Replacing the 2 MiB PDF with 2.5 MiB fits; the old file does not count.
    ws.set_pdf_file(Some(pdf("thesis-v2.pdf", 5 * MIB / 2))).unwrap();
    engine.save_to_project(&mut ws, project_id).await.unwrap();
    assert_eq!(
        engine.project_aggregate_size(project_id).await.unwrap(),
        5 * MIB as u64 / 2
    );

    mem.clear_calls();
    ws.set_pdf_file(Some(pdf("thesis-v3.pdf", 7 * MIB / 2))).unwrap();
    let err = engine.save_to_project(&mut ws, project_id).await.unwrap_err();

    assert!(matches!(err, Error::QuotaExceeded(_)));
    assert!(!mem.calls().contains(&"blobs.upload"));
    let pdfs = mem.pdf_rows(project_id);
    assert_eq!(pdfs.len(), 1);
    assert_eq!(pdfs[0].name, "thesis-v2.pdf");
    assert_eq!(mem.note_rows(project_id).len(), 3);
}

#[tokio::test]
async fn test_note_page_beyond_storage_range_rejected_before_writing() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();
    h.mem.clear_calls();

    ws.set_current_page(3_000_000_000).unwrap();
    ws.add_note("Far away");
    let err = h.engine.save_to_project(&mut ws, project_id).await.unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(h.mem.calls().is_empty());
    assert_eq!(h.mem.note_rows(project_id).len(), 3);
}

#[tokio::test]
async fn test_save_to_unknown_project_writes_nothing() {
    let h = Harness::new();
    let ghost = Uuid::new_v4();
    let mut ws = thesis_workspace();

    let err = h.engine.save_to_project(&mut ws, ghost).await.unwrap_err();

    assert!(matches!(err, Error::ProjectNotFound(id) if id == ghost));
    assert!(h.mem.blob_paths().is_empty());
    assert!(h.mem.pdf_rows(ghost).is_empty());
    assert!(h.mem.note_rows(ghost).is_empty());
    assert!(h.mem.calls().is_empty());
}

#[tokio::test]
async fn test_other_identity_cannot_reach_project() {
    let alice = Harness::new();
    let project_id = alice.project("Private").await;
    let mut ws = thesis_workspace();
    alice.engine.save_to_project(&mut ws, project_id).await.unwrap();
    alice.mem.clear_calls();

    let bob = SyncEngine::new(alice.mem.backend(StaticIdentity::user(Uuid::new_v4())));

    let mut bobs_view = Workspace::default();
    bobs_view.add_note("bob's own note");
    let err = bob
        .load_from_project(&mut bobs_view, project_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound(_)));
    assert!(bobs_view.pdf_file().is_none());
    assert_eq!(note_contents(&bobs_view), vec!["bob's own note"]);

    let mut overwrite = Workspace::default();
    overwrite.add_note("vandalized");
    let err = bob
        .save_to_project(&mut overwrite, project_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound(_)));

    let err = bob.delete_project(project_id).await.unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound(_)));
    assert!(alice.mem.calls().is_empty(), "no row or blob was touched");

    let mut fresh = Workspace::default();
    alice
        .engine
        .load_from_project(&mut fresh, project_id)
        .await
        .unwrap();
    assert_eq!(fresh.pdf_file().unwrap().name, "thesis.pdf");
    assert_eq!(
        note_contents(&fresh),
        vec!["Research question", "Method", "Open issue"]
    );
    assert_eq!(alice.mem.project_ids(), vec![project_id]);
}

#[tokio::test]
async fn test_save_without_pdf_and_load_clears_pdf() {
    let h = Harness::new();
    let project_id = h.project("Notes only").await;
    let mut ws = Workspace::default();
    ws.add_note("no pdf here");
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();

    let mut other = thesis_workspace();
    h.engine.load_from_project(&mut other, project_id).await.unwrap();

    assert!(other.pdf_file().is_none());
    assert_eq!(other.notes().len(), 1);
    assert!(other.nodes().is_empty());
    assert!(other.edges().is_empty());
}

#[tokio::test]
async fn test_duplicate_edges_survive_round_trip() {
    let h = Harness::new();
    let project_id = h.project("Dupes").await;
    let mut ws = Workspace::default();
    ws.add_edge(NewMindMapEdge::between("a", "b"));
    ws.add_edge(NewMindMapEdge::between("a", "b"));
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();

    let mut fresh = Workspace::default();
    h.engine.load_from_project(&mut fresh, project_id).await.unwrap();
    assert_eq!(fresh.edges().len(), 2);
    assert!(fresh.edges().iter().all(|e| e.id == "a-b"));
}

#[tokio::test]
async fn test_load_failure_keeps_earlier_steps() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();
    h.mem.fail_next(Fault::ListNodes);

    let mut fresh = Workspace::default();
    fresh.add_edge(NewMindMapEdge::between("stale", "edge"));
    let err = h.engine.load_from_project(&mut fresh, project_id).await.unwrap_err();

    assert_eq!(fresh.error(), Some(err.to_string().as_str()));
    assert!(!fresh.is_loading());
    assert_eq!(fresh.pdf_file().unwrap().name, "thesis.pdf");
    assert_eq!(fresh.notes().len(), 3);
    assert!(fresh.nodes().is_empty());
    assert_eq!(fresh.edges().len(), 1, "edges step never ran");
}

#[tokio::test]
async fn test_delete_removes_rows_blobs_and_project_in_order() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();
    h.mem.clear_calls();

    h.engine.delete_project(project_id).await.unwrap();

    assert!(h.mem.project_ids().is_empty());
    assert!(h.mem.blob_paths().is_empty());
    assert!(h.mem.note_rows(project_id).is_empty());
    assert_eq!(
        h.mem.calls(),
        vec![
            "pdfs.list",
            "notes.delete",
            "edges.delete",
            "nodes.delete",
            "pdfs.delete",
            "blobs.remove",
            "projects.delete",
        ]
    );
}

#[tokio::test]
async fn test_delete_survives_blob_removal_failure() {
    let h = Harness::new();
    let project_id = h.project("Thesis").await;
    let mut ws = thesis_workspace();
    h.engine.save_to_project(&mut ws, project_id).await.unwrap();
    h.mem.fail_next(Fault::RemoveBlobs);

    h.engine.delete_project(project_id).await.unwrap();

    assert!(h.mem.project_ids().is_empty());
    assert_eq!(h.mem.blob_paths().len(), 1, "blob is orphaned");
}

#[tokio::test]
async fn test_delete_without_pdf_skips_blob_removal() {
    let h = Harness::new();
    let project_id = h.project("Empty").await;
    h.mem.clear_calls();

    h.engine.delete_project(project_id).await.unwrap();

    assert!(!h.mem.calls().contains(&"blobs.remove"));
    assert!(h
        .backend()
        .projects
        .get(h.user, project_id)
        .await
        .unwrap()
        .is_none());
}
