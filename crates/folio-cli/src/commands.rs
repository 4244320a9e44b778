//! Subcommand bodies. Each writes its human-readable result to `out`.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use uuid::Uuid;

use folio_core::defaults::EXPORT_FILE_NAME;
use folio_core::{format_file_size, PdfFile, ProjectPatch, WorkspaceExport};
use folio_sync::{App, SyncSummary};

/// Inputs for `folio save`.
#[derive(Debug, Clone, Default)]
pub struct SaveArgs {
    pub pdf: PathBuf,
    /// Project name for a new project; defaults to the PDF file stem.
    pub name: Option<String>,
    pub description: Option<String>,
    /// Export document whose notes and mind map go with the PDF.
    pub workspace: Option<PathBuf>,
    /// Overwrite this existing project instead of creating one.
    pub project: Option<Uuid>,
}

pub async fn list_projects(app: &mut App, out: &mut impl Write) -> Result<()> {
    app.directory_mut().fetch_projects().await?;
    let quota = *app.engine().quota();
    let projects = app.directory().projects();

    if projects.is_empty() {
        writeln!(out, "No projects yet.")?;
        return Ok(());
    }
    writeln!(
        out,
        "{} of {} projects used",
        projects.len(),
        quota.max_projects
    )?;
    for details in projects {
        let size = details.total_size.max(0) as u64;
        writeln!(
            out,
            "{}  {}  pdfs={} notes={} nodes={}  {} ({:.0}% of {})",
            details.id(),
            details.project.name,
            details.pdf_count,
            details.note_count,
            details.node_count,
            format_file_size(size),
            quota.usage_percent(size),
            format_file_size(quota.max_project_bytes),
        )?;
        if let Some(description) = &details.project.description {
            writeln!(out, "    {}", description)?;
        }
    }
    Ok(())
}

pub async fn create_project(
    app: &mut App,
    name: &str,
    description: Option<&str>,
    out: &mut impl Write,
) -> Result<Uuid> {
    let id = app.directory_mut().create_project(name, description).await?;
    writeln!(out, "Created project {}", id)?;
    Ok(id)
}

pub async fn update_project(
    app: &mut App,
    id: Uuid,
    patch: ProjectPatch,
    out: &mut impl Write,
) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to update; pass --name, --description or --clear-description");
    }
    app.directory_mut().update_project(id, patch).await?;
    writeln!(out, "Updated project {}", id)?;
    Ok(())
}

pub async fn delete_project(app: &mut App, id: Uuid, out: &mut impl Write) -> Result<()> {
    app.delete_project(id).await?;
    writeln!(out, "Deleted project {}", id)?;
    Ok(())
}

/// Load the PDF (and optional export document) into the workspace and
/// persist it. Returns the project id.
pub async fn save(app: &mut App, args: SaveArgs, out: &mut impl Write) -> Result<Uuid> {
    let bytes = tokio::fs::read(&args.pdf)
        .await
        .with_context(|| format!("Failed to read {}", args.pdf.display()))?;
    let file_name = args
        .pdf
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf")
        .to_string();
    let pdf = PdfFile::new(file_name, bytes);
    if !pdf.looks_like_pdf() {
        warn!(
            subsystem = "cli",
            op = "save",
            file = %args.pdf.display(),
            "File does not carry a PDF signature"
        );
    }
    let suggested_name = pdf.stem().to_string();
    app.workspace_mut().set_pdf_file(Some(pdf))?;

    if let Some(path) = &args.workspace {
        let export = read_export(path).await?;
        app.workspace_mut().import(export);
    }

    let (project_id, summary) = match args.project {
        Some(id) => {
            let summary = app.save_to_project(id).await?;
            (id, summary)
        }
        None => {
            let name = args.name.unwrap_or(suggested_name);
            let id = app
                .save_as_project(&name, args.description.as_deref())
                .await?;
            let summary = SyncSummary {
                pdf_name: app.workspace().pdf_file().map(|p| p.name.clone()),
                notes: app.workspace().notes().len(),
                nodes: app.workspace().nodes().len(),
                edges: app.workspace().edges().len(),
            };
            (id, summary)
        }
    };

    info!(subsystem = "cli", op = "save", project_id = %project_id, "Workspace saved");
    writeln!(out, "Saved project {}", project_id)?;
    write_summary(out, &summary)?;
    Ok(project_id)
}

/// Load a project and write its PDF and export document into `out_dir`.
/// Returns the paths written.
pub async fn open(
    app: &mut App,
    id: Uuid,
    out_dir: &Path,
    out: &mut impl Write,
) -> Result<Vec<PathBuf>> {
    let summary = app.open_project(id).await?;
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut written = Vec::new();
    if let Some(pdf) = app.workspace().pdf_file() {
        let name = Path::new(&pdf.name)
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_else(|| "document.pdf".into());
        let path = out_dir.join(name);
        tokio::fs::write(&path, &pdf.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    let export_path = out_dir.join(EXPORT_FILE_NAME);
    tokio::fs::write(&export_path, app.workspace().export().to_json()?)
        .await
        .with_context(|| format!("Failed to write {}", export_path.display()))?;
    written.push(export_path);

    writeln!(out, "Opened project {}", id)?;
    write_summary(out, &summary)?;
    for path in &written {
        writeln!(out, "  wrote {}", path.display())?;
    }
    Ok(written)
}

/// Validate an export document and report its counts.
pub async fn import_check(path: &Path, out: &mut impl Write) -> Result<WorkspaceExport> {
    let export = read_export(path).await?;
    let node_ids: HashSet<&str> = export.nodes.iter().map(|n| n.id.as_str()).collect();
    let dangling = export
        .edges
        .iter()
        .filter(|e| !node_ids.contains(e.source.as_str()) || !node_ids.contains(e.target.as_str()))
        .count();

    writeln!(
        out,
        "{}: {} notes, {} nodes, {} edges",
        path.display(),
        export.notes.len(),
        export.nodes.len(),
        export.edges.len()
    )?;
    if dangling > 0 {
        writeln!(out, "warning: {} edges reference missing nodes", dangling)?;
    }
    Ok(export)
}

async fn read_export(path: &Path) -> Result<WorkspaceExport> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    WorkspaceExport::from_slice(&bytes)
        .with_context(|| format!("{} is not a valid export document", path.display()))
}

fn write_summary(out: &mut impl Write, summary: &SyncSummary) -> Result<()> {
    writeln!(
        out,
        "  pdf: {}",
        summary.pdf_name.as_deref().unwrap_or("(none)")
    )?;
    writeln!(
        out,
        "  notes: {}  nodes: {}  edges: {}",
        summary.notes, summary.nodes, summary.edges
    )?;
    Ok(())
}
