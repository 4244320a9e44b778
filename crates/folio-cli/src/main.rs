//! folio: manage PDF note projects from the command line.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use folio_cli::commands::{self, SaveArgs};
use folio_cli::logging::{self, LogSettings};
use folio_cli::Config;
use folio_core::ProjectPatch;
use folio_db::{log_pool_metrics, Database, PoolConfig};
use folio_sync::App;

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about = "PDF notes and mind-map projects")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// List, create, rename or delete projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Save a PDF, optionally with an exported workspace, as a project
    Save {
        /// PDF file to upload
        #[arg(short, long)]
        pdf: PathBuf,

        /// Project name (default: the PDF file name without extension)
        #[arg(short, long)]
        name: Option<String>,

        /// Project description
        #[arg(short, long)]
        description: Option<String>,

        /// Export document with notes and mind map to save alongside the PDF
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Replace the contents of this existing project instead of creating one
        #[arg(long, conflicts_with_all = ["name", "description"])]
        project: Option<Uuid>,
    },

    /// Download a project's PDF and export document into a directory
    Open {
        /// Project id
        id: Uuid,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Validate an export document and print its counts
    ImportCheck {
        /// Export document (JSON)
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List projects with their sizes and counts
    List,

    /// Create an empty project
    Create {
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Rename a project or change its description
    Update {
        id: Uuid,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },

    /// Delete a project with its PDF, notes and mind map
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = LogSettings::from_env();
    let _file_guard = logging::init(&settings);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // import-check needs neither the database nor credentials
    if let Commands::ImportCheck { file } = &cli.command {
        commands::import_check(file, &mut std::io::stdout()).await?;
        return Ok(());
    }

    let config = Config::from_env()?;
    info!(
        subsystem = "cli",
        storage = ?config.storage,
        max_projects = config.quota.max_projects,
        "Configuration loaded"
    );

    let pool_config = PoolConfig::new().max_connections(2);
    let db = Database::connect_with_config(&config.database_url, pool_config)
        .await
        .context("Failed to connect to database")?;
    log_pool_metrics(db.pool());

    if let Commands::Migrate = cli.command {
        db.migrate().await.context("Migration failed")?;
        println!("Migrations applied");
        return Ok(());
    }

    let backend = db.backend_with(config.blob_store()?, config.identity_provider()?);
    let mut app = App::with_quota(backend, config.quota);
    let out = &mut std::io::stdout();

    match cli.command {
        Commands::Projects { command } => match command {
            ProjectCommands::List => commands::list_projects(&mut app, out).await?,
            ProjectCommands::Create { name, description } => {
                commands::create_project(&mut app, &name, description.as_deref(), out).await?;
            }
            ProjectCommands::Update {
                id,
                name,
                description,
                clear_description,
            } => {
                let description = if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                };
                commands::update_project(&mut app, id, ProjectPatch { name, description }, out)
                    .await?;
            }
            ProjectCommands::Delete { id } => commands::delete_project(&mut app, id, out).await?,
        },
        Commands::Save {
            pdf,
            name,
            description,
            workspace,
            project,
        } => {
            commands::save(
                &mut app,
                SaveArgs {
                    pdf,
                    name,
                    description,
                    workspace,
                    project,
                },
                out,
            )
            .await?;
        }
        Commands::Open { id, out: dir } => {
            commands::open(&mut app, id, &dir, out).await?;
        }
        Commands::Migrate | Commands::ImportCheck { .. } => {}
    }
    Ok(())
}
