use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use console_core::{
    export::{render as render_export, ExportKind},
    HttpPipelineClient, SessionOrchestrator, SessionSettings, WorkflowState,
};
use storage::{DirDraftStore, DraftStore, SqliteDraftStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;
mod shell;

use config::{clamp_max_scenarios, load_settings, normalize_database_url, Settings, DEFAULT_CONFIG_PATH};
use shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "testgen-console", about = "Operator console for the test-generation service")]
struct Cli {
    /// Settings file; missing files are ignored
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    api_base: Option<String>,
    /// Project name sent to the service as tenant id
    #[arg(long)]
    project: Option<String>,
    /// Directory of JSON drafts
    #[arg(long)]
    draft_dir: Option<PathBuf>,
    /// SQLite database for drafts; takes precedence over --draft-dir
    #[arg(long)]
    draft_db: Option<String>,
    #[arg(long)]
    max_scenarios: Option<u32>,
    #[arg(long)]
    developer: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session (default)
    Shell,
    /// List saved drafts
    Drafts,
    /// Render one export of a saved draft
    Export {
        draft: String,
        /// sources, settings, scenarios, jira or csv
        kind: String,
        /// Write here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let settings = apply_cli_overrides(load_settings(&cli.config), &cli);
    init_tracing(&settings.log_level);
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded environment file");
    }

    let drafts = open_draft_store(&settings).await?;
    let orchestrator =
        SessionOrchestrator::new(Arc::new(HttpPipelineClient::default()), drafts);
    let state = WorkflowState::new(SessionSettings {
        project_name: settings.project_name.clone(),
        api_base: settings.api_base.trim_end_matches('/').to_string(),
        developer_mode: settings.developer_mode,
    });

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            let mut shell = Shell::new(
                orchestrator,
                state,
                settings.max_scenarios,
                settings.export_dir.clone(),
            );
            shell.run().await?;
        }
        Command::Drafts => {
            let names = orchestrator.list_drafts().await?;
            print!("{}", render::draft_names(&names));
        }
        Command::Export { draft, kind, out } => {
            let kind: ExportKind = kind.parse()?;
            let loaded = orchestrator.load_draft(&state, &draft).await?;
            let body = render_export(&loaded.state, kind)?
                .ok_or_else(|| anyhow!("draft '{draft}' has no {kind} to export"))?;
            match out {
                Some(dir) => {
                    tokio::fs::create_dir_all(&dir).await?;
                    let path = shell::write_export(&dir, kind, &body).await?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{body}"),
            }
        }
    }

    Ok(())
}

fn apply_cli_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(v) = &cli.api_base {
        settings.api_base = v.clone();
    }
    if let Some(v) = &cli.project {
        settings.project_name = v.clone();
    }
    if let Some(v) = &cli.draft_dir {
        settings.draft_dir = v.clone();
    }
    if let Some(v) = &cli.draft_db {
        settings.draft_database_url = Some(normalize_database_url(v));
    }
    if let Some(v) = cli.max_scenarios {
        settings.max_scenarios = clamp_max_scenarios(v);
    }
    if cli.developer {
        settings.developer_mode = true;
    }
    settings
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_draft_store(settings: &Settings) -> Result<Arc<dyn DraftStore>> {
    if let Some(database_url) = &settings.draft_database_url {
        let store = SqliteDraftStore::new(database_url).await?;
        store.health_check().await?;
        info!(database_url = %database_url, "drafts stored in sqlite");
        return Ok(Arc::new(store));
    }

    let store = DirDraftStore::open(settings.draft_dir.clone()).await?;
    info!(dir = %store.root().display(), "drafts stored as json files");
    Ok(Arc::new(store))
}
