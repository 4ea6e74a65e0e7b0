//! CLI command definitions, routing, and tracing setup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use brandguard_api::{AppState, handlers::short_video_id};
use brandguard_core::{AuditWorkflow, Stage, WorkflowObserver};
use brandguard_indexer::AzureVideoIndexer;
use brandguard_knowledge::{
    AzureEmbeddings, AzureSearchRetriever, IngestOptions, IngestProgress, SearchIndex,
    ingest_folder,
};
use brandguard_llm::AzureChatClient;
use brandguard_shared::{AppConfig, AuditState, init_config, load_config, require_vars, resolve_secret};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Brand Guardian: audit video content against brand-compliance rules.
#[derive(Parser)]
#[command(
    name = "brandguard",
    version,
    about = "Audit videos against brand-compliance rules with retrieval-augmented AI.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Audit one video and print the compliance report.
    Audit {
        /// YouTube URL of the video to audit.
        url: String,
    },

    /// Serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Index regulatory documents into the rule knowledge base.
    Ingest {
        /// Folder of PDF, Markdown or text documents (defaults to `ingest.data_dir`).
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "brandguard=info",
        1 => "brandguard=debug",
        _ => "brandguard=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Audit { url } => cmd_audit(&url).await,
        Command::Serve { host, port } => cmd_serve(&host, port).await,
        Command::Ingest { data } => cmd_ingest(data).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Wire the Azure-backed collaborators into a workflow.
fn build_workflow(config: &AppConfig) -> Result<AuditWorkflow> {
    require_vars(&config.audit_settings())?;

    let openai_key = resolve_secret(&config.azure_openai.api_key_env)?;
    let search_key = resolve_secret(&config.search.api_key_env)?;
    let indexer_key = resolve_secret(&config.video_indexer.api_key_env)?;

    let video = AzureVideoIndexer::new(&config.video_indexer, indexer_key)?;
    let retriever = AzureSearchRetriever::new(
        AzureEmbeddings::new(&config.azure_openai, openai_key.clone())?,
        SearchIndex::new(&config.search, search_key)?,
    );
    let model = AzureChatClient::new(&config.azure_openai, openai_key)?;

    Ok(AuditWorkflow::from_collaborators(
        Arc::new(video),
        Arc::new(retriever),
        Arc::new(model),
        &config.pipeline,
    ))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_audit(url: &str) -> Result<()> {
    let config = load_config()?;
    let progress = Arc::new(CliProgress::new());
    let workflow = build_workflow(&config)?.with_observer(progress.clone());

    let session_id = uuid::Uuid::new_v4().to_string();
    let initial = AuditState::new(url, short_video_id(&session_id));
    info!(session_id = %session_id, "starting audit session");

    println!("\n--- 1. Input Payload: INITIALIZING WORKFLOW ---");
    println!("{}", serde_json::to_string_pretty(&initial)?);

    let state = workflow.run(initial).await;
    progress.finish();

    println!("\n--- 2. WORKFLOW EXECUTION COMPLETE ---");
    print!("{}", render_report(&state));

    Ok(())
}

/// Human-readable audit report.
fn render_report(state: &AuditState) -> String {
    let mut out = String::new();
    out.push_str("\n=== COMPLIANCE AUDIT REPORT ===\n");
    out.push_str(&format!("Video ID:    {}\n", state.video_id()));
    out.push_str(&format!("Status:      {}\n", state.final_status()));

    out.push_str("\n[ VIOLATIONS DETECTED ]\n");
    if state.compliance_results().is_empty() {
        out.push_str("No violations found.\n");
    } else {
        for issue in state.compliance_results() {
            out.push_str(&format!(
                "- [{}] {}: {}\n",
                issue.severity, issue.category, issue.description
            ));
        }
    }

    if !state.errors().is_empty() {
        out.push_str("\n[ ERRORS ]\n");
        for error in state.errors() {
            out.push_str(&format!("- {error}\n"));
        }
    }

    out.push_str("\n[ FINAL SUMMARY ]\n");
    out.push_str(state.final_report().unwrap_or("No report generated."));
    out.push('\n');
    out
}

async fn cmd_serve(host: &str, port: u16) -> Result<()> {
    let config = load_config()?;
    let workflow = build_workflow(&config)?;

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| eyre!("invalid listen address '{host}:{port}': {e}"))?;

    println!("Brand Guardian API on http://{addr}");
    brandguard_api::serve(addr, AppState::new(workflow)).await?;
    Ok(())
}

async fn cmd_ingest(data: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    require_vars(&config.ingest_settings())?;

    let openai_key = resolve_secret(&config.azure_openai.api_key_env)?;
    let search_key = resolve_secret(&config.search.api_key_env)?;
    let embeddings = AzureEmbeddings::new(&config.azure_openai, openai_key)?;
    let index = SearchIndex::new(&config.search, search_key)?;
    let opts = IngestOptions::from_config(&config.ingest)?;

    let dir = data.unwrap_or_else(|| PathBuf::from(&config.ingest.data_dir));
    info!(dir = %dir.display(), index = %config.search.index_name, "ingesting documents");

    let progress = CliProgress::new();
    let report = ingest_folder(&dir, &opts, &embeddings, &index, &progress).await?;
    progress.finish();

    println!();
    println!("  Ingestion complete!");
    println!("  Documents: {} found, {} loaded", report.documents_found, report.documents_loaded);
    println!("  Chunks:    {}", report.chunks_indexed);
    println!("  Index:     {}", config.search.index_name);
    for (source, reason) in &report.failed {
        println!("  Skipped:   {source} ({reason})");
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl WorkflowObserver for CliProgress {
    fn stage_started(&self, stage: Stage) {
        let message = match stage {
            Stage::Extraction => "Extracting transcript and on-screen text (this can take minutes)",
            Stage::Compliance => "Auditing content against retrieved rules",
        };
        self.spinner.set_message(message);
    }

    fn stage_finished(&self, stage: Stage, state: &AuditState) {
        self.spinner
            .println(format!("  {stage} finished ({} error(s))", state.errors().len()));
    }
}

impl IngestProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn task_progress(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("[{current}/{total}] {detail}"));
    }
}
