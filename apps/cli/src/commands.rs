//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use serpcluster_core::{
    Pipeline, ProgressReporter, RunPhase, RunReport, SUCCESS_MESSAGE, ScrapeResponse,
};
use serpcluster_search::DuckDuckGoProvider;
use serpcluster_shared::{
    AppConfig, PageContent, PipelineConfig, Query, init_config, load_config, load_config_from,
};
use serpcluster_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// serpcluster: cluster the keywords of a search query's result pages.
#[derive(Parser)]
#[command(
    name = "serpcluster",
    version,
    about = "Scrape search results for a query, extract keywords and group them into topic clusters.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.serpcluster/serpcluster.toml.
    #[arg(long, global = true, env = "SERPCLUSTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keyword database path (overrides [storage].database_path).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

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
    /// Run the pipeline once for a query and store the clusters.
    Run {
        /// Search query.
        query: String,

        /// Number of clusters (overrides [pipeline].cluster_count).
        #[arg(short = 'k', long)]
        clusters: Option<usize>,

        /// Print the result as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Serve the pipeline over HTTP (`POST /scrape`).
    Serve {
        /// Listen address (overrides [server].bind).
        #[arg(long)]
        bind: Option<String>,

        /// Number of clusters (overrides [pipeline].cluster_count).
        #[arg(short = 'k', long)]
        clusters: Option<usize>,
    },

    /// Print the stored keyword table grouped by cluster.
    Show,

    /// List recent runs.
    Runs {
        /// Maximum number of runs to list.
        #[arg(long, default_value = "20")]
        limit: usize,
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
        0 => "serpcluster=info",
        1 => "serpcluster=debug",
        _ => "serpcluster=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let db = cli.db.as_deref();

    match cli.command {
        Command::Run {
            query,
            clusters,
            json,
        } => cmd_run(config_path, db, &query, clusters, json).await,
        Command::Serve { bind, clusters } => {
            cmd_serve(config_path, db, bind.as_deref(), clusters).await
        }
        Command::Show => cmd_show(config_path, db).await,
        Command::Runs { limit } => cmd_runs(config_path, db, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn database_path(config: &AppConfig, db: Option<&Path>) -> PathBuf {
    db.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.storage.database_path))
}

/// Wire the DuckDuckGo provider and the libSQL store into a pipeline.
async fn build_pipeline(
    config: &AppConfig,
    db: Option<&Path>,
    clusters: Option<usize>,
) -> Result<Pipeline> {
    let pipeline_config = PipelineConfig::from_app(config, clusters)?;
    let provider = DuckDuckGoProvider::new(config.search.clone())?;

    let db_path = database_path(config, db);
    let storage = Storage::open(&db_path)
        .await
        .wrap_err_with(|| format!("failed to open database {}", db_path.display()))?;

    info!(
        db = %db_path.display(),
        clusters = pipeline_config.cluster_count,
        max_results = pipeline_config.max_results,
        "pipeline ready"
    );

    Ok(Pipeline::new(
        pipeline_config,
        Arc::new(provider),
        Arc::new(storage),
    )?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    db: Option<&Path>,
    query: &str,
    clusters: Option<usize>,
    json: bool,
) -> Result<()> {
    let query = Query::new(query)?;
    let config = load_app_config(config_path)?;
    let pipeline = build_pipeline(&config, db, clusters).await?;

    let reporter = CliProgress::new();
    let report = match pipeline.run(&query, &reporter).await {
        Ok(report) => report,
        Err(e) => {
            reporter.abandon();
            return Err(e).wrap_err_with(|| format!("run failed for query '{query}'"));
        }
    };

    if json {
        let response = ScrapeResponse {
            message: SUCCESS_MESSAGE.to_string(),
            clusters: report.clusters,
            skipped_pages: report.skipped,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("  {SUCCESS_MESSAGE}");
    println!("  Run:      {}", report.run_id);
    println!("  Query:    {}", report.query);
    println!(
        "  Pages:    {} used, {} skipped",
        report.pages_used,
        report.skipped.len()
    );
    println!("  Keywords: {}", report.keyword_count);
    println!("  Stored:   {} rows", report.rows_stored);
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();

    for (index, keywords) in report.clusters.iter() {
        println!("  Cluster {index} ({}):", keywords.len());
        if !keywords.is_empty() {
            println!("    {}", keywords.join(", "));
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!("  Skipped pages:");
        for page in &report.skipped {
            println!("    {}  ({})", page.url, page.reason);
        }
    }
    println!();
}

async fn cmd_serve(
    config_path: Option<&Path>,
    db: Option<&Path>,
    bind: Option<&str>,
    clusters: Option<usize>,
) -> Result<()> {
    let config = load_app_config(config_path)?;
    let pipeline = build_pipeline(&config, db, clusters).await?;
    let bind = bind.unwrap_or(&config.server.bind);

    crate::server::serve(Arc::new(pipeline), bind).await
}

async fn cmd_show(config_path: Option<&Path>, db: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    let db_path = database_path(&config, db);
    let storage = Storage::open_readonly(&db_path).await?;

    let clusters = storage.list_clusters().await?;
    if clusters.is_empty() {
        println!("No keywords stored yet.");
        return Ok(());
    }

    let total: usize = clusters.values().map(Vec::len).sum();
    println!();
    println!("  {total} keyword rows in {}", db_path.display());
    println!();
    for (index, keywords) in &clusters {
        println!("  Cluster {index} ({}):", keywords.len());
        println!("    {}", keywords.join(", "));
    }
    println!();
    Ok(())
}

async fn cmd_runs(config_path: Option<&Path>, db: Option<&Path>, limit: usize) -> Result<()> {
    let config = load_app_config(config_path)?;
    let db_path = database_path(&config, db);
    let storage = Storage::open_readonly(&db_path).await?;

    let runs = storage.list_runs(limit).await?;
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    println!();
    for run in &runs {
        println!(
            "  {}  {}  pages {}/{}  keywords {}  clusters {}  \"{}\"",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.id,
            run.pages_used,
            run.pages_used + run.pages_skipped,
            run.keyword_count,
            run.cluster_count,
            run.query,
        );
    }
    println!();
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, phase: RunPhase) {
        self.spinner.set_message(phase.to_string());
    }

    fn page_loaded(&self, page: &PageContent, current: usize, total: usize) {
        let mark = if page.is_valid() { "ok" } else { "skip" };
        self.spinner
            .set_message(format!("Loading [{current}/{total}] {mark} {}", page.url));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
