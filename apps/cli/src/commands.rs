//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use factcheck_core::pipeline::{CheckOutcome, CheckReport, ProgressReporter};
use factcheck_core::{EvidencePipeline, validate_claim};
use factcheck_shared::{
    AppConfig, ClaimKind, config_file_path, init_config, load_config, load_config_from,
    read_secret,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::server::{self, AppState, CheckResponse, percent};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// factcheck — verify claims against trusted Vietnamese news outlets.
#[derive(Parser)]
#[command(
    name = "factcheck",
    version,
    about = "Check a claim or article URL against trusted news sources and report a verdict.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.factcheck/factcheck.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Check a claim and print the verdict.
    Check {
        /// Claim text, or an article URL with `--type url`.
        content: String,

        /// How to interpret the content: text or url.
        #[arg(short = 't', long = "type", default_value = "text")]
        input_type: ClaimKind,

        /// Reference articles to compare against (1-10, defaults to config).
        #[arg(short, long, allow_negative_numbers = true)]
        num_sources: Option<i64>,

        /// Print the API response JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Serve the check over HTTP.
    Serve {
        /// Bind address (defaults to config).
        #[arg(long)]
        host: Option<String>,

        /// Port (defaults to config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the trusted outlets searched for evidence.
    Sources,

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
        0 => "factcheck=info,tower_http=info",
        1 => "factcheck=debug,tower_http=debug",
        _ => "factcheck=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
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
    match cli.command {
        Command::Check {
            content,
            input_type,
            num_sources,
            json,
        } => {
            let config = resolve_config(config_path)?;
            cmd_check(&config, &content, input_type, num_sources, json).await
        }
        Command::Serve { host, port } => {
            let config = resolve_config(config_path)?;
            cmd_serve(&config, host, port).await
        }
        Command::Sources => cmd_sources(&resolve_config(config_path)?),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_check(
    config: &AppConfig,
    content: &str,
    kind: ClaimKind,
    num_sources: Option<i64>,
    json: bool,
) -> Result<()> {
    let requested = num_sources.unwrap_or(config.defaults.num_sources as i64);
    let (claim, count) =
        validate_claim(content, kind, requested, config.defaults.max_num_sources)?;

    let pipeline = EvidencePipeline::from_config(config)?;
    info!(kind = %claim.kind, count, "checking claim");

    if json {
        let outcome = pipeline.run(&claim, count).await;
        println!("{}", serde_json::to_string_pretty(&CheckResponse::from(&outcome))?);
        return Ok(());
    }

    let reporter = CliProgress::new();
    let outcome = pipeline.run_with_progress(&claim, count, &reporter).await;
    match &outcome {
        CheckOutcome::Success(report) => print_report(report),
        CheckOutcome::Terminal { status, message } => {
            println!();
            println!("  No verdict ({status})");
            println!("  {message}");
            println!();
        }
    }
    Ok(())
}

fn print_report(report: &CheckReport) {
    let verdict = &report.verdict;
    println!();
    println!("  Verdict:     {} ({})", verdict.label, verdict.code);
    println!("  Similarity:  {:.2}%", percent(verdict.similarity));
    println!("  Confidence:  {:.2}%", percent(verdict.confidence));
    println!("  {}", verdict.explanation);
    println!();

    if !report.title.is_empty() {
        println!("  Article:     {}", report.title);
    }
    println!("  Keywords:    {}", report.keywords.join(", "));
    println!("  Sources:     {}/{} extracted", report.crawled, report.candidates);
    println!();

    println!("  Top references:");
    for (i, r) in report.references.iter().enumerate() {
        let flag = if r.refuted { "  [refutation]" } else { "" };
        println!(
            "  {}. [{}] {} ({:.2}%){flag}",
            i + 1,
            r.source,
            r.title,
            percent(r.similarity)
        );
        println!("     {}", r.url);
    }
    println!();
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_crawled(&self, url: &str, succeeded: bool, current: usize, total: usize) {
        if !succeeded {
            self.spinner.println(format!("  skipped {url}"));
        }
        self.spinner
            .set_message(format!("Extracting [{current}/{total}] {url}"));
    }

    fn done(&self, _outcome: &CheckOutcome, elapsed: Duration) {
        self.spinner.finish_and_clear();
        info!(elapsed_ms = elapsed.as_millis(), "done");
    }
}

async fn cmd_serve(config: &AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut server_config = config.server.clone();
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port {
        server_config.port = port;
    }

    let pipeline = Arc::new(EvidencePipeline::from_config(config)?);
    info!(
        host = %server_config.host,
        port = server_config.port,
        "starting fact-check server"
    );

    let state = AppState::new(pipeline, config.defaults.clone());
    server::serve(state, &server_config).await
}

fn cmd_sources(config: &AppConfig) -> Result<()> {
    let sources = &config.search.trusted_sources;
    println!();
    for source in sources {
        println!("  {:<12} {}", source.name, source.domain);
    }
    println!();
    println!("  {} trusted sources", sources.len());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let source = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    println!("# {}", source.display());
    println!("{}", toml::to_string_pretty(&config)?);

    for var in [
        &config.search.api_key_env,
        &config.search.engine_id_env,
        &config.embedding.api_key_env,
    ] {
        let state = if read_secret(var).is_some() { "set" } else { "not set" };
        println!("# {var}: {state}");
    }
    Ok(())
}
