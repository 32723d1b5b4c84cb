//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use pressmark_core::Formatter;
use pressmark_markdown::MatterMarkdownAdapter;
use pressmark_shared::{
    AppConfig, EnrichmentSettings, PressError, init_config, load_config, load_config_from,
};
use tracing::{info, warn};

use crate::resolver::CoverResolver;
use crate::source::{self, SourceDocument};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Pressmark — turn fetched documents into publish-ready markdown.
#[derive(Parser)]
#[command(
    name = "pressmark",
    version,
    about = "Normalize fetched documents and write them as frontmatter + markdown.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.pressmark/pressmark.toml).
    #[arg(long, global = true, env = "PRESSMARK_CONFIG")]
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
    /// Format one JSON document, or a directory of them, into markdown files.
    Format {
        /// Document file or directory of `*.json` documents.
        input: PathBuf,

        /// Output directory (defaults to `output.output_dir` from config).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip AI enrichment even when an API key is configured.
        #[arg(long)]
        no_enrich: bool,

        /// Fail a document whose cover image URL does not answer a HEAD request.
        #[arg(long)]
        verify_covers: bool,
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
        0 => "pressmark=info",
        1 => "pressmark=debug",
        _ => "pressmark=trace",
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
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Format {
            input,
            out,
            no_enrich,
            verify_covers,
        } => cmd_format(&config, &input, out.as_deref(), no_enrich, verify_covers).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_format(
    config: &AppConfig,
    input: &Path,
    out: Option<&Path>,
    no_enrich: bool,
    verify_covers: bool,
) -> Result<()> {
    let loaded = source::load_documents(input)?;
    if loaded.is_empty() {
        return Err(eyre!("no JSON documents found at '{}'", input.display()));
    }
    let documents = loaded.documents;

    // The credential is read exactly once, here.
    let settings = if no_enrich {
        None
    } else {
        EnrichmentSettings::from_env(config)
    };
    if settings.is_none() && !no_enrich {
        info!(
            var = %config.enrichment.api_key_env,
            "no enrichment API key set, skipping AI summary and tags"
        );
    }

    let serializer = MatterMarkdownAdapter::new(config.output.frontmatter_exclude.iter().cloned());
    let formatter = Formatter::from_settings(serializer, settings.as_ref())?;

    let resolver = if verify_covers {
        CoverResolver::verifying()?
    } else {
        CoverResolver::Passthrough
    };

    let out_dir = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.output.output_dir));
    std::fs::create_dir_all(&out_dir).map_err(|e| PressError::io(&out_dir, e))?;

    info!(
        documents = documents.len(),
        out = %out_dir.display(),
        enrich = formatter.enrichment_enabled(),
        "formatting documents"
    );

    let progress = CliProgress::new();
    let total = documents.len();
    let mut written = 0;
    let mut failed = loaded.failures.len();

    for (i, source) in documents.into_iter().enumerate() {
        progress.document(&source.doc.title, i + 1, total);

        match format_one(&formatter, &resolver, source, &out_dir, &config.output.filename_field).await
        {
            Ok(path) => {
                written += 1;
                info!(path = %path.display(), "document written");
            }
            Err((path, e)) => {
                failed += 1;
                warn!(source = %path.display(), error = %e, "document skipped");
            }
        }
    }

    progress.finish();

    println!();
    println!("  Formatting complete!");
    println!("  Written: {written}");
    println!("  Failed:  {failed}");
    println!("  Output:  {}", out_dir.display());
    println!();

    if written == 0 {
        return Err(eyre!("no documents could be formatted"));
    }

    Ok(())
}

/// Format and write one document. On failure, returns the source path with the error.
async fn format_one(
    formatter: &Formatter<MatterMarkdownAdapter>,
    resolver: &CoverResolver,
    source: SourceDocument,
    out_dir: &Path,
    filename_field: &str,
) -> std::result::Result<PathBuf, (PathBuf, PressError)> {
    let target = out_dir.join(format!("{}.md", source::output_stem(&source, filename_field)));
    let SourceDocument { path, doc } = source;

    let markdown = formatter
        .format(doc, resolver)
        .await
        .map_err(|e| (path.clone(), e))?;

    std::fs::write(&target, markdown).map_err(|e| (path, PressError::io(&target, e)))?;
    Ok(target)
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress spinner using indicatif.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn document(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Formatting [{current}/{total}] {title}"));
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
