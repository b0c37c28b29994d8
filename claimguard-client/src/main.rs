//! ClaimGuard CLI - Main entry point
//!
//! Stages evidence files from disk, submits them for fraud scoring and
//! prints the report. With `[storage]` configured it can also archive
//! files to object storage and delete archived objects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use claimguard_client::config::build_session;
use claimguard_client::{AnalysisResult, Category, ClaimSession, StagedFile, UploadedAsset};
use claimguard_common::config::{write_toml_config, ClientConfig, ConfigResolver, SERVICE_URL_ENV};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for claimguard
#[derive(Parser, Debug)]
#[command(name = "claimguard")]
#[command(about = "Insurance claim evidence fraud-scoring client")]
#[command(version)]
struct Cli {
    /// Config file path (overrides CLAIMGUARD_CONFIG and the platform default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Scoring service base URL
    #[arg(long, global = true, env = SERVICE_URL_ENV)]
    service_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit files for fraud analysis and print the report
    Analyze {
        #[command(flatten)]
        files: FileArgs,

        /// Print the normalized result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload files to object storage
    Archive {
        #[command(flatten)]
        files: FileArgs,

        /// Print the uploaded assets as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an archived object
    Delete {
        /// Object key, e.g. image/1700000000000-front.jpg
        key: String,

        /// Asset category (defaults to the key's first path segment)
        #[arg(long)]
        category: Option<Category>,
    },
    /// Write the effective configuration to the config file path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Files to stage, either auto-categorised or pinned to a category
#[derive(Args, Debug)]
struct FileArgs {
    /// Files whose category is detected from content and extension
    paths: Vec<PathBuf>,

    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    #[arg(long = "video", value_name = "PATH")]
    videos: Vec<PathBuf>,

    #[arg(long = "audio", value_name = "PATH")]
    audio: Vec<PathBuf>,

    /// PDF documents
    #[arg(long = "document", value_name = "PATH")]
    documents: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing before config so resolution warnings are visible;
    // the configured level replaces the default once config is loaded
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_filter_set = from_env.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(from_env.unwrap_or_else(|| log_filter(DEFAULT_LOG_LEVEL)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let resolver = ConfigResolver::new(cli.config.clone());
    let mut config = resolver.load().context("Failed to load configuration")?;
    if let Some(url) = &cli.service_url {
        config.service_url = url.clone();
        config.validate().context("Invalid --service-url")?;
    }

    if let Some(level) = configured_level(env_filter_set, &config.logging.level) {
        if let Err(e) = filter_handle.reload(log_filter(level)) {
            warn!(
                error = %e,
                level = %config.logging.level,
                "Could not apply configured log level"
            );
        }
    }

    match cli.command {
        Command::Analyze { files, json } => analyze(&config, files, json).await,
        Command::Archive { files, json } => archive(&config, files, json).await,
        Command::Delete { key, category } => delete(&config, key, category).await,
        Command::InitConfig { force } => init_config(&resolver, &config, force),
    }
}

async fn analyze(config: &ClientConfig, files: FileArgs, json: bool) -> Result<()> {
    let mut session = build_session(config).context("Failed to build client")?;
    stage(&mut session, files)?;

    let cancel = cancel_on_ctrl_c();
    let result = match session.submit_with_cancel(&cancel).await {
        Ok(result) => result,
        Err(e) if e.is_retryable() => {
            bail!("{} (the scoring service may be unavailable; retry later)", e)
        }
        Err(e) => bail!("Analysis failed: {}", e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }
    Ok(())
}

async fn archive(config: &ClientConfig, files: FileArgs, json: bool) -> Result<()> {
    let mut session = build_session(config).context("Failed to build client")?;
    stage(&mut session, files)?;

    let cancel = cancel_on_ctrl_c();
    let assets = session
        .archive(&cancel)
        .await
        .context("Archive failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assets)?);
    } else {
        for asset in &assets {
            println!("{:<9} {}  {}", asset.category, asset.key, asset.url);
        }
    }
    Ok(())
}

async fn delete(config: &ClientConfig, key: String, category: Option<Category>) -> Result<()> {
    let category = match category {
        Some(category) => category,
        None => key
            .split('/')
            .next()
            .and_then(|segment| segment.parse().ok())
            .with_context(|| format!("Cannot infer category from key '{}'; pass --category", key))?,
    };

    let mut session = build_session(config).context("Failed to build client")?;
    let asset = UploadedAsset {
        url: key.clone(),
        key,
        category,
    };
    session
        .delete_asset(&asset)
        .await
        .context("Delete failed")?;
    println!("Deleted {}", asset.key);
    Ok(())
}

fn init_config(resolver: &ConfigResolver, config: &ClientConfig, force: bool) -> Result<()> {
    let path = resolver
        .config_path()
        .context("Could not determine a config file path; pass --config")?;
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_toml_config(config, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Level to switch to after config load; `RUST_LOG` always wins
fn configured_level(env_filter_set: bool, level: &str) -> Option<&str> {
    let level = level.trim();
    (!env_filter_set && !level.is_empty() && level != DEFAULT_LOG_LEVEL).then_some(level)
}

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "claimguard={level},claimguard_client={level},claimguard_common={level}"
    ))
}

/// Read every file from disk and stage it by category
fn stage(session: &mut ClaimSession, files: FileArgs) -> Result<()> {
    let mut grouped: BTreeMap<Category, Vec<StagedFile>> = BTreeMap::new();

    let pinned = [
        (Category::Image, files.images),
        (Category::Video, files.videos),
        (Category::Audio, files.audio),
        (Category::Document, files.documents),
    ];
    let detected = files.paths.into_iter().map(|path| (None, path));
    let pinned = pinned
        .into_iter()
        .flat_map(|(category, paths)| paths.into_iter().map(move |path| (Some(category), path)));

    for (category, path) in detected.chain(pinned) {
        let file = read_file(&path, category)?;
        grouped.entry(file.category()).or_default().push(file);
    }

    if grouped.is_empty() {
        bail!("Please select at least one file to upload");
    }

    for (category, files) in grouped {
        session
            .add_files(category, files)
            .with_context(|| format!("Failed to stage {} files", category))?;
    }
    Ok(())
}

fn read_file(path: &Path, category: Option<Category>) -> Result<StagedFile> {
    StagedFile::from_path(path, category)
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Token cancelled on the first Ctrl+C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, cancelling");
                child.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });
    token
}

fn print_report(result: &AnalysisResult) {
    println!("Fraud probability: {:.1}%", result.probability);
    println!("Risk level:        {}", result.risk_level);
    println!("Gauge angle:       {:.1}°", result.gauge_angle());

    if !result.summary.is_empty() {
        println!("\nSummary\n  {}", result.summary);
    }

    print_section("Key findings", &result.key_findings);
    print_section("Red flags", &result.red_flags);
    print_section("Recommendations", &result.recommendations);

    if !result.has_findings() && !result.raw_model_output.is_empty() {
        println!("\nModel output\n{}", result.raw_model_output);
    }

    if result.claim_details.as_object().is_some_and(|d| !d.is_empty()) {
        match serde_json::to_string_pretty(&result.claim_details) {
            Ok(details) => println!("\nClaim details\n{}", details),
            Err(e) => warn!(error = %e, "Could not render claim details"),
        }
    }
}

fn print_section(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{}", title);
    for item in items {
        println!("  - {}", item);
    }
}
