//! TokenOptimizer CLI - Shrink text to a token budget

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use token_optimizer::{
    cache::{NoCache, OptimizationCache, ResultCache},
    config::Config,
    metrics::{BenchmarkResult, MetricsTracker},
    optimization::{
        detect_content_type, ContentType, OptimizationOptions, Preset, PromptOptimizer,
        TokenEstimator,
    },
};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "token-optimizer")]
#[command(about = "Reduce the token footprint of text sent to language models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (RUST_LOG takes precedence when set)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Config file (default: ~/.config/token-optimizer/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize text from a file or stdin
    #[command(visible_alias = "advanced")]
    Optimize {
        /// Input file (default: stdin)
        file: Option<PathBuf>,

        /// Starting filler-removal tier
        #[arg(long)]
        preset: Option<Preset>,

        /// Desired reduction in percent
        #[arg(long)]
        target_savings: Option<f64>,

        /// Token ceiling
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Skip content-type detection
        #[arg(long)]
        content_type: Option<ContentType>,

        /// Model used for token estimates
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        no_semantic: bool,

        #[arg(long)]
        no_whitespace: bool,

        #[arg(long)]
        no_duplicates: bool,

        #[arg(long)]
        no_summarization: bool,

        #[arg(long)]
        no_context: bool,

        /// Print a JSON summary line to stderr
        #[arg(long)]
        report: bool,

        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Estimate the token count of a file or stdin
    Estimate {
        file: Option<PathBuf>,

        #[arg(long)]
        model: Option<String>,

        /// Apply the diff-context heuristic
        #[arg(long)]
        diff: bool,
    },

    /// Classify the content type of a file or stdin
    Detect { file: Option<PathBuf> },

    /// Run every preset over a file and compare the savings
    Benchmark { file: PathBuf },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Initialize configuration file with defaults
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., optimization.preset, cache.ttl_secs)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Error, Debug)]
enum InputError {
    #[error("SizeExceeded: input is {size} bytes, limit is {limit} bytes")]
    SizeExceeded { size: u64, limit: usize },

    #[error("input is not valid UTF-8")]
    InvalidUtf8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Optimize {
            file,
            preset,
            target_savings,
            max_tokens,
            content_type,
            model,
            no_semantic,
            no_whitespace,
            no_duplicates,
            no_summarization,
            no_context,
            report,
            out,
        } => {
            let config = load_config(&config_path)?;
            let mut options = config.to_options();
            if let Some(preset) = preset {
                options.preset = preset;
            }
            if let Some(percent) = target_savings {
                options.target_savings_percent = Some(percent);
            }
            if let Some(tokens) = max_tokens {
                options.max_tokens = Some(tokens);
            }
            if let Some(model) = model {
                options.model = model;
            }
            options.content_type = content_type;
            options.toggles.semantic &= !no_semantic;
            options.toggles.whitespace &= !no_whitespace;
            options.toggles.duplicates &= !no_duplicates;
            options.toggles.summarization &= !no_summarization;
            options.toggles.context &= !no_context;

            run_optimize(&config, file.as_deref(), &options, report, out.as_deref()).await?;
        }
        Commands::Estimate { file, model, diff } => {
            let config = load_config(&config_path)?;
            let text = read_input(file.as_deref(), config.limits.max_input_bytes).await?;
            let model = model.unwrap_or_else(|| config.optimization.model.clone());
            let estimator = TokenEstimator::new(&model);
            let estimate = if diff {
                estimator.estimate_diff(&text)
            } else {
                estimator.estimate(&text)
            };
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
        Commands::Detect { file } => {
            let config = load_config(&config_path)?;
            let text = read_input(file.as_deref(), config.limits.max_input_bytes).await?;
            println!("{}", serde_json::to_string_pretty(&detect_content_type(&text))?);
        }
        Commands::Benchmark { file } => {
            run_benchmark(&load_config(&config_path)?, &file).await?;
        }
        Commands::Config(cmd) => {
            run_config_command(cmd, &config_path)?;
        }
    }

    Ok(())
}

async fn run_optimize(
    config: &Config,
    file: Option<&Path>,
    options: &OptimizationOptions,
    report: bool,
    out: Option<&Path>,
) -> Result<()> {
    let input = read_input(file, config.limits.max_input_bytes).await?;

    let cache: Arc<dyn ResultCache> = if config.cache.enabled {
        Arc::new(OptimizationCache::new(config.cache.to_cache_config()))
    } else {
        Arc::new(NoCache)
    };
    let optimizer = PromptOptimizer::new(cache);
    let result = optimizer.optimize(&input, options);

    info!(
        "Optimized {} -> {} tokens ({:.2}% saved)",
        result.original_tokens, result.optimized_tokens, result.savings_percent
    );

    match out {
        Some(path) => {
            tokio::fs::write(path, &result.output)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(result.output.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    if report {
        eprintln!("{}", serde_json::to_string(&result.report())?);
    }

    Ok(())
}

async fn run_benchmark(config: &Config, file: &Path) -> Result<()> {
    info!("Running benchmark on {}", file.display());

    let input = read_input(Some(file), config.limits.max_input_bytes).await?;
    let tracker = MetricsTracker::new();
    let optimizer = PromptOptimizer::uncached().with_metrics(tracker.clone());

    println!("=== Benchmark Results ===\n");
    println!(
        "{:<13} {:>9} {:>9} {:>8} {:>11}  {}",
        "Preset", "Original", "Optimized", "Saved", "Time", "Strategies"
    );
    println!("{}", "-".repeat(72));

    for preset in Preset::ALL {
        let options = config.to_options().with_preset(preset);
        let start = Instant::now();
        let result = optimizer.optimize(&input, &options);
        let row = BenchmarkResult::from_run(preset, &result, start.elapsed());
        println!("{}", row);
    }

    println!();
    print!("{}", tracker.summary());

    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_from(path.to_path_buf()).with_context(|| format!("loading {}", path.display()))
}

/// Config commands read the file themselves so that `init` works on a
/// broken file and `set` never persists environment overrides
fn run_config_command(cmd: ConfigCommands, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }
            Config::default().save_to(path.to_path_buf())?;
            println!("Configuration file created at: {}", path.display());
        }
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(&load_config(path)?)?);
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist - run 'config init' to create)");
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::read_from(path.to_path_buf())
                .with_context(|| format!("loading {}", path.display()))?;
            config.set(&key, &value)?;
            config.save_to(path.to_path_buf())?;
            println!("Set {} = {}", key, value);
        }
    }
    Ok(())
}

/// Read a file or stdin, refusing anything above `limit` bytes
async fn read_input(file: Option<&Path>, limit: usize) -> Result<String> {
    let bytes = match file {
        Some(path) => {
            let size = tokio::fs::metadata(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?
                .len();
            if size > limit as u64 {
                return Err(InputError::SizeExceeded { size, limit }.into());
            }
            tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buffer = Vec::new();
            tokio::io::stdin()
                .take(limit as u64 + 1)
                .read_to_end(&mut buffer)
                .await
                .context("reading stdin")?;
            if buffer.len() > limit {
                return Err(InputError::SizeExceeded {
                    size: buffer.len() as u64,
                    limit,
                }
                .into());
            }
            buffer
        }
    };

    String::from_utf8(bytes).map_err(|_| InputError::InvalidUtf8.into())
}
