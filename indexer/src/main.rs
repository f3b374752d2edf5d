use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};
use vsm::config::{IndexConfig, Instructions, READ, WRITE};
use vsm::events::{EventSink, TracingSink};
use vsm::persist::{load_inverted_list, save_meta, save_model, MetaFile};
use vsm::Indexer;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the TF-IDF vector model from an inverted list", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute term weights and document norms, then save the model
    Build {
        /// Instruction file with LEIA and ESCREVA entries
        #[arg(long)]
        config: Option<PathBuf>,
        /// Inverted-list file (overrides LEIA)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Model output path (overrides ESCREVA)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let start = Instant::now();
    let outcome = match cli.command {
        Commands::Build { config, input, output } => {
            tracing::info!("indexer pipeline started");
            resolve(config, input, output).and_then(|cfg| build_model(&cfg, &TracingSink))
        }
    };
    tracing::info!(elapsed_s = start.elapsed().as_secs_f64(), "indexer pipeline finished");
    if let Err(e) = outcome {
        tracing::error!("indexer pipeline failed: {e:#}");
        std::process::exit(1);
    }
}

fn resolve(config: Option<PathBuf>, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<IndexConfig> {
    let mut ins = Instructions::load_or_default(config.as_deref())?;
    ins.set(READ, input.map(|p| p.to_string_lossy().into_owned()))
        .set(WRITE, output.map(|p| p.to_string_lossy().into_owned()));
    Ok(IndexConfig::from_instructions(&ins)?)
}

/// Returns whether a model was written; an inverted list without documents
/// only produces a warning.
fn build_model(cfg: &IndexConfig, sink: &dyn EventSink) -> Result<bool> {
    tracing::info!(input = %cfg.input.display(), output = %cfg.output.display(), "building model");
    let list = load_inverted_list(&cfg.input)
        .with_context(|| format!("loading inverted list {}", cfg.input.display()))?;

    let model = Indexer::new(sink).build(&list);
    if model.is_empty() {
        tracing::warn!("model is empty, nothing saved");
        return Ok(false);
    }

    save_model(&cfg.output, &model).with_context(|| format!("saving model {}", cfg.output.display()))?;
    save_meta(&cfg.output, &MetaFile::describe(&model)?)?;
    tracing::info!(terms = model.num_terms(), documents = model.num_documents(), "model saved");
    Ok(true)
}
