use anyhow::Result;
use clap::{Parser, Subcommand};
use ingest::{run_invert, run_queries};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};
use vsm::config::{Instructions, InvertConfig, QueryConfig, EXPECTED, QUERIES, READ, WRITE};

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Prepare inverted lists and query sets from XML collections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted-list file from XML document collections
    Invert {
        /// Instruction file with LEIA (repeatable) and ESCREVA entries
        #[arg(long)]
        config: Option<PathBuf>,
        /// Collection file or directory (repeatable, replaces every LEIA)
        #[arg(long)]
        input: Vec<PathBuf>,
        /// Inverted-list output (overrides ESCREVA)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Normalize an XML query file into query-set and expected-results files
    Queries {
        /// Instruction file with LEIA, CONSULTAS and ESPERADOS entries
        #[arg(long)]
        config: Option<PathBuf>,
        /// XML query file (overrides LEIA)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Query-set output (overrides CONSULTAS)
        #[arg(long)]
        queries: Option<PathBuf>,
        /// Expected-results output (overrides ESPERADOS)
        #[arg(long)]
        expected: Option<PathBuf>,
    },
}

fn lossy(p: PathBuf) -> String {
    p.to_string_lossy().into_owned()
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let start = Instant::now();
    let outcome = match cli.command {
        Commands::Invert { config, input, output } => invert(config, input, output),
        Commands::Queries { config, input, queries, expected } => queries_cmd(config, input, queries, expected),
    };
    tracing::info!(elapsed_s = start.elapsed().as_secs_f64(), "ingest pipeline finished");
    if let Err(e) = outcome {
        tracing::error!("ingest pipeline failed: {e:#}");
        std::process::exit(1);
    }
}

fn invert(config: Option<PathBuf>, inputs: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let mut ins = Instructions::load_or_default(config.as_deref())?;
    ins.set_all(READ, inputs.into_iter().map(lossy).collect()).set(WRITE, output.map(lossy));
    let cfg = InvertConfig::from_instructions(&ins)?;
    run_invert(&cfg)?;
    Ok(())
}

fn queries_cmd(
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    queries: Option<PathBuf>,
    expected: Option<PathBuf>,
) -> Result<()> {
    let mut ins = Instructions::load_or_default(config.as_deref())?;
    ins.set(READ, input.map(lossy)).set(QUERIES, queries.map(lossy)).set(EXPECTED, expected.map(lossy));
    let cfg = QueryConfig::from_instructions(&ins)?;
    run_queries(&cfg)?;
    Ok(())
}
