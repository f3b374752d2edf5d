use anyhow::Result;
use clap::{Parser, Subcommand};
use searcher::{build_app, run_batch};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use vsm::config::{Instructions, SearchConfig, MODEL, QUERIES, RESULTS};
use vsm::events::TracingSink;

#[derive(Parser)]
#[command(name = "searcher")]
#[command(about = "Rank queries against a TF-IDF vector model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every query of a query-set file and write the results
    Run {
        /// Instruction file with MODELO, CONSULTAS and RESULTADOS entries
        #[arg(long)]
        config: Option<PathBuf>,
        /// Model artifact (overrides MODELO)
        #[arg(long)]
        model: Option<PathBuf>,
        /// Query-set file (overrides CONSULTAS)
        #[arg(long)]
        queries: Option<PathBuf>,
        /// Ranked-result output (overrides RESULTADOS)
        #[arg(long)]
        results: Option<PathBuf>,
    },
    /// Serve ad-hoc queries over HTTP
    Serve {
        /// Model artifact path
        #[arg(long, default_value = "./model.bin")]
        model: PathBuf,
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to bind
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Run { config, model, queries, results } => run(config, model, queries, results),
        Commands::Serve { model, host, port } => serve(model, host, port),
    };
    if let Err(e) = outcome {
        tracing::error!("searcher failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(
    config: Option<PathBuf>,
    model: Option<PathBuf>,
    queries: Option<PathBuf>,
    results: Option<PathBuf>,
) -> Result<()> {
    let start = Instant::now();
    tracing::info!("search pipeline started");
    let outcome = (|| -> Result<()> {
        let mut ins = Instructions::load_or_default(config.as_deref())?;
        let lossy = |p: PathBuf| p.to_string_lossy().into_owned();
        ins.set(MODEL, model.map(lossy)).set(QUERIES, queries.map(lossy)).set(RESULTS, results.map(lossy));
        let cfg = SearchConfig::from_instructions(&ins)?;
        run_batch(&cfg, &TracingSink)?;
        Ok(())
    })();
    tracing::info!(elapsed_s = start.elapsed().as_secs_f64(), "search pipeline finished");
    outcome
}

#[tokio::main]
async fn serve(model: PathBuf, host: String, port: u16) -> Result<()> {
    let app = build_app(&model)?;
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
