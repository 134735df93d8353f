//! relay-search CLI - batch web search through rotating proxies.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use relay_search::{
    engines::{etools, google},
    output::{write_response, OutputFields},
    ManagerConfig, ProxyManager, ProxyMode, SearchResponse, DEFAULT_LISTING_URL,
};

/// relay-search - Batch web search through rotating proxies
#[derive(Parser)]
#[command(name = "relay-search")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every query of an input file, one query per line
    Search(SearchArgs),

    /// List available search engines
    Engines,
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineKind {
    Google,
    Etools,
}

impl EngineKind {
    fn result_limit(self) -> usize {
        match self {
            EngineKind::Google => google::GENERAL_RESULT_LIMIT,
            EngineKind::Etools => etools::GENERAL_RESULT_LIMIT,
        }
    }
}

#[derive(Parser)]
struct SearchArgs {
    /// Search engine
    engine: EngineKind,

    /// Input file with one query per line
    input: PathBuf,

    /// Output file for the semicolon-separated results
    output: PathBuf,

    /// Results per query (defaults to the engine maximum)
    #[arg(short, long)]
    count: Option<usize>,

    /// Write the query
    #[arg(long)]
    query: bool,

    /// Write the link
    #[arg(long)]
    link: bool,

    /// Write the title
    #[arg(long)]
    title: bool,

    /// Write the snippet
    #[arg(long)]
    snippet: bool,

    /// Proxy list file, one host:port per line
    #[arg(long, conflicts_with = "scrape")]
    proxy_file: Option<PathBuf>,

    /// Scrape proxies from a public listing
    #[arg(long)]
    scrape: bool,

    /// Listing URL used with --scrape; the page number is appended
    #[arg(long, requires = "scrape")]
    listing_url: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl SearchArgs {
    /// Selected fields; all of them when none is given.
    fn fields(&self) -> OutputFields {
        let fields = OutputFields {
            query: self.query,
            link: self.link,
            title: self.title,
            snippet: self.snippet,
        };
        if fields.is_empty() {
            OutputFields::all()
        } else {
            fields
        }
    }

    async fn manager_config(&self) -> Result<ManagerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                ManagerConfig::from_json(&json)?
            }
            None => ManagerConfig::default(),
        };

        if let Some(path) = &self.proxy_file {
            config.proxy = ProxyMode::File { path: path.clone() };
        } else if self.scrape {
            config.proxy = ProxyMode::Scrape {
                base_url: self
                    .listing_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LISTING_URL.to_string()),
            };
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Search(args) => run_search(args).await,
        Commands::Engines => list_engines(),
    }
}

fn list_engines() -> Result<()> {
    println!("Available search engines:\n");
    println!(
        "    google   - Google Search (up to {} results)",
        google::GENERAL_RESULT_LIMIT
    );
    println!(
        "    etools   - eTools.ch meta search (up to {} results)",
        etools::GENERAL_RESULT_LIMIT
    );
    println!();
    println!("Usage: relay-search search google queries.txt results.csv --link --title");
    Ok(())
}

async fn run_search(args: SearchArgs) -> Result<()> {
    let count = args.count.unwrap_or_else(|| args.engine.result_limit());
    let fields = args.fields();
    let config = args.manager_config().await?;

    let input = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read input {}", args.input.display()))?;
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create output {}", args.output.display()))?;
    let mut out = BufWriter::new(file);

    let mut manager = ProxyManager::new(config)?;
    let mut failed = 0usize;

    for query in input.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match search(&mut manager, args.engine, query, count).await {
            Ok(response) => {
                let written = write_response(&response, fields, &mut out)?;
                info!("Wrote {} results for '{}'", written, query);
            }
            Err(e) => {
                warn!("Search for '{}' failed: {}", query, e);
                failed += 1;
            }
        }
    }
    out.flush()?;

    if failed > 0 {
        anyhow::bail!("{} queries failed", failed);
    }
    Ok(())
}

async fn search(
    manager: &mut ProxyManager,
    engine: EngineKind,
    query: &str,
    count: usize,
) -> relay_search::Result<SearchResponse> {
    match engine {
        EngineKind::Google => manager.search_google(query, count).await,
        EngineKind::Etools => manager.search_etools(query, count).await,
    }
}
