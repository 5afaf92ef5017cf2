//! center-search CLI - multi-source aggregation engine command line interface.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use center_search::{
    EngineSettings, Record, SafeSearch, Search, SearchQuery, SourceCategory, TimeRange,
};

/// center-search - query many sources at once
#[derive(Parser)]
#[command(name = "center-search")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML); the built-in catalog is used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search across the sources of the given categories
    Search(SearchArgs),

    /// Collect everything the sources of the given categories publish
    Collect(CollectArgs),

    /// List configured sources per category
    Sources,
}

#[derive(Parser)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Categories to search (comma-separated)
    /// Available: general, images, videos, news, code, discussion, feeds, custom
    #[arg(short, long, value_delimiter = ',', default_value = "general")]
    categories: Vec<SourceCategory>,

    /// Restrict the search to these source ids (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    sources: Option<Vec<String>>,

    /// Page number, starting at 1
    #[arg(long, default_value = "1")]
    page: u32,

    /// Language tag (e.g. en, de-DE)
    #[arg(long)]
    language: Option<String>,

    /// Safe search level: off, moderate, strict
    #[arg(long, default_value = "off")]
    safesearch: SafeSearch,

    /// Time range: day, week, month, year
    #[arg(long)]
    time_range: Option<TimeRange>,

    /// Maximum number of results to display
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Parser)]
struct CollectArgs {
    /// Categories to collect from (comma-separated)
    #[arg(short, long, value_delimiter = ',', default_value = "feeds")]
    categories: Vec<SourceCategory>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.config {
        Some(path) => EngineSettings::load(path)?,
        None => EngineSettings::default(),
    };

    match cli.command {
        Commands::Search(args) => run_search(&settings, args).await,
        Commands::Collect(args) => run_collect(&settings, args).await,
        Commands::Sources => list_sources(&settings),
    }
}

fn list_sources(settings: &EngineSettings) -> Result<()> {
    println!("Configured sources:\n");
    for category in SourceCategory::ALL {
        let sources: Vec<_> = settings
            .sources
            .iter()
            .filter(|source| source.categories.contains(&category))
            .collect();
        if sources.is_empty() {
            continue;
        }

        println!("  {}:", category);
        for source in sources {
            let status = if source.enabled { "" } else { " (disabled)" };
            println!(
                "    {:<16} - {} [weight {:.1}]{}",
                source.id,
                source.display_name(),
                source.weight,
                status
            );
        }
        println!();
    }
    println!("Usage: center-search search \"query\" -c general,news");
    Ok(())
}

async fn run_search(settings: &EngineSettings, args: SearchArgs) -> Result<()> {
    let search = Search::from_settings(settings)?;

    let mut query = SearchQuery::new(&args.query)
        .with_categories(args.categories)
        .with_page(args.page)
        .with_safesearch(args.safesearch);
    if let Some(language) = args.language {
        query = query.with_language(language);
    }
    if let Some(range) = args.time_range {
        query = query.with_time_range(range);
    }
    if let Some(sources) = args.sources {
        query = query.with_sources(sources);
    }

    let results = search.search(query).await?;

    match args.format {
        OutputFormat::Text => {
            println!(
                "\nSearch results for \"{}\" ({} results in {}ms):\n",
                args.query, results.total, results.duration_ms
            );
            print_records(results.items().iter().take(args.limit));
            if let Some(errors) = results.errors() {
                println!("Failed sources:");
                for error in errors {
                    println!("  {}", error);
                }
            }
        }
        OutputFormat::Json => {
            let mut response = results.to_response();
            response.results.truncate(args.limit);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Compact => {
            for result in results.items().iter().take(args.limit) {
                println!("{}\t{}\t{}", result.source, result.title, result.url);
            }
        }
    }

    Ok(())
}

async fn run_collect(settings: &EngineSettings, args: CollectArgs) -> Result<()> {
    let search = Search::from_settings(settings)?;
    let collection = search.collect(args.categories).await;

    match args.format {
        OutputFormat::Text => {
            println!("\nCollected {} records:\n", collection.records.len());
            print_records(collection.records.iter());
            if let Some(errors) = collection.errors() {
                println!("Failed sources:");
                for error in errors {
                    println!("  {}", error);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&collection)?);
        }
        OutputFormat::Compact => {
            for record in &collection.records {
                println!("{}\t{}\t{}", record.source, record.title, record.url);
            }
        }
    }

    Ok(())
}

fn print_records<'a>(records: impl Iterator<Item = &'a Record>) {
    for (i, record) in records.enumerate() {
        println!("{}. {}", i + 1, record.title);
        println!("   URL: {}", record.url);
        if !record.content.is_empty() {
            println!("   {}", excerpt(&record.content, 150));
        }
        println!("   Source: {} | Score: {:.2}", record.source, record.score);
        println!();
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
