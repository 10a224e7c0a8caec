use anyhow::Context;
use clap::{Parser, Subcommand};
use newsflow::{Config, ConfigOverrides, Connection, NewsService};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Multi-source news aggregation with cached enrichment and ranking
#[derive(Debug, Parser)]
#[command(name = "newsflow", version, about)]
struct Cli {
    /// Configuration file (defaults to <config dir>/newsflow/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Return provider results without enrichment
    #[arg(long, global = true)]
    no_enrich: bool,

    /// NewsAPI key, overriding configuration
    #[arg(long, global = true)]
    newsapi_key: Option<String>,

    /// Guardian Open Platform key, overriding configuration
    #[arg(long, global = true)]
    guardian_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Articles in one category
    Category {
        category: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 10)]
        first: usize,
        /// Cursor of the last article already seen
        #[arg(long)]
        after: Option<String>,
    },
    /// Keyword search
    Search {
        keyword: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 10)]
        first: usize,
        #[arg(long)]
        after: Option<String>,
    },
    /// Current top headlines
    Headlines {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 10)]
        first: usize,
    },
    /// Best stories across several categories
    TopStories {
        #[arg(required = true, value_delimiter = ',')]
        categories: Vec<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 10)]
        first: usize,
    },
    /// Probe every configured provider
    CheckProviders,
    /// Print the JSON Schema of the result envelope
    Schema,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("newsflow={},warn", config.logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn print_connection(connection: &Connection) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(connection).context("failed to render results")?
    );
    for error in connection.errors() {
        warn!("{} failed ({}): {}", error.source, error.code, error.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        log_level: cli.log_level.clone(),
        json_logs: cli.json_logs,
        enrich_results: cli.no_enrich.then_some(false),
        newsapi_key: cli.newsapi_key.clone(),
        guardian_key: cli.guardian_key.clone(),
    };
    let config = Config::load(cli.config.as_deref())
        .and_then(|config| config.apply_overrides(&overrides))
        .context("failed to load configuration")?;

    init_tracing(&config);

    if matches!(cli.command, Command::Schema) {
        println!(
            "{}",
            serde_json::to_string_pretty(&Connection::json_schema())
                .context("failed to render schema")?
        );
        return Ok(());
    }

    info!("Starting newsflow {}", env!("CARGO_PKG_VERSION"));

    let service = NewsService::from_config(&config).context("failed to build news service")?;

    match cli.command {
        Command::Category {
            category,
            location,
            first,
            after,
        } => {
            let connection = service
                .fetch_by_category(&category, location.as_deref(), first, after.as_deref())
                .await?;
            print_connection(&connection)?;
        }
        Command::Search {
            keyword,
            category,
            location,
            first,
            after,
        } => {
            let connection = service
                .search_articles(
                    &keyword,
                    category.as_deref(),
                    location.as_deref(),
                    first,
                    after.as_deref(),
                )
                .await?;
            print_connection(&connection)?;
        }
        Command::Headlines {
            category,
            location,
            first,
        } => {
            let connection = service
                .fetch_top_headlines(category.as_deref(), location.as_deref(), first)
                .await?;
            print_connection(&connection)?;
        }
        Command::TopStories {
            categories,
            location,
            first,
        } => {
            let connection = service
                .fetch_top_stories_across_categories(&categories, location.as_deref(), first)
                .await?;
            print_connection(&connection)?;
        }
        Command::CheckProviders => {
            let availability = service.aggregator().refresh_availability().await;
            let mut names: Vec<_> = availability.iter().collect();
            names.sort();
            for (name, available) in names {
                println!("{name}: {}", if *available { "available" } else { "unavailable" });
            }
        }
        Command::Schema => {}
    }

    let stats = service.cache().cache_stats().await;
    info!(
        "Cache: {} hits, {} misses, {} sets",
        stats.hits, stats.misses, stats.sets
    );
    Ok(())
}
