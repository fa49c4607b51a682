//! archivist CLI entry point

use archivist::{
    commands::{
        cmd_add, cmd_delete, cmd_list, cmd_search, cmd_status, print_add_report,
        print_delete_report, print_listing, print_search_results, print_status, AddOptions,
    },
    config::Config,
    embed::create_embedder,
    error::Result,
    listing::{ListOptions, SortBy, SortOrder},
    progress::LogWriterFactory,
    search::SearchOptions,
    store::QdrantStore,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "archivist")]
#[command(version, about = "Capture web content into a semantic, searchable archive", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "ARCHIVIST_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a document to the archive
    Add {
        /// Document URL (the stable document key)
        url: String,

        /// Read content from a local file instead of fetching the URL
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Use inline text instead of fetching the URL
        #[arg(long)]
        text: Option<String>,

        /// Document title (defaults to the URL)
        #[arg(long)]
        title: Option<String>,

        /// Content type override (e.g. text/markdown)
        #[arg(long)]
        content_type: Option<String>,

        /// Replace the document if it already exists
        #[arg(long)]
        replace: bool,
    },

    /// Search the archive
    Search {
        /// The search query
        query: String,

        /// Maximum number of results (1-20)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum similarity score (0-1)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Only match documents from this domain
        #[arg(long)]
        domain: Option<String>,

        /// Only match chunks with (true) or without (false) code
        #[arg(long)]
        has_code: Option<bool>,

        /// Only match documents added at or after this time (ISO-8601)
        #[arg(long)]
        after: Option<String>,

        /// Only match documents added at or before this time (ISO-8601)
        #[arg(long)]
        before: Option<String>,
    },

    /// List stored documents
    List {
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: usize,

        /// Documents per page
        #[arg(long, default_value = "20")]
        page_size: usize,

        /// Sort key
        #[arg(long, value_enum, default_value = "timestamp")]
        sort_by: SortBy,

        /// Sort direction
        #[arg(long = "order", value_enum, default_value = "desc")]
        sort_order: SortOrder,

        /// Group the page by domain
        #[arg(long)]
        group_by_domain: bool,
    },

    /// Delete a document and all its chunks
    Delete {
        /// Document URL
        url: String,
    },

    /// Show system status
    Status,

    /// Manage the Qdrant collection
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Collection management actions
#[derive(Subcommand)]
enum DbAction {
    /// Initialize/create the Qdrant collection
    Init,

    /// Show Qdrant collection status
    Status,

    /// Reset the collection (delete all vectors and recreate)
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("archivist=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("archivist=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Handle completions command (doesn't need config or store)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "archivist", &mut std::io::stdout());
        return Ok(());
    }

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    // Handle commands
    match cli.command {
        Commands::Add {
            url,
            file,
            text,
            title,
            content_type,
            replace,
        } => {
            let store = QdrantStore::connect(&config).await?;
            let embedder = create_embedder(&config.embedding)?;
            let options = AddOptions {
                file,
                text,
                title,
                content_type,
                replace,
            };

            let report = cmd_add(&config, &store, embedder.as_ref(), &url, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_add_report(&report);
            }
        }

        Commands::Search {
            query,
            limit,
            threshold,
            domain,
            has_code,
            after,
            before,
        } => {
            let store = QdrantStore::connect(&config).await?;
            let embedder = create_embedder(&config.embedding)?;
            let options = SearchOptions {
                limit: limit.unwrap_or(config.search.default_limit),
                score_threshold: threshold.unwrap_or(config.search.default_score_threshold),
                domain,
                has_code,
                after,
                before,
            };

            let report = cmd_search(&store, embedder.as_ref(), &query, &options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_search_results(&report);
            }
        }

        Commands::List {
            page,
            page_size,
            sort_by,
            sort_order,
            group_by_domain,
        } => {
            let store = QdrantStore::connect(&config).await?;
            let options = ListOptions {
                page,
                page_size,
                sort_by,
                sort_order,
                group_by_domain,
            };

            let listing = cmd_list(&store, &options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print_listing(&listing);
            }
        }

        Commands::Delete { url } => {
            let store = QdrantStore::connect(&config).await?;
            let report = cmd_delete(&store, &url).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_delete_report(&report);
            }
        }

        Commands::Status => {
            let store = QdrantStore::connect(&config).await?;
            let status = cmd_status(&config, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Db { action } => {
            handle_db_action(&config, action, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p),
        None => {
            let config = Config::load_from(None)?;
            // First run: persist the defaults so they can be edited
            if !config.paths.config_file.exists() {
                config.save()?;
            }
            Ok(config)
        }
    }
}

async fn handle_db_action(config: &Config, action: DbAction, json: bool) -> Result<()> {
    let store = QdrantStore::connect(config).await?;

    match action {
        DbAction::Init => {
            store.ensure_collection().await?;
            if json {
                println!(r#"{{"status": "ok", "message": "Collection initialized"}}"#);
            } else {
                println!("✓ Qdrant collection initialized");
            }
        }
        DbAction::Status => match store.collection_info().await? {
            Some(info) => {
                if json {
                    let vector_size = info
                        .vector_size
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "null".to_string());
                    println!(
                        r#"{{"exists": true, "points_count": {}, "vector_size": {}, "status": "{}"}}"#,
                        info.points_count, vector_size, info.status
                    );
                } else {
                    println!("Qdrant Collection Status:");
                    println!("  Status: {}", info.status);
                    println!("  Points: {}", info.points_count);
                    match info.vector_size {
                        Some(size) => println!("  Vector size: {}", size),
                        None => println!("  Vector size: unknown"),
                    }
                }
            }
            None => {
                if json {
                    println!(r#"{{"exists": false}}"#);
                } else {
                    println!("Collection does not exist. Run 'archivist db init' to create it.");
                }
            }
        },
        DbAction::Reset { yes } => {
            if !yes {
                eprintln!("⚠️  This will delete ALL indexed data!");
                eprintln!("Run with --yes to confirm.");
                std::process::exit(1);
            }
            store.reset_collection().await?;
            if json {
                println!(r#"{{"status": "ok", "message": "Collection reset"}}"#);
            } else {
                println!("✓ Qdrant collection reset (all data deleted and collection recreated)");
            }
        }
    }

    Ok(())
}
