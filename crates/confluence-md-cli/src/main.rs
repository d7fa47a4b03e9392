//! confluence-md CLI - fetch and search Confluence pages as Markdown

mod commands;

use clap::{Args, Parser, Subcommand};
use commands::{CommandError, ListingFormat, SearchOptions, SearchOutcome};
use confluence_md::{Config, ConfluenceClient, Error, RenderOptions, SearchQuery};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Exit code when a search matches nothing
const EXIT_NO_RESULTS: i32 = 4;

/// confluence-md - Confluence pages as Markdown
#[derive(Parser, Debug)]
#[command(name = "confluence-md")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.config/confluence-md/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OutputOptions {
    /// Write the fetched page to a file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Include page metadata (ID, author, dates, version)
    #[arg(long)]
    include_metadata: bool,
}

impl OutputOptions {
    fn render_options(&self) -> RenderOptions {
        RenderOptions::new().include_metadata(self.include_metadata)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a page by URL and print it as Markdown
    Fetch {
        /// Page URL (must contain /pages/<id>)
        url: String,

        #[command(flatten)]
        out: OutputOptions,
    },
    /// Search pages and list or fetch results
    Search {
        /// Text to search for
        query: String,

        /// Restrict to a space key
        #[arg(long)]
        space: Option<String>,

        /// Maximum number of results
        #[arg(long, default_value_t = SearchQuery::DEFAULT_LIMIT,
              value_parser = clap::value_parser!(u32).range(1..=SearchQuery::MAX_LIMIT as i64))]
        limit: u32,

        /// Fetch the first result instead of listing
        #[arg(long)]
        lucky: bool,

        /// Fetch the Nth result (1-based) instead of listing
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        index: Option<u32>,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        out: OutputOptions,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let client = match connect(cli.config.as_deref()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Fetch { url, out } => run_fetch(&client, &url, &out).await,
        Commands::Search {
            query,
            space,
            limit,
            lucky,
            index,
            json,
            out,
        } => {
            let mut search = SearchQuery::new(query).limit(limit);
            if let Some(space) = space {
                search = search.space(space);
            }
            let options = SearchOptions {
                query: search,
                select: commands::selected_result(lucky, index),
                listing: if json {
                    ListingFormat::Json
                } else {
                    ListingFormat::Text
                },
                render: out.render_options(),
            };
            run_search(&client, &options, &out).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("confluence_md=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn connect(config_path: Option<&Path>) -> Result<ConfluenceClient, Error> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    debug!(?config, "Loaded configuration");
    Ok(ConfluenceClient::from_config(&config)?)
}

async fn run_fetch(
    client: &ConfluenceClient,
    url: &str,
    out: &OutputOptions,
) -> Result<(), CommandError> {
    let document = commands::fetch_page(client, url, &out.render_options()).await?;
    emit(&document, out.output.as_deref())
}

async fn run_search(
    client: &ConfluenceClient,
    options: &SearchOptions,
    out: &OutputOptions,
) -> Result<(), CommandError> {
    let outcome = commands::search_pages(client, client.base_url(), options).await?;
    let destination = outcome.destination(out.output.as_deref());
    match outcome {
        SearchOutcome::Document(text) | SearchOutcome::Listing(text) => emit(&text, destination),
        SearchOutcome::NoResults => {
            writeln_safe("No results found");
            std::process::exit(EXIT_NO_RESULTS);
        }
    }
}

/// Write to the output file if given, otherwise stdout
fn emit(content: &str, output: Option<&Path>) -> Result<(), CommandError> {
    match output {
        Some(path) => {
            commands::write_to_file(path, content)?;
            eprintln!("Written to {}", path.display());
        }
        None => print_safe(content),
    }
    Ok(())
}

/// Write to stdout without trailing newline, exit silently on broken pipe
fn print_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = write!(handle, "{}", s).and_then(|_| handle.flush()) {
        handle_stdout_error(e);
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        handle_stdout_error(e);
    }
}

fn handle_stdout_error(e: io::Error) {
    if e.kind() == io::ErrorKind::BrokenPipe {
        std::process::exit(0);
    }
    eprintln!("Error writing to stdout: {}", e);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search_flags() {
        let cli = Cli::try_parse_from([
            "confluence-md",
            "search",
            "deploy guide",
            "--space",
            "OPS",
            "--limit",
            "5",
            "--index",
            "2",
            "-o",
            "out.md",
            "--include-metadata",
            "--debug",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Commands::Search {
                query,
                space,
                limit,
                lucky,
                index,
                json,
                out,
            } => {
                assert_eq!(query, "deploy guide");
                assert_eq!(space.as_deref(), Some("OPS"));
                assert_eq!(limit, 5);
                assert!(!lucky);
                assert_eq!(index, Some(2));
                assert!(!json);
                assert_eq!(out.output, Some(PathBuf::from("out.md")));
                assert!(out.include_metadata);
            }
            other => panic!("expected search, got {:?}", other),
        }
    }

    #[test]
    fn test_search_defaults() {
        let cli = Cli::try_parse_from(["confluence-md", "search", "x"]).unwrap();
        match cli.command {
            Commands::Search { limit, index, .. } => {
                assert_eq!(limit, 10);
                assert_eq!(index, None);
            }
            other => panic!("expected search, got {:?}", other),
        }
    }

    #[test]
    fn test_limit_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["confluence-md", "search", "x", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["confluence-md", "search", "x", "--limit", "51"]).is_err());
        assert!(Cli::try_parse_from(["confluence-md", "search", "x", "--index", "0"]).is_err());
    }

    #[test]
    fn test_parse_fetch_with_config() {
        let cli = Cli::try_parse_from([
            "confluence-md",
            "--config",
            "/tmp/c.yaml",
            "fetch",
            "https://wiki.example.com/spaces/X/pages/1",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        match cli.command {
            Commands::Fetch { url, out } => {
                assert_eq!(url, "https://wiki.example.com/spaces/X/pages/1");
                assert!(out.output.is_none());
                assert!(!out.include_metadata);
            }
            other => panic!("expected fetch, got {:?}", other),
        }
    }

    #[test]
    fn test_connect_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = connect(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
