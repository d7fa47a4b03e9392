//! Fetch and search command logic
//!
//! Commands take a [`PageSource`] and return what should be written, so
//! they can run against a fake source in tests.

use chrono::SecondsFormat;
use confluence_md::{
    format_date, ConversionError, Error, FetchError, PageRenderer, PageSource, RenderOptions,
    SearchQuery, SearchResults,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Errors raised by CLI commands
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Lib(#[from] Error),

    #[error("index {index} out of range (found {found} results)")]
    IndexOutOfRange { index: usize, found: usize },

    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing results: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<FetchError> for CommandError {
    fn from(err: FetchError) -> Self {
        CommandError::Lib(err.into())
    }
}

impl From<ConversionError> for CommandError {
    fn from(err: ConversionError) -> Self {
        CommandError::Lib(err.into())
    }
}

/// Result of the search command
#[derive(Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A selected result rendered as markdown
    Document(String),
    /// Listing of results
    Listing(String),
    /// The service returned nothing
    NoResults,
}

impl SearchOutcome {
    /// File to write this outcome to. Listings always go to stdout;
    /// only a fetched document honors `--output`.
    pub fn destination<'a>(&self, output: Option<&'a Path>) -> Option<&'a Path> {
        match self {
            SearchOutcome::Document(_) => output,
            SearchOutcome::Listing(_) | SearchOutcome::NoResults => None,
        }
    }
}

/// How search results are presented when none is selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingFormat {
    #[default]
    Text,
    Json,
}

/// Options for the search command
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub query: SearchQuery,
    /// Zero-based result to fetch instead of listing
    pub select: Option<usize>,
    pub listing: ListingFormat,
    pub render: RenderOptions,
}

/// Zero-based result to fetch: `--index` (1-based) wins over `--lucky`
pub fn selected_result(lucky: bool, index: Option<u32>) -> Option<usize> {
    match index {
        Some(i) if i > 0 => Some(i as usize - 1),
        _ if lucky => Some(0),
        _ => None,
    }
}

/// Fetch a page by URL and render it
pub async fn fetch_page(
    source: &dyn PageSource,
    url: &str,
    render: &RenderOptions,
) -> Result<String, CommandError> {
    debug!(url, "Fetching URL");
    let page = source.page_by_url(url).await?;
    Ok(PageRenderer::new().render(&page, render)?)
}

/// Run a search and either render the selected hit or list all hits
pub async fn search_pages(
    source: &dyn PageSource,
    base_url: &str,
    options: &SearchOptions,
) -> Result<SearchOutcome, CommandError> {
    debug!(
        query = %options.query.text,
        space = ?options.query.space,
        limit = options.query.limit,
        "Searching"
    );
    let results = source.search(&options.query).await?;

    if results.results.is_empty() {
        return Ok(SearchOutcome::NoResults);
    }

    if let Some(select) = options.select {
        let hit = results
            .results
            .get(select)
            .ok_or(CommandError::IndexOutOfRange {
                index: select + 1,
                found: results.results.len(),
            })?;
        debug!(title = %hit.title, id = %hit.id, kind = %hit.content_type, "Selected result");

        let page = source.page_by_id(&hit.id).await?;
        let document = PageRenderer::new().render(&page, &options.render)?;
        return Ok(SearchOutcome::Document(document));
    }

    let listing = match options.listing {
        ListingFormat::Text => format_listing(&results, base_url),
        ListingFormat::Json => serde_json::to_string_pretty(&listing_entries(&results, base_url))?,
    };
    Ok(SearchOutcome::Listing(listing))
}

/// Write a rendered document or listing to a file
pub fn write_to_file(path: &Path, content: &str) -> Result<(), CommandError> {
    std::fs::write(path, content).map_err(|source| CommandError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// One search hit in JSON listings
#[derive(Debug, Serialize)]
struct ListingEntry<'a> {
    index: usize,
    id: &'a str,
    title: &'a str,
    space: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<String>,
    url: String,
}

fn listing_entries<'a>(results: &'a SearchResults, base_url: &str) -> Vec<ListingEntry<'a>> {
    results
        .results
        .iter()
        .enumerate()
        .map(|(i, hit)| ListingEntry {
            index: i + 1,
            id: &hit.id,
            title: &hit.title,
            space: &hit.space.key,
            updated: hit
                .updated()
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            url: hit.web_url(base_url),
        })
        .collect()
}

/// Human readable listing of search hits
pub fn format_listing(results: &SearchResults, base_url: &str) -> String {
    let mut output = format!("Found {} results:\n\n", results.size);

    for (i, hit) in results.results.iter().enumerate() {
        output.push_str(&format!("[{}] {}\n", i + 1, hit.title));
        output.push_str(&format!(
            "    Space: {} | Updated: {}\n",
            hit.space.key,
            format_date(hit.updated())
        ));
        output.push_str(&format!("    URL: {}\n\n", hit.web_url(base_url)));
    }

    output
}
