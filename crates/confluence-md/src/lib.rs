//! confluence-md - fetch Confluence pages as Markdown
//!
//! This crate retrieves pages from the Confluence REST API and renders
//! them as Markdown documents.
//!
//! ## Rendering
//!
//! [`PageRenderer`] turns a [`Page`] into a document: title heading,
//! optional metadata block, and the body converted through a
//! [`MarkdownConverter`]. Before conversion, Confluence task lists are
//! rewritten into plain lists with `[x]` / `[ ]` checkboxes by
//! [`rewrite_task_lists`].
//!
//! ## Retrieval
//!
//! [`PageSource`] abstracts page lookup and search. [`ConfluenceClient`]
//! implements it against the REST API using settings from [`Config`].

pub mod client;
pub mod config;
mod convert;
mod error;
mod tasks;
mod types;

pub use client::{extract_page_id, ConfluenceClient, PageSource};
pub use config::Config;
pub use convert::{
    page_to_markdown, unescape_checkboxes, HtmdConverter, MarkdownConverter, PageRenderer,
    RenderOptions,
};
pub use error::{BoxError, ConfigError, ConversionError, Error, FetchError};
pub use tasks::{rewrite_task_lists, TaskStatus};
pub use types::{
    format_date, Body, BodyValue, History, Links, Page, PageSummary, SearchQuery, SearchResults,
    Space, Timestamp, User, Version,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = concat!("confluence-md/", env!("CARGO_PKG_VERSION"));
