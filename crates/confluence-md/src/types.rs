//! Core types for Confluence pages and search results
//!
//! These mirror the subset of the Confluence REST API content model that
//! the renderer and CLI need. Unknown fields are ignored; missing ones
//! fall back to empty values so partially expanded responses still decode.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp as sent by the server, offset preserved
pub type Timestamp = DateTime<FixedOffset>;

/// Render a timestamp as `YYYY-MM-DD` in its own offset
pub fn format_date(ts: Option<&Timestamp>) -> String {
    ts.map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A Confluence page with body, version and history expanded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    pub id: String,

    #[serde(default, rename = "type")]
    pub content_type: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub body: Body,

    #[serde(default)]
    pub version: Version,

    #[serde(default)]
    pub history: History,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<Space>,

    #[serde(default, rename = "_links")]
    pub links: Links,
}

impl Page {
    /// Body markup to convert: storage format if present, otherwise the rendered view
    pub fn body_html(&self) -> &str {
        if self.body.storage.value.is_empty() {
            &self.body.view.value
        } else {
            &self.body.storage.value
        }
    }
}

/// The two body representations Confluence can return
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub storage: BodyValue,

    #[serde(default)]
    pub view: BodyValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyValue {
    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub representation: String,
}

/// Page version information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub number: u64,

    #[serde(default)]
    pub when: Option<Timestamp>,

    /// Version comment, empty when the editor left none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,

    #[serde(default)]
    pub by: User,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Page creation information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    #[serde(default)]
    pub created_date: Option<Timestamp>,

    #[serde(default)]
    pub created_by: User,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Space {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub webui: String,

    #[serde(default, rename = "self")]
    pub self_link: String,
}

/// Response of the content search endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub results: Vec<PageSummary>,

    #[serde(default)]
    pub start: u32,

    #[serde(default)]
    pub limit: u32,

    /// Number of results the service reports
    #[serde(default)]
    pub size: u32,
}

/// A single search hit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub id: String,

    #[serde(default, rename = "type")]
    pub content_type: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub space: Space,

    #[serde(default)]
    pub version: Version,

    #[serde(default, rename = "_links")]
    pub links: Links,

    #[serde(default)]
    pub excerpt: String,

    #[serde(default)]
    pub last_modified: Option<Timestamp>,
}

impl PageSummary {
    /// Last modification time, falling back to the version timestamp
    pub fn updated(&self) -> Option<&Timestamp> {
        self.last_modified.as_ref().or(self.version.when.as_ref())
    }

    /// Browser URL of this page on the given site
    pub fn web_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.links.webui)
    }
}

/// Search parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub space: Option<String>,
    pub limit: u32,
}

impl SearchQuery {
    /// Default number of results
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Upper bound the API accepts for one page of results
    pub const MAX_LIMIT: u32 = 50;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            space: None,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    /// Restrict results to one space key; empty keys are ignored
    pub fn space(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.space = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Set the result limit, clamped to `1..=MAX_LIMIT`
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, Self::MAX_LIMIT);
        self
    }

    /// CQL expression for this query
    pub fn to_cql(&self) -> String {
        let text = escape_cql(&self.text);
        match &self.space {
            Some(space) => format!("type=page AND space={} AND text~\"{}\"", space, text),
            None => format!("type=page AND text~\"{}\"", text),
        }
    }
}

/// Accept `null` where a string is expected
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Escape a value for use inside a double-quoted CQL string
fn escape_cql(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
