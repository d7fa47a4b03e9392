//! Page to markdown rendering
//!
//! A rendered document is the page title as a level-one heading, an
//! optional metadata block, and the page body converted to markdown.
//! The HTML to markdown step goes through [`MarkdownConverter`] so the
//! backend can be swapped; [`HtmdConverter`] is the default.

use crate::error::ConversionError;
use crate::tasks::rewrite_task_lists;
use crate::types::{format_date, Page};
use tracing::debug;

/// Escaped checkbox sequences generic converters produce, and their fix
const CHECKBOX_ESCAPES: &[(&str, &str)] = &[(r"\[x\]", "[x]"), (r"\[ \]", "[ ]")];

/// Converts an HTML fragment to markdown
pub trait MarkdownConverter {
    fn convert(&self, html: &str) -> Result<String, ConversionError>;
}

impl<F> MarkdownConverter for F
where
    F: Fn(&str) -> Result<String, ConversionError>,
{
    fn convert(&self, html: &str) -> Result<String, ConversionError> {
        self(html)
    }
}

/// Markdown converter backed by the `htmd` crate
pub struct HtmdConverter {
    inner: htmd::HtmlToMarkdown,
}

impl HtmdConverter {
    pub fn new() -> Self {
        Self {
            inner: htmd::HtmlToMarkdown::builder()
                .skip_tags(vec!["script", "style"])
                .build(),
        }
    }
}

impl Default for HtmdConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter for HtmdConverter {
    fn convert(&self, html: &str) -> Result<String, ConversionError> {
        self.inner.convert(html).map_err(ConversionError::new)
    }
}

/// Per-call rendering options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit the page id, creation and modification block after the title
    pub include_metadata: bool,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the metadata block
    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }
}

/// Renders pages to markdown documents
pub struct PageRenderer<C = HtmdConverter> {
    converter: C,
}

impl PageRenderer {
    /// Create a renderer using [`HtmdConverter`]
    pub fn new() -> Self {
        Self::with_converter(HtmdConverter::new())
    }
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MarkdownConverter> PageRenderer<C> {
    /// Create a renderer with a custom markdown backend
    pub fn with_converter(converter: C) -> Self {
        Self { converter }
    }

    /// Render a page as a complete markdown document.
    ///
    /// The body is converted before anything else is assembled, so a
    /// converter failure returns only the error.
    pub fn render(&self, page: &Page, options: &RenderOptions) -> Result<String, ConversionError> {
        let html = page.body_html();
        debug!(page_id = %page.id, html_len = html.len(), "Rendering page");

        let body = self.convert_body(html)?;

        let mut output = format!("# {}\n\n", page.title);
        if options.include_metadata {
            output.push_str(&metadata_block(page));
        }
        output.push_str(&body);

        Ok(output)
    }

    /// Convert storage or view markup to markdown, with task lists and
    /// checkbox escapes handled
    pub fn convert_body(&self, html: &str) -> Result<String, ConversionError> {
        let html = rewrite_task_lists(html);
        let markdown = self.converter.convert(&html)?;
        Ok(unescape_checkboxes(&markdown))
    }
}

/// Render a page with the default converter
pub fn page_to_markdown(page: &Page, include_metadata: bool) -> Result<String, ConversionError> {
    PageRenderer::new().render(page, &RenderOptions::new().include_metadata(include_metadata))
}

/// Undo bracket escaping on checkbox glyphs
pub fn unescape_checkboxes(markdown: &str) -> String {
    CHECKBOX_ESCAPES
        .iter()
        .fold(markdown.to_string(), |acc, (escaped, plain)| {
            acc.replace(escaped, plain)
        })
}

/// Metadata block between two horizontal rules
fn metadata_block(page: &Page) -> String {
    let mut block = String::from("---\n\n");
    block.push_str(&format!("**Page ID:** {}\n\n", page.id));
    block.push_str(&format!(
        "**Created:** {} by {}\n\n",
        format_date(page.history.created_date.as_ref()),
        page.history.created_by.display_name
    ));
    block.push_str(&format!(
        "**Last Modified:** {} by {} (v{})\n\n",
        format_date(page.version.when.as_ref()),
        page.version.by.display_name,
        page.version.number
    ));
    if !page.version.message.is_empty() {
        block.push_str(&format!(
            "**Version Message:** {}\n\n",
            page.version.message
        ));
    }
    block.push_str("---\n\n");
    block
}
