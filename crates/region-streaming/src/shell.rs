//! Shell template abstraction.

use region_core::PageDescriptor;

use crate::error::StreamError;
use crate::wire::escape_html;

/// Head content for the shell.
#[derive(Debug, Clone, Default)]
pub struct HeadContent {
    /// Page title.
    pub title: Option<String>,
    /// Meta tags.
    pub meta: Vec<(String, String)>,
    /// Link tags (stylesheets, etc.).
    pub links: Vec<String>,
}

impl HeadContent {
    /// Create new head content with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Add a meta tag.
    pub fn with_meta(mut self, name: &str, content: &str) -> Self {
        self.meta.push((name.to_string(), content.to_string()));
        self
    }

    /// Add a stylesheet link.
    pub fn with_stylesheet(mut self, href: &str) -> Self {
        self.links.push(format!(
            r#"<link rel="stylesheet" href="{}">"#,
            escape_html(href)
        ));
        self
    }

    /// Render head content to HTML.
    pub fn render(&self) -> String {
        let mut html = String::new();

        if let Some(title) = &self.title {
            html.push_str(&format!("<title>{}</title>\n", escape_html(title)));
        }

        for (name, content) in &self.meta {
            html.push_str(&format!(
                r#"<meta name="{}" content="{}">"#,
                escape_html(name),
                escape_html(content)
            ));
            html.push('\n');
        }

        for link in &self.links {
            html.push_str(link);
            html.push('\n');
        }

        html
    }
}

/// The two halves of a rendered shell: everything before the region
/// slots, and everything after the terminal marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedShell {
    /// Doctype, head and body opening.
    pub opening: String,
    /// Closing body and document tags.
    pub closing: String,
}

/// Produces the page shell.
///
/// Rendering is synchronous and expected to be cheap. A failure here is
/// the only error that fails a whole page.
pub trait ShellRenderer: Send + Sync {
    /// Render the shell.
    fn render(&self) -> Result<RenderedShell, StreamError>;
}

impl<F> ShellRenderer for F
where
    F: Fn() -> Result<RenderedShell, StreamError> + Send + Sync,
{
    fn render(&self) -> Result<RenderedShell, StreamError> {
        self()
    }
}

/// Shell template with region slots between its halves.
#[derive(Debug, Clone)]
pub struct Shell {
    /// Include doctype declaration.
    pub doctype: bool,
    /// Head content.
    pub head: HeadContent,
    /// HTML before the region slots (opening body, wrapper divs, etc.).
    pub body_start: String,
    /// HTML after the terminal marker (closing tags).
    pub body_end: String,
}

impl Shell {
    /// Create a new shell with basic structure.
    pub fn new(head: HeadContent) -> Self {
        Self {
            doctype: true,
            head,
            body_start: "<body>\n<main>\n".to_string(),
            body_end: "</main>\n</body>\n</html>".to_string(),
        }
    }

    /// Build the shell declared by a page descriptor.
    pub fn from_descriptor(page: &PageDescriptor) -> Self {
        let title = page.title.clone().unwrap_or_else(|| page.name.clone());
        let mut head = HeadContent::new(title);
        for href in &page.shell.stylesheets {
            head = head.with_stylesheet(href);
        }

        let mut shell = Self::new(head);
        // Descriptor markup goes inside the default body, not in place of it.
        if let Some(start) = &page.shell.body_start {
            shell.body_start.push_str(start);
        }
        if let Some(end) = &page.shell.body_end {
            shell.body_end.insert_str(0, end);
        }
        shell
    }

    /// Set custom body start HTML.
    pub fn with_body_start(mut self, html: impl Into<String>) -> Self {
        self.body_start = html.into();
        self
    }

    /// Set custom body end HTML.
    pub fn with_body_end(mut self, html: impl Into<String>) -> Self {
        self.body_end = html.into();
        self
    }

    /// Render the opening part of the shell (before region slots).
    pub fn render_opening(&self) -> String {
        let mut html = String::new();

        if self.doctype {
            html.push_str("<!DOCTYPE html>\n");
        }

        html.push_str("<html>\n<head>\n");
        html.push_str(&self.head.render());
        html.push_str("</head>\n");
        html.push_str(&self.body_start);

        html
    }

    /// Render the closing part of the shell.
    pub fn render_closing(&self) -> String {
        self.body_end.clone()
    }
}

impl ShellRenderer for Shell {
    fn render(&self) -> Result<RenderedShell, StreamError> {
        Ok(RenderedShell {
            opening: self.render_opening(),
            closing: self.render_closing(),
        })
    }
}
