//! Region data renderers.

use region_core::{RegionData, RegionId};
use region_streaming::wire::escape_html;

use crate::error::RenderError;

/// Turns a region's resolved data into content markup.
///
/// Renderers are synchronous; slow work belongs in the data source.
pub trait Renderer: Send + Sync {
    /// Render `data` for `region`.
    fn render(&self, region: &RegionId, data: &RegionData) -> Result<String, RenderError>;
}

/// Default renderer: strings become escaped text, everything else an
/// escaped JSON block.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, region: &RegionId, data: &RegionData) -> Result<String, RenderError> {
        match data {
            RegionData::String(text) => Ok(escape_html(text)),
            other => {
                let pretty = serde_json::to_string_pretty(other)
                    .map_err(|e| RenderError::Failed(e.to_string()))?;
                Ok(format!(
                    r#"<pre class="region-data" data-for="{}">{}</pre>"#,
                    escape_html(region.as_str()),
                    escape_html(&pretty)
                ))
            }
        }
    }
}

/// Renderer backed by a closure.
pub struct FnRenderer<F> {
    f: F,
}

/// Adapt a closure into a `Renderer`.
pub fn renderer_fn<F>(f: F) -> FnRenderer<F>
where
    F: Fn(&RegionData) -> Result<String, RenderError> + Send + Sync,
{
    FnRenderer { f }
}

impl<F> Renderer for FnRenderer<F>
where
    F: Fn(&RegionData) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, _region: &RegionId, data: &RegionData) -> Result<String, RenderError> {
        (self.f)(data)
    }
}

/// Renders a string field of an object value, e.g. `{"title": "..."}`.
#[derive(Debug, Clone)]
pub struct FieldRenderer {
    field: String,
    tag: String,
}

impl FieldRenderer {
    /// Render `field` inside a `<p>`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            tag: "p".to_string(),
        }
    }

    /// Wrap in a different tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

impl Renderer for FieldRenderer {
    fn render(&self, _region: &RegionId, data: &RegionData) -> Result<String, RenderError> {
        let value = data
            .get(self.field.as_str())
            .ok_or_else(|| RenderError::Invalid(format!("missing field '{}'", self.field)))?;
        let text = match value {
            RegionData::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok(format!("<{tag}>{}</{tag}>", escape_html(&text), tag = self.tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_renderer_string_is_escaped() {
        let html = JsonRenderer
            .render(&RegionId::new("r"), &json!("<b>hi</b>"))
            .unwrap();
        assert_eq!(html, "&lt;b&gt;hi&lt;/b&gt;");
    }

    #[test]
    fn test_json_renderer_object_block() {
        let html = JsonRenderer
            .render(&RegionId::new("todo"), &json!({ "title": "a" }))
            .unwrap();
        assert!(html.starts_with(r#"<pre class="region-data" data-for="todo">"#));
        assert!(html.contains("&quot;title&quot;"));
    }

    #[test]
    fn test_field_renderer() {
        let renderer = FieldRenderer::new("title").with_tag("h2");
        let id = RegionId::new("todo");
        assert_eq!(
            renderer.render(&id, &json!({ "title": "delectus" })).unwrap(),
            "<h2>delectus</h2>"
        );
        assert_eq!(
            renderer.render(&id, &json!({ "id": 1 })),
            Err(RenderError::Invalid("missing field 'title'".into()))
        );
    }

    #[test]
    fn test_fn_renderer() {
        let renderer = renderer_fn(|data| Ok(format!("<time>{}</time>", data)));
        assert_eq!(
            renderer.render(&RegionId::new("clock"), &json!(3)).unwrap(),
            "<time>3</time>"
        );
    }
}
