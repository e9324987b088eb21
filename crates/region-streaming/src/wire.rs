//! Wire encoding of chunks.
//!
//! The shell carries one placeholder slot per region, holding the
//! region's fallback. A region chunk arrives as a `<template>` tagged with
//! the region id and is swapped into its slot by a small inline script
//! that the shell defines once. Slots are only ever replaced, never
//! removed, so a fallback stays visible until its region's chunk lands.

use region_core::RegionId;

use crate::chunk::{Chunk, RegionChunk};
use crate::shell::RenderedShell;

/// Attribute marking a region's placeholder slot.
pub const SLOT_ATTR: &str = "data-region";
/// Attribute marking a region chunk template.
pub const CHUNK_ATTR: &str = "data-region-chunk";
/// Attribute carrying the terminal page status.
pub const STATUS_ATTR: &str = "data-page-status";

/// Marker written when every region reported.
pub const COMPLETE_MARKER: &str = r#"<template data-page-status="complete"></template>"#;
/// Marker written when the page was cancelled before every region reported.
pub const CANCELLED_MARKER: &str = r#"<template data-page-status="cancelled"></template>"#;

/// Escape text for HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Encode text as a JavaScript string literal for an inline script.
pub fn js_string(s: &str) -> String {
    // `<` is escaped so the literal can never close its script element.
    serde_json::to_string(s)
        .unwrap_or_else(|_| String::from("\"\""))
        .replace('<', "\\u003c")
}

/// Script that moves region templates into their slots.
pub fn swap_script() -> &'static str {
    r#"<script>
(function() {
  window.__regionSwap = function(id) {
    const sel = CSS.escape(id);
    const tpl = document.querySelector('template[data-region-chunk="' + sel + '"]');
    const slot = document.querySelector('[data-region="' + sel + '"]');
    if (!tpl || !slot) return;
    slot.replaceChildren(tpl.content.cloneNode(true));
    slot.dataset.state = tpl.dataset.outcome;
    tpl.remove();
  };
})();
</script>
"#
}

/// Placeholder slot for a region, showing its fallback.
pub fn placeholder(region: &RegionId, fallback_html: &str) -> String {
    format!(
        r#"<div {}="{}" data-state="fallback">{}</div>"#,
        SLOT_ATTR,
        escape_html(region.as_str()),
        fallback_html
    )
}

/// Build the shell chunk: shell opening, swap script, then one slot per
/// region in declaration order.
pub fn shell_chunk<'a>(
    shell: &RenderedShell,
    slots: impl IntoIterator<Item = (&'a RegionId, &'a str)>,
) -> Chunk {
    let mut html = shell.opening.clone();
    html.push_str(swap_script());
    for (region, fallback) in slots {
        html.push_str(&placeholder(region, fallback));
        html.push('\n');
    }
    Chunk::Shell {
        html,
        closing: shell.closing.clone(),
    }
}

/// Encode a region chunk.
pub fn region_template(chunk: &RegionChunk) -> String {
    let id = chunk.region.as_str();
    let cache = chunk
        .cache
        .map(|status| format!(r#" data-cache="{}""#, status.to_string().to_lowercase()))
        .unwrap_or_default();
    let swap = format!("<script>__regionSwap({})</script>", js_string(id));

    format!(
        r#"<template {attr}="{id}" data-outcome="{outcome}"{cache}>{html}</template>{swap}"#,
        attr = CHUNK_ATTR,
        id = escape_html(id),
        outcome = chunk.kind,
        cache = cache,
        html = chunk.html,
        swap = swap,
    )
}

/// Encode any chunk. The shell's closing half is not included; the writer
/// appends it after the terminal marker.
pub fn encode(chunk: &Chunk) -> String {
    match chunk {
        Chunk::Shell { html, .. } => html.clone(),
        Chunk::Region(region) => region_template(region),
        Chunk::Complete => COMPLETE_MARKER.to_string(),
        Chunk::Cancelled => CANCELLED_MARKER.to_string(),
    }
}
