//! Page inspection command.

use anyhow::Result;
use region_sdk::region_cache::PageHeadersBuilder;
use region_sdk::region_executor::Page;
use serde::Serialize;

use super::InspectArgs;
use crate::context::Context;

#[derive(Serialize)]
struct RegionInfo {
    id: String,
    key: String,
    policy: String,
    timeout_ms: u64,
    source: String,
}

#[derive(Serialize)]
struct PageInfo {
    page: String,
    cache_control: String,
    headers: Vec<(String, String)>,
    regions: Vec<RegionInfo>,
}

/// Run the inspect command.
pub async fn run(args: InspectArgs, ctx: &Context) -> Result<()> {
    let descriptor = ctx.load_page(&args.page)?;
    let engine = ctx.engine_for(&descriptor);
    let page = Page::simulated(&descriptor)?;

    let headers = PageHeadersBuilder::new()
        .policies(page.policies().cloned())
        .build()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    let regions = page
        .regions
        .iter()
        .map(|region| RegionInfo {
            id: region.id.to_string(),
            key: region.key.clone(),
            policy: region.policy.to_string(),
            timeout_ms: region
                .timeout
                .unwrap_or_else(|| engine.default_region_timeout())
                .as_millis() as u64,
            source: region.source_name().to_string(),
        })
        .collect();

    let info = PageInfo {
        page: page.name.clone(),
        cache_control: page.cache_control(),
        headers,
        regions,
    };

    if ctx.output.is_json() {
        ctx.output.json(&info);
        return Ok(());
    }

    ctx.output.header(&format!("Page {}", info.page));
    for (name, value) in &info.headers {
        ctx.output.kv(name, value);
    }
    if let Some(deadline) = engine.page_deadline() {
        ctx.output.kv("deadline", &format!("{}ms", deadline.as_millis()));
    }

    ctx.output.header("Regions");
    let widths = [16, 16, 18, 10];
    ctx.output.row(&["ID", "KEY", "POLICY", "TIMEOUT"], &widths);
    for region in &info.regions {
        ctx.output.row(
            &[
                &region.id,
                &region.key,
                &region.policy,
                &format!("{}ms", region.timeout_ms),
            ],
            &widths,
        );
    }
    Ok(())
}
