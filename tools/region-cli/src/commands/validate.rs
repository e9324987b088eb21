//! Descriptor validation command.

use anyhow::Result;
use region_sdk::region_executor::Page;

use super::ValidateArgs;
use crate::context::Context;

/// Run the validate command.
pub async fn run(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let descriptor = ctx.load_page(&args.page)?;
    let page = Page::simulated(&descriptor)?;

    if ctx.output.is_json() {
        ctx.output.json(&descriptor);
        return Ok(());
    }

    ctx.output.success(&format!(
        "{} is valid ({} regions)",
        descriptor.name,
        page.regions.len()
    ));
    for region in &page.regions {
        if !region.policy.is_streamed() {
            ctx.output.warn(&format!(
                "Region '{}' is {}; only its fallback is sent",
                region.id, region.policy
            ));
        }
    }
    Ok(())
}
