//! Page rendering command.

use std::time::Duration;

use anyhow::{Context as _, Result};
use futures::channel::mpsc;
use futures::StreamExt;
use region_sdk::region_executor::{cancel_pair, Page, PageComposer};
use region_sdk::region_observability::PageMetrics;
use tokio::io::AsyncWriteExt;

use super::RenderArgs;
use crate::context::Context;
use crate::output::{format_bytes, format_us, outcome_badge};

/// Run the render command.
pub async fn run(args: RenderArgs, ctx: &Context) -> Result<()> {
    let descriptor = ctx.load_page(&args.page)?;
    let engine = ctx.engine_for(&descriptor);
    let page = Page::simulated(&descriptor)?;

    // Repeats share the composer's store so cache states carry over.
    let composer = PageComposer::from_config(&engine);
    let quiet = args.quiet || ctx.output.is_json();
    let repeat = args.repeat.max(1);

    let mut reports = Vec::with_capacity(repeat);
    for run in 1..=repeat {
        if run > 1 && args.interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
        tracing::debug!(page = %page.name, run, repeat, "render started");

        let metrics = render_once(&composer, &page, args.cancel_after_ms, quiet)
            .await
            .with_context(|| format!("Failed to render {} (run {}/{})", page.name, run, repeat))?;

        if !ctx.output.is_json() {
            print_report(ctx, &metrics, run, repeat);
        }
        reports.push(metrics);
    }

    if ctx.output.is_json() {
        ctx.output.json(&reports);
    }
    Ok(())
}

async fn render_once(
    composer: &PageComposer,
    page: &Page,
    cancel_after_ms: Option<u64>,
    quiet: bool,
) -> Result<PageMetrics> {
    let (handle, signal) = cancel_pair();
    let timer = cancel_after_ms.map(|ms| handle.cancel_after(Duration::from_millis(ms)));

    let (tx, rx) = mpsc::unbounded::<Vec<u8>>();
    let printer = tokio::spawn(write_frames(rx, quiet));

    let result = composer.render_to(page, signal, tx).await;
    if let Some(timer) = timer {
        timer.abort();
    }
    printer.await.context("Stream printer panicked")??;

    Ok(result?)
}

async fn write_frames(mut frames: mpsc::UnboundedReceiver<Vec<u8>>, quiet: bool) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(frame) = frames.next().await {
        if quiet {
            continue;
        }
        stdout.write_all(&frame).await.context("Failed to write to stdout")?;
        stdout.flush().await.context("Failed to flush stdout")?;
    }
    if !quiet {
        stdout.write_all(b"\n").await?;
    }
    Ok(())
}

fn print_report(ctx: &Context, metrics: &PageMetrics, run: usize, repeat: usize) {
    ctx.output
        .header(&format!("Run {}/{}: {} [{}]", run, repeat, metrics.page, metrics.status));
    ctx.output.kv("request", &metrics.request_id);
    if let Some(tts) = metrics.time_to_shell_us {
        ctx.output.kv("shell", &format_us(tts));
    }
    if let Some(ttfr) = metrics.time_to_first_region_us {
        ctx.output.kv("first region", &format_us(ttfr));
    }
    ctx.output.kv(
        "total",
        &format!(
            "{}, {}",
            format_us(metrics.total_duration_us),
            format_bytes(metrics.total_bytes() as u64)
        ),
    );

    let widths = [16, 10, 10, 10, 8];
    for region in &metrics.regions {
        let cache = region.cache.map(|c| c.to_string()).unwrap_or_default();
        let refresh = if region.refresh_triggered { "refresh" } else { "" };
        ctx.output.row(
            &[
                &region.region,
                &outcome_badge(region.outcome),
                &cache,
                &format_us(region.resolve_us),
                refresh,
            ],
            &widths,
        );
    }
    if !metrics.unresolved.is_empty() {
        ctx.output
            .warn(&format!("Unresolved: {}", metrics.unresolved.join(", ")));
    }
}
