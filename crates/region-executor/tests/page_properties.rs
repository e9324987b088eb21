//! End-to-end page behaviour through `PageComposer`.

use std::time::Duration;

use futures::channel::mpsc;
use futures::StreamExt;
use region_cache::{CachePolicy, CacheStatus};
use region_core::{EngineConfig, EngineError, RegionId};
use region_data::SimulatedSource;
use region_executor::{
    cancel_pair, CancelSignal, FieldRenderer, Page, PageComposer, Region,
};
use region_observability::{PageMetrics, PageStatus};
use region_streaming::{wire, Chunk, HeadContent, OutcomeKind, RenderedShell, Shell, StreamError};
use serde_json::json;

fn composer() -> PageComposer {
    PageComposer::from_config(&EngineConfig::default())
}

fn shell(name: &str) -> Shell {
    Shell::new(HeadContent::new(name))
}

fn region(id: &str, delay_ms: u64) -> Region {
    Region::builder(
        id,
        SimulatedSource::new(id, json!(format!("{} data", id)))
            .with_delay(Duration::from_millis(delay_ms)),
    )
    .fallback(format!("<p>{} loading</p>", id))
    .error_content(format!("<p>{} unavailable</p>", id))
    .build()
}

async fn render(
    composer: &PageComposer,
    page: &Page,
    cancel: CancelSignal,
) -> (Result<PageMetrics, EngineError>, Vec<String>) {
    let (tx, rx) = mpsc::unbounded::<Vec<u8>>();
    let result = composer.render_to(page, cancel, tx).await;
    let frames = rx
        .map(|frame| String::from_utf8_lossy(&frame).into_owned())
        .collect::<Vec<_>>()
        .await;
    (result, frames)
}

// === Shell Ordering Tests ===

#[tokio::test(start_paused = true)]
async fn test_shell_precedes_instant_regions() {
    let page = Page::new("instant", shell("instant"))
        .with_region(region("a", 0))
        .with_region(region("b", 0));

    let (result, frames) = render(&composer(), &page, CancelSignal::never()).await;
    result.unwrap();

    assert!(frames[0].starts_with("<!DOCTYPE html>"));
    assert!(frames[0].contains(r#"data-region="a""#));
    assert!(frames[0].contains(r#"data-region="b""#));
    for frame in &frames[1..3] {
        assert!(frame.starts_with("<template data-region-chunk="));
    }
    assert!(frames[3].starts_with(wire::COMPLETE_MARKER));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_shown_until_single_region_chunk() {
    let page = Page::new("slow", shell("slow")).with_region(region("feed", 2_000));

    let (result, frames) = render(&composer(), &page, CancelSignal::never()).await;
    result.unwrap();

    assert!(frames[0].contains("<p>feed loading</p>"));
    let chunks_for_feed = frames
        .iter()
        .filter(|f| f.contains(r#"data-region-chunk="feed""#))
        .count();
    assert_eq!(chunks_for_feed, 1);
    assert!(frames[1].contains("feed data"));
}

#[tokio::test(start_paused = true)]
async fn test_regions_arrive_in_completion_order() {
    let page = Page::new("mixed", shell("mixed"))
        .with_region(region("slow", 300))
        .with_region(region("fast", 10));

    let chunks: Vec<Chunk> = composer()
        .compose(&page, CancelSignal::never())
        .unwrap()
        .collect()
        .await;

    let order: Vec<&str> = chunks
        .iter()
        .filter_map(|c| c.region().map(RegionId::as_str))
        .collect();
    assert_eq!(order, vec!["fast", "slow"]);
}

// === Degenerate Page Tests ===

#[tokio::test]
async fn test_zero_regions_emit_shell_then_completion() {
    let page = Page::new("empty", shell("empty"));
    let chunks: Vec<Chunk> = composer()
        .compose(&page, CancelSignal::never())
        .unwrap()
        .collect()
        .await;

    assert_eq!(chunks.len(), 2);
    assert!(matches!(chunks[0], Chunk::Shell { .. }));
    assert_eq!(chunks[1], Chunk::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_all_regions_failing_still_succeeds() {
    let failing = |id: &str| {
        Region::builder(id, SimulatedSource::new(id, json!(null)).failing("503"))
            .error_content(format!("<p>{} failed</p>", id))
            .build()
    };
    let page = Page::new("broken", shell("broken"))
        .with_region(failing("a"))
        .with_region(failing("b"))
        .with_region(failing("c"));

    let (result, frames) = render(&composer(), &page, CancelSignal::never()).await;
    let metrics = result.unwrap();

    assert_eq!(metrics.status, PageStatus::Completed);
    assert_eq!(metrics.error_count(), 3);
    assert_eq!(frames.len(), 5);
    for id in ["a", "b", "c"] {
        let content = format!("<p>{} failed</p>", id);
        assert!(frames[1..4]
            .iter()
            .any(|f| f.contains(&content) && f.contains(r#"data-outcome="error""#)));
    }
    assert!(frames[4].starts_with(wire::COMPLETE_MARKER));
}

#[tokio::test]
async fn test_shell_fault_emits_nothing() {
    let page = Page::new("no-shell", || -> Result<RenderedShell, StreamError> {
        Err(StreamError::ShellRender("layout missing".into()))
    })
    .with_region(region("a", 0));

    let (result, frames) = render(&composer(), &page, CancelSignal::never()).await;
    assert!(matches!(result, Err(EngineError::ShellRender(_))));
    assert!(frames.is_empty());
}

#[tokio::test]
async fn test_duplicate_region_ids_fail_before_shell() {
    let page = Page::new("dup", shell("dup"))
        .with_region(region("a", 0))
        .with_region(region("a", 0));

    let (result, frames) = render(&composer(), &page, CancelSignal::never()).await;
    assert!(matches!(result, Err(EngineError::Config(_))));
    assert!(frames.is_empty());
}

// === Timeout Tests ===

#[tokio::test(start_paused = true)]
async fn test_timed_out_region_is_degraded() {
    let stuck = Region::builder(
        "stuck",
        SimulatedSource::new("stuck", json!(1)).with_delay(Duration::from_secs(60)),
    )
    .timeout(Duration::from_millis(100))
    .fallback("<p>still loading</p>")
    .build();
    let page = Page::new("stuck", shell("stuck"))
        .with_region(stuck)
        .with_region(region("ok", 10));

    let (result, frames) = render(&composer(), &page, CancelSignal::never()).await;
    let metrics = result.unwrap();

    assert_eq!(metrics.degraded_count(), 1);
    assert_eq!(metrics.resolved_count(), 1);
    assert!(frames[2].contains(r#"data-outcome="degraded""#));
    assert!(frames[2].contains("<p>still loading</p>"));
}

// === Singleflight Tests ===

async fn concurrent_pages(policy: CachePolicy) -> usize {
    let composer = composer();
    let source = SimulatedSource::new("todo", json!({ "title": "delectus" }))
        .with_delay(Duration::from_millis(100));
    let counter = source.counter();
    let page = Page::new("todo", shell("todo")).with_region(
        Region::builder("todo", source)
            .key("todos/1")
            .policy(policy)
            .build(),
    );

    let mut handles = Vec::new();
    for _ in 0..10 {
        let composer = composer.clone();
        let page = page.clone();
        handles.push(tokio::spawn(async move {
            let (result, frames) = render(&composer, &page, CancelSignal::never()).await;
            result.unwrap();
            frames
        }));
    }
    for handle in handles {
        let frames = handle.await.unwrap();
        assert!(frames[1].contains("delectus"));
    }
    counter.get()
}

#[tokio::test(start_paused = true)]
async fn test_timed_singleflight_across_pages() {
    assert_eq!(concurrent_pages(CachePolicy::timed(Duration::from_secs(10))).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_always_fresh_singleflight_across_pages() {
    assert_eq!(concurrent_pages(CachePolicy::AlwaysFresh).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_singleflight_across_pages_on_worker_threads() {
    let composer = composer();
    let source = SimulatedSource::new("todo", json!({ "title": "delectus" }))
        .with_delay(Duration::from_millis(50));
    let counter = source.counter();
    let page = Page::new("todo", shell("todo")).with_region(
        Region::builder("todo", source)
            .key("todos/1")
            .policy(CachePolicy::timed(Duration::from_secs(10)))
            .build(),
    );

    let pages = 24;
    let barrier = std::sync::Arc::new(tokio::sync::Barrier::new(pages));
    let mut handles = Vec::new();
    for _ in 0..pages {
        let composer = composer.clone();
        let page = page.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let (result, frames) = render(&composer, &page, CancelSignal::never()).await;
            result.unwrap();
            frames
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap()[1].contains("delectus"));
    }
    assert_eq!(counter.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timed_page_reuses_value_fetched_for_always_fresh_page() {
    let composer = composer();
    let source = SimulatedSource::new("todo", json!({ "title": "delectus" }))
        .with_delay(Duration::from_millis(100));
    let counter = source.counter();
    let todo = |policy| {
        Region::builder("todo", source.clone())
            .key("todos/1")
            .policy(policy)
            .build()
    };
    let ssr = Page::new("ssr", shell("ssr")).with_region(todo(CachePolicy::AlwaysFresh));
    let isr = Page::new("isr", shell("isr"))
        .with_region(todo(CachePolicy::timed(Duration::from_secs(10))));

    let ssr_render = {
        let composer = composer.clone();
        tokio::spawn(async move { render(&composer, &ssr, CancelSignal::never()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (first, _) = render(&composer, &isr, CancelSignal::never()).await;
    assert_eq!(first.unwrap().regions[0].cache, Some(CacheStatus::Coalesced));
    ssr_render.await.unwrap().0.unwrap();

    let (second, frames) = render(&composer, &isr, CancelSignal::never()).await;
    assert_eq!(second.unwrap().regions[0].cache, Some(CacheStatus::Hit));
    assert!(frames[1].contains("delectus"));
    assert_eq!(counter.get(), 1);
}

// === Stale-While-Revalidate Tests ===

#[tokio::test(start_paused = true)]
async fn test_stale_while_revalidate_through_pages() {
    let composer = composer();
    let source = SimulatedSource::new("todo", json!({ "title": "todo" }))
        .with_delay(Duration::from_millis(100))
        .stamped();
    let counter = source.counter();
    let page = Page::new("isr", shell("isr")).with_region(
        Region::builder("todo", source)
            .policy(CachePolicy::timed(Duration::from_secs(10)))
            .renderer(FieldRenderer::new("fetch"))
            .build(),
    );

    // t=0
    let (first, frames) = render(&composer, &page, CancelSignal::never()).await;
    assert_eq!(first.unwrap().regions[0].cache, Some(CacheStatus::Miss));
    assert!(frames[1].contains("<p>1</p>"));

    // t=5
    tokio::time::advance(Duration::from_secs(5)).await;
    let (fresh, frames) = render(&composer, &page, CancelSignal::never()).await;
    assert_eq!(fresh.unwrap().regions[0].cache, Some(CacheStatus::Hit));
    assert!(frames[1].contains("<p>1</p>"));
    assert_eq!(counter.get(), 1);

    // t=11
    tokio::time::advance(Duration::from_secs(6)).await;
    let (stale, frames) = render(&composer, &page, CancelSignal::never()).await;
    let stale = stale.unwrap();
    assert_eq!(stale.regions[0].cache, Some(CacheStatus::Stale));
    assert!(stale.regions[0].refresh_triggered);
    assert!(frames[1].contains("<p>1</p>"));

    // t=12
    tokio::time::sleep(Duration::from_secs(1)).await;
    let (refreshed, frames) = render(&composer, &page, CancelSignal::never()).await;
    assert_eq!(refreshed.unwrap().regions[0].cache, Some(CacheStatus::Hit));
    assert!(frames[1].contains("<p>2</p>"));
    assert_eq!(counter.get(), 2);
}

// === Metrics Tests ===

#[tokio::test(start_paused = true)]
async fn test_region_metrics_measure_resolution() {
    let page = Page::new("timed", shell("timed"))
        .with_region(region("slow", 300))
        .with_region(region("fast", 10));

    let (result, _) = render(&composer(), &page, CancelSignal::never()).await;
    let metrics = result.unwrap();

    let slow = metrics.regions.iter().find(|r| r.region == "slow").unwrap();
    let fast = metrics.regions.iter().find(|r| r.region == "fast").unwrap();
    assert!(slow.resolve_us >= 300_000);
    assert!(fast.resolve_us >= 10_000);
    assert!(fast.resolve_us < slow.resolve_us);
}

// === Cancellation Tests ===

#[tokio::test(start_paused = true)]
async fn test_cancellation_keeps_emitted_chunks() {
    let page = Page::new("partial", shell("partial"))
        .with_region(region("fast", 10))
        .with_region(region("slow", 3_000));

    let (handle, signal) = cancel_pair();
    handle.cancel_after(Duration::from_millis(100));
    let (result, frames) = render(&composer(), &page, signal).await;
    let metrics = result.unwrap();

    assert_eq!(metrics.status, PageStatus::Cancelled);
    assert_eq!(metrics.unresolved, vec!["slow".to_string()]);
    assert_eq!(frames.len(), 3);
    assert!(frames[1].contains(r#"data-region-chunk="fast""#));
    assert!(frames[2].starts_with(wire::CANCELLED_MARKER));
    assert!(frames.iter().all(|f| !f.contains(r#"data-region-chunk="slow""#)));
}

#[tokio::test(start_paused = true)]
async fn test_page_deadline_ends_stream() {
    let config = EngineConfig {
        page_deadline_ms: Some(200),
        ..EngineConfig::default()
    };
    let composer = PageComposer::from_config(&config);
    let page = Page::new("deadline", shell("deadline")).with_region(region("slow", 4_000));

    let chunks: Vec<Chunk> = composer
        .compose(&page, CancelSignal::never())
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1], Chunk::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_client_deferred_region_only_gets_placeholder() {
    let deferred = Region::builder("cart", SimulatedSource::new("cart", json!([])))
        .policy(CachePolicy::ClientDeferred)
        .fallback("<p>cart loads in the browser</p>")
        .build();
    let page = Page::new("csr", shell("csr"))
        .with_region(deferred)
        .with_region(region("hero", 10));

    let chunks: Vec<Chunk> = composer()
        .compose(&page, CancelSignal::never())
        .unwrap()
        .collect()
        .await;

    let Chunk::Shell { html, .. } = &chunks[0] else {
        panic!("shell first");
    };
    assert!(html.contains("<p>cart loads in the browser</p>"));
    assert_eq!(chunks.len(), 3);
    let Chunk::Region(hero) = &chunks[1] else {
        panic!("region chunk after shell");
    };
    assert_eq!(hero.region.as_str(), "hero");
    assert_eq!(hero.kind, OutcomeKind::Resolved);
}
