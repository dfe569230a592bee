use std::sync::Arc;

use pretty_assertions::assert_eq;

use catalog_viewer::error::{FetchError, ViewerError};
use catalog_viewer::layout::{DeviceProfile, Viewport, DEFAULT_ASPECT_RATIO};
use catalog_viewer::navigation::Command;
use catalog_viewer::resolver::SourceKind;
use catalog_viewer::surface::PageSize;
use catalog_viewer::test_support::{png_bytes, test_config, FakeBackend, MemoryFetcher};
use catalog_viewer::{open_catalog, ViewerConfig, ViewerSession};

const MANIFEST: &[u8] = br#"[
    {"name": "DEMO", "pages": 3, "category": "spring"},
    {"name": "EMPTY", "pages": 0}
]"#;

fn phone() -> Viewport {
    Viewport::new(375.0, 812.0)
}

fn demo_fetcher(config: &ViewerConfig) -> MemoryFetcher {
    MemoryFetcher::new()
        .with(&config.manifest_url, MANIFEST.to_vec())
        .with(&config.page_url("DEMO", 1), png_bytes(60, 85))
        .with(&config.page_url("DEMO", 3), png_bytes(85, 60))
}

#[tokio::test]
async fn listed_catalog_loads_every_raster_page() {
    let config = test_config();
    let fetcher = demo_fetcher(&config).with(&config.page_url("DEMO", 2), png_bytes(60, 85));

    let loaded = open_catalog(
        &config,
        "DEMO",
        Arc::new(fetcher),
        Arc::new(FakeBackend::default()),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();

    assert_eq!(loaded.catalog.source, SourceKind::Rasterized);
    assert_eq!(loaded.catalog.page_count, 3);
    assert_eq!(loaded.pages.placeholder_count(), 0);
    assert_eq!(loaded.pages.natural_size, Some(PageSize::new(60.0, 85.0)));
    assert_eq!(loaded.pages.aspect_ratio, 60.0 / 85.0);

    let session = ViewerSession::new(loaded, DeviceProfile::PHONE, phone());
    let visible: Vec<usize> = session.visible_pages().iter().map(|p| p.index).collect();
    assert_eq!(visible, vec![1]);
}

#[tokio::test]
async fn malformed_manifest_sibling_keeps_listed_page_count() {
    let config = test_config();
    let manifest = br#"[
        {"name": "DEMO", "pages": 3},
        {"name": "OTHER", "pages": 2.0},
        {"pages": 5}
    ]"#;
    let fetcher = MemoryFetcher::new()
        .with(&config.manifest_url, manifest.to_vec())
        .with(&config.page_url("DEMO", 1), png_bytes(60, 85))
        .with(&config.page_url("DEMO", 2), png_bytes(60, 85))
        .with(&config.page_url("DEMO", 3), png_bytes(60, 85));

    let loaded = open_catalog(
        &config,
        "DEMO",
        Arc::new(fetcher),
        Arc::new(FakeBackend::default()),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();

    assert_eq!(loaded.catalog.source, SourceKind::Rasterized);
    assert_eq!(loaded.catalog.page_count, 3);
    assert_eq!(loaded.pages.placeholder_count(), 0);
}

#[tokio::test]
async fn degraded_catalog_fetches_its_only_page_once() {
    let config = test_config();
    let fetcher = Arc::new(
        MemoryFetcher::new()
            .with(&config.manifest_url, MANIFEST.to_vec())
            .with(&config.page_url("EMPTY", 1), png_bytes(50, 100)),
    );

    let loaded = open_catalog(
        &config,
        "EMPTY",
        Arc::clone(&fetcher),
        Arc::new(FakeBackend::default()),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();

    assert_eq!(loaded.catalog.page_count, 1);
    assert_eq!(loaded.pages.aspect_ratio, 0.5);
    let page_requests = fetcher
        .requests()
        .iter()
        .filter(|url| **url == config.page_url("EMPTY", 1))
        .count();
    assert_eq!(page_requests, 1);
}

#[tokio::test]
async fn missing_page_becomes_placeholder_and_completion_still_fires() {
    let config = test_config();
    let fetcher = Arc::new(demo_fetcher(&config));

    let loaded = open_catalog(
        &config,
        "DEMO",
        Arc::clone(&fetcher),
        Arc::new(FakeBackend::default()),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();

    let labels: Vec<Option<String>> = loaded
        .pages
        .pages
        .iter()
        .map(|p| p.surface.label())
        .collect();
    assert_eq!(labels, vec![None, Some("Error page 2".to_string()), None]);
    let indices: Vec<usize> = loaded.pages.pages.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);

    // Manifest plus one request per page
    assert_eq!(fetcher.requests().len(), 4);
}

#[tokio::test]
async fn unknown_catalog_without_images_renders_the_original_document() {
    let config = test_config();
    let fetcher = MemoryFetcher::new()
        .with(&config.manifest_url, MANIFEST.to_vec())
        .with(&config.document_url("MISSING"), b"%PDF-1.4".to_vec());

    let loaded = open_catalog(
        &config,
        "MISSING",
        Arc::new(fetcher),
        Arc::new(FakeBackend::a4(4)),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();

    assert_eq!(loaded.catalog.source, SourceKind::VectorFallback);
    assert_eq!(loaded.catalog.page_count, 4);
    assert_eq!(loaded.pages.placeholder_count(), 0);

    let first = loaded.pages.pages[0].surface.size().unwrap();
    assert!((first.width - 375.0 * 0.92 * config.render_density).abs() <= 1.0);
}

#[tokio::test]
async fn zero_page_entry_with_no_images_falls_back() {
    let config = test_config();
    let fetcher = MemoryFetcher::new()
        .with(&config.manifest_url, MANIFEST.to_vec())
        .with(&config.document_url("EMPTY"), b"%PDF-1.4".to_vec());

    let loaded = open_catalog(
        &config,
        "EMPTY",
        Arc::new(fetcher),
        Arc::new(FakeBackend::a4(2)),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();

    assert_eq!(loaded.catalog.source, SourceKind::VectorFallback);
}

#[tokio::test]
async fn unreachable_fallback_document_is_fatal() {
    let config = test_config();
    let fetcher = MemoryFetcher::new();

    let err = open_catalog(
        &config,
        "GONE",
        Arc::new(fetcher),
        Arc::new(FakeBackend::a4(2)),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap_err();

    match &err {
        ViewerError::DocumentUnavailable { url, source } => {
            assert_eq!(url, &config.document_url("GONE"));
            assert!(matches!(source, FetchError::Status { status: 404, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("could not be loaded"));
}

#[tokio::test(start_paused = true)]
async fn stalled_page_times_out_into_a_placeholder() {
    let config = test_config();
    let fetcher = demo_fetcher(&config)
        .with(&config.page_url("DEMO", 2), png_bytes(60, 85))
        .stalled(&config.page_url("DEMO", 2));

    let loaded = open_catalog(
        &config,
        "DEMO",
        Arc::new(fetcher),
        Arc::new(FakeBackend::default()),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();

    assert_eq!(loaded.pages.page_count(), 3);
    assert!(loaded.pages.pages[1].surface.is_placeholder());
    assert!(!loaded.pages.pages[2].surface.is_placeholder());
}

#[tokio::test(start_paused = true)]
async fn stalled_manifest_falls_through_to_probe() {
    let config = test_config();
    let fetcher = MemoryFetcher::new()
        .stalled(&config.manifest_url)
        .with(&config.page_url("SOLO", 1), png_bytes(40, 40));

    let loaded = open_catalog(
        &config,
        "SOLO",
        Arc::new(fetcher),
        Arc::new(FakeBackend::default()),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();

    assert_eq!(loaded.catalog.source, SourceKind::Rasterized);
    assert_eq!(loaded.catalog.page_count, 1);
    assert_eq!(loaded.pages.aspect_ratio, 1.0);
}

#[tokio::test]
async fn first_page_failure_keeps_layout_computable() {
    let config = test_config();
    let fetcher = MemoryFetcher::new()
        .with(&config.manifest_url, MANIFEST.to_vec())
        .with(&config.page_url("DEMO", 2), png_bytes(60, 85));

    let loaded = open_catalog(
        &config,
        "DEMO",
        Arc::new(fetcher),
        Arc::new(FakeBackend::default()),
        phone(),
        DeviceProfile::PHONE,
    )
    .await
    .unwrap();
    assert_eq!(loaded.pages.aspect_ratio, DEFAULT_ASPECT_RATIO);

    let mut session = ViewerSession::new(loaded, DeviceProfile::PHONE, phone());
    let layout = session.layout();
    assert!(layout.width >= 50.0 && layout.height >= 50.0);

    // Next on the last page leaves the state untouched
    session.dispatch(Command::Next);
    session.dispatch(Command::Next);
    let before = *session.navigation();
    assert!(session.dispatch(Command::Next).is_empty());
    assert_eq!(*session.navigation(), before);
    assert_eq!(session.navigation().current_page(), 3);
}
