//! Page acquisition
//!
//! Every page is acquired independently and reports into a
//! [`CompletionGate`]. A failed page becomes a placeholder and still counts,
//! so completion fires once all pages reached a terminal state. Only the
//! fallback document itself being unavailable or empty is fatal.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::ViewerConfig;
use crate::error::{RenderError, SurfaceError, ViewerError};
use crate::fetch::{fetch_within, AssetFetcher};
use crate::gate::{CompletionGate, GateWaiter};
use crate::layout::{
    compute_layout, DeviceProfile, DisplayMode, Viewport, DEFAULT_ASPECT_RATIO,
};
use crate::renderer::{VectorBackend, VectorDocument};
use crate::resolver::SourceKind;
use crate::surface::{decode_image_blocking, PageAsset, PageSize, PageSurface};

/// Smallest pixels-per-point used for vector pages
const MIN_RENDER_SCALE: f32 = 0.1;

/// All page surfaces of a catalog, in page order
#[derive(Debug, Clone)]
pub struct LoadedPages {
    pub kind: SourceKind,
    pub pages: Vec<PageAsset>,
    /// Size of page 1, when page 1 loaded
    pub natural_size: Option<PageSize>,
    /// Reference width / height for the whole catalog
    pub aspect_ratio: f32,
}

impl LoadedPages {
    /// The reference size always comes from page 1, never from whichever
    /// page happened to finish first.
    pub fn from_pages(kind: SourceKind, pages: Vec<PageAsset>) -> Self {
        let natural_size = pages
            .first()
            .filter(|asset| asset.index == 1)
            .and_then(|asset| asset.surface.size());
        let aspect_ratio = natural_size
            .and_then(|size| size.aspect_ratio())
            .unwrap_or(DEFAULT_ASPECT_RATIO);
        Self {
            kind,
            pages,
            natural_size,
            aspect_ratio,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|asset| asset.surface.is_placeholder())
            .count()
    }
}

async fn load_raster_page<F: AssetFetcher>(
    fetcher: &F,
    url: String,
    timeout: Option<Duration>,
) -> Result<RgbaImage, SurfaceError> {
    let bytes = fetch_within(fetcher, &url, timeout).await?;
    decode_image_blocking(url, bytes).await
}

/// Load `page_count` pre-rendered page images concurrently. `first_page`
/// is page 1 when the resolver already decoded it.
pub async fn load_raster<F: AssetFetcher>(
    config: &ViewerConfig,
    catalog: &str,
    page_count: usize,
    first_page: Option<RgbaImage>,
    fetcher: Arc<F>,
) -> LoadedPages {
    let timeout = config.load_timeout();
    let (gate, waiter) = CompletionGate::new(page_count);

    let mut next = 1;
    if let Some(img) = first_page.filter(|_| page_count > 0) {
        debug!("page 1 taken from the probe ({}x{})", img.width(), img.height());
        gate.complete(0, PageAsset {
            index: 1,
            surface: PageSurface::Image(img),
        });
        next = 2;
    }

    let mut tasks = JoinSet::new();
    for page in next..=page_count {
        let gate = gate.clone();
        let fetcher = Arc::clone(&fetcher);
        let url = config.page_url(catalog, page);
        tasks.spawn(async move {
            let surface = match load_raster_page(fetcher.as_ref(), url, timeout).await {
                Ok(img) => {
                    debug!("page {} loaded ({}x{})", page, img.width(), img.height());
                    PageSurface::Image(img)
                }
                Err(e) => {
                    warn!("page {} replaced by placeholder: {}", page, e);
                    PageSurface::placeholder(page, e)
                }
            };
            gate.complete(page - 1, PageAsset {
                index: page,
                surface,
            });
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("page load task failed: {}", e);
        }
    }
    // A task that died never reported; only its own slot is affected.
    let abandoned = gate.fill_remaining(|slot| PageAsset {
        index: slot + 1,
        surface: PageSurface::placeholder(slot + 1, "load abandoned"),
    });
    if abandoned > 0 {
        warn!("{}: {} page loads abandoned", catalog, abandoned);
    }
    drop(gate);

    let pages = waiter.wait().await.unwrap_or_default();
    let loaded = LoadedPages::from_pages(SourceKind::Rasterized, pages);
    info!(
        "{}: {} pages ready, {} placeholders",
        catalog,
        loaded.page_count(),
        loaded.placeholder_count()
    );
    loaded
}

/// Pixels per point that make `page` fill the single-page frame
pub fn vector_scale(
    page: PageSize,
    viewport: Viewport,
    profile: &DeviceProfile,
    density: f32,
) -> f32 {
    let ratio = page.aspect_ratio().unwrap_or(DEFAULT_ASPECT_RATIO);
    let frame = compute_layout(viewport, ratio, profile, DisplayMode::Single);
    let scale = frame.width / page.width * density;
    if scale.is_finite() {
        scale.max(MIN_RENDER_SCALE)
    } else {
        MIN_RENDER_SCALE
    }
}

fn render_vector_page(
    doc: &dyn VectorDocument,
    page: usize,
    viewport: Viewport,
    profile: &DeviceProfile,
    density: f32,
) -> Result<RgbaImage, RenderError> {
    let size = doc.page_size(page)?;
    let scale = vector_scale(size, viewport, profile, density);
    doc.render_page(page, scale)
}

/// Render every page of an open document into the gate. `None` when the
/// document has no pages.
fn render_all(
    doc: &dyn VectorDocument,
    viewport: Viewport,
    profile: &DeviceProfile,
    density: f32,
) -> Option<GateWaiter<PageAsset>> {
    let page_count = doc.page_count();
    if page_count == 0 {
        return None;
    }
    let (gate, waiter) = CompletionGate::new(page_count);
    for page in 1..=page_count {
        let surface = match render_vector_page(doc, page, viewport, profile, density) {
            Ok(img) => {
                debug!("page {} rendered ({}x{})", page, img.width(), img.height());
                PageSurface::Image(img)
            }
            Err(e) => {
                warn!("page {} replaced by placeholder: {}", page, e);
                PageSurface::placeholder(page, e)
            }
        };
        gate.complete(page - 1, PageAsset {
            index: page,
            surface,
        });
    }
    Some(waiter)
}

/// Fetch the original document and render all of its pages
pub async fn load_vector<F: AssetFetcher, B: VectorBackend>(
    config: &ViewerConfig,
    document_url: &str,
    fetcher: &F,
    backend: Arc<B>,
    viewport: Viewport,
    profile: DeviceProfile,
) -> Result<LoadedPages, ViewerError> {
    let bytes = fetch_within(fetcher, document_url, config.load_timeout())
        .await
        .map_err(|source| ViewerError::DocumentUnavailable {
            url: document_url.to_string(),
            source,
        })?;
    debug!("{}: {} bytes fetched", document_url, bytes.len());

    let density = config.render_density;
    let rendered = tokio::task::spawn_blocking(move || {
        backend.with_document(&bytes, |doc| render_all(doc, viewport, &profile, density))
    })
    .await
    .map_err(|e| RenderError::Open(format!("render task failed: {e}")))??;

    let waiter = rendered.ok_or_else(|| ViewerError::EmptyDocument {
        url: document_url.to_string(),
    })?;
    // Every slot is filled by now, so this resolves immediately.
    let pages = waiter.wait().await.unwrap_or_default();
    let loaded = LoadedPages::from_pages(SourceKind::VectorFallback, pages);
    info!(
        "{}: {} pages rendered, {} placeholders",
        document_url,
        loaded.page_count(),
        loaded.placeholder_count()
    );
    Ok(loaded)
}
