//! In-memory collaborators for tests

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Mutex;

use image::{Rgba, RgbaImage};

use crate::config::ViewerConfig;
use crate::error::{FetchError, RenderError};
use crate::fetch::AssetFetcher;
use crate::renderer::{VectorBackend, VectorDocument};
use crate::surface::PageSize;

/// Configuration pointing every URL at the `mem://` scheme
pub fn test_config() -> ViewerConfig {
    ViewerConfig {
        manifest_url: "mem://api/manifest".to_string(),
        asset_base: "mem://processed".to_string(),
        document_base: "mem://uploads".to_string(),
        load_timeout_secs: 5,
        ..ViewerConfig::default()
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encoding a PNG in memory cannot fail");
    bytes
}

/// Serves registered URLs; everything else answers 404
#[derive(Default)]
pub struct MemoryFetcher {
    assets: HashMap<String, Vec<u8>>,
    stalled: HashSet<String>,
    panicking: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.assets.insert(url.to_string(), bytes);
        self
    }

    /// Requests for `url` never complete
    pub fn stalled(mut self, url: &str) -> Self {
        self.stalled.insert(url.to_string());
        self
    }

    /// Requests for `url` panic, as a crashed load task would
    pub fn panicking(mut self, url: &str) -> Self {
        self.panicking.insert(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl AssetFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.stalled.contains(url) {
            std::future::pending::<()>().await;
        }
        if self.panicking.contains(url) {
            panic!("fetcher crashed on {url}");
        }
        self.assets
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Vector backend producing solid bitmaps of the requested scale
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    pub pages: Vec<PageSize>,
    /// 1-based pages whose rendering fails
    pub failing: Vec<usize>,
    pub unopenable: bool,
}

impl FakeBackend {
    pub fn a4(pages: usize) -> Self {
        Self {
            pages: vec![PageSize::new(595.0, 842.0); pages],
            ..Self::default()
        }
    }
}

impl VectorDocument for FakeBackend {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<PageSize, RenderError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .copied()
            .ok_or(RenderError::Page {
                page,
                reason: "no such page".to_string(),
            })
    }

    fn render_page(&self, page: usize, scale: f32) -> Result<RgbaImage, RenderError> {
        if self.failing.contains(&page) {
            return Err(RenderError::Page {
                page,
                reason: "broken content stream".to_string(),
            });
        }
        let size = self.page_size(page)?;
        let width = (size.width * scale).round().max(1.0) as u32;
        let height = (size.height * scale).round().max(1.0) as u32;
        Ok(RgbaImage::new(width, height))
    }
}

impl VectorBackend for FakeBackend {
    fn with_document<R>(
        &self,
        bytes: &[u8],
        f: impl FnOnce(&dyn VectorDocument) -> R,
    ) -> Result<R, RenderError> {
        if self.unopenable || !bytes.starts_with(b"%PDF") {
            return Err(RenderError::Open("not a PDF".to_string()));
        }
        Ok(f(self))
    }
}
