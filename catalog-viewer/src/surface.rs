use std::fmt;

use image::RgbaImage;

use crate::error::SurfaceError;

/// Natural size of a page, in pixels for rasters and points for vector pages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width / height, `None` for degenerate sizes
    pub fn aspect_ratio(&self) -> Option<f32> {
        let ratio = self.width / self.height;
        (ratio.is_finite() && ratio > 0.0).then_some(ratio)
    }
}

/// Something the shell can display for a page
#[derive(Clone)]
pub enum PageSurface {
    Image(RgbaImage),
    /// Stand-in for a page that failed to load
    Placeholder { page: usize, reason: String },
}

impl PageSurface {
    pub fn placeholder(page: usize, reason: impl fmt::Display) -> Self {
        Self::Placeholder {
            page,
            reason: reason.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    /// Pixel size of an image surface
    pub fn size(&self) -> Option<PageSize> {
        match self {
            Self::Image(img) => Some(PageSize::new(img.width() as f32, img.height() as f32)),
            Self::Placeholder { .. } => None,
        }
    }

    /// Visible marker for placeholders
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Image(_) => None,
            Self::Placeholder { page, .. } => Some(format!("Error page {page}")),
        }
    }
}

impl fmt::Debug for PageSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(img) => f
                .debug_struct("Image")
                .field("width", &img.width())
                .field("height", &img.height())
                .finish(),
            Self::Placeholder { page, reason } => f
                .debug_struct("Placeholder")
                .field("page", page)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// One page of a catalog
#[derive(Debug, Clone)]
pub struct PageAsset {
    /// 1-based
    pub index: usize,
    pub surface: PageSurface,
}

pub fn decode_image(url: &str, bytes: &[u8]) -> Result<RgbaImage, SurfaceError> {
    let img = image::load_from_memory(bytes).map_err(|source| SurfaceError::Decode {
        url: url.to_string(),
        source,
    })?;
    Ok(img.to_rgba8())
}

/// [`decode_image`] on the blocking pool, keeping JPEG decoding off the
/// async workers
pub async fn decode_image_blocking(url: String, bytes: Vec<u8>) -> Result<RgbaImage, SurfaceError> {
    let task_url = url.clone();
    tokio::task::spawn_blocking(move || decode_image(&task_url, &bytes))
        .await
        .map_err(|e| SurfaceError::Interrupted {
            url,
            reason: e.to_string(),
        })?
}
