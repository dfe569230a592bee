//! Asset resolution
//!
//! Decides how a catalog's pages are obtained: pre-rendered page images
//! when the manifest knows the catalog, a single first-page image when only
//! the probe succeeds, and client-side rendering of the original document
//! otherwise. Resolution itself never fails.

use std::time::Duration;

use image::RgbaImage;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::error::{ManifestError, SurfaceError};
use crate::fetch::{fetch_within, AssetFetcher};
use crate::surface::decode_image_blocking;

/// One record of the processed-catalog manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub name: String,
    /// `None` when absent or not an integral number
    pub pages: Option<i64>,
    pub extra: serde_json::Map<String, Value>,
}

impl ManifestEntry {
    /// Read one record. Records without a string `name` are unusable.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let name = match fields.remove("name") {
            Some(Value::String(name)) => name,
            _ => return None,
        };
        let pages = fields.remove("pages").as_ref().and_then(integral);
        Some(Self {
            name,
            pages,
            extra: fields,
        })
    }
}

/// `3` and `3.0` both count as three pages
fn integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Rasterized,
    VectorFallback,
}

/// Where a catalog's pages come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Page images under the configured asset base
    Rasterized {
        page_count: usize,
        /// Only the first-page probe succeeded, the manifest did not list it
        degraded: bool,
        /// Page 1 as decoded by the probe, so it is not loaded twice
        first_page: Option<RgbaImage>,
    },
    /// Render the original document
    VectorFallback { document_url: String },
}

impl AssetSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Rasterized { .. } => SourceKind::Rasterized,
            Self::VectorFallback { .. } => SourceKind::VectorFallback,
        }
    }
}

/// Page count listed for `catalog`, if the entry exists with a positive count
pub fn manifest_page_count(entries: &[ManifestEntry], catalog: &str) -> Option<usize> {
    entries
        .iter()
        .find(|entry| entry.name == catalog)
        .and_then(|entry| entry.pages)
        .filter(|&pages| pages > 0)
        .and_then(|pages| usize::try_from(pages).ok())
}

/// Parse a manifest body. Only a body that is not a JSON array fails;
/// malformed records are skipped one by one.
pub fn parse_manifest(body: &[u8]) -> Result<Vec<ManifestEntry>, ManifestError> {
    let records: Vec<Value> = serde_json::from_slice(body)?;
    let total = records.len();
    let entries: Vec<ManifestEntry> = records
        .into_iter()
        .filter_map(ManifestEntry::from_value)
        .collect();
    if entries.len() < total {
        debug!("manifest: skipped {} unusable records", total - entries.len());
    }
    Ok(entries)
}

pub async fn fetch_manifest<F: AssetFetcher>(
    fetcher: &F,
    url: &str,
    timeout: Option<Duration>,
) -> Result<Vec<ManifestEntry>, ManifestError> {
    let body = fetch_within(fetcher, url, timeout).await?;
    parse_manifest(&body)
}

/// Load the first page image to learn whether page assets exist at all
async fn probe_first_page<F: AssetFetcher>(
    fetcher: &F,
    url: &str,
    timeout: Option<Duration>,
) -> Result<RgbaImage, SurfaceError> {
    let bytes = fetch_within(fetcher, url, timeout).await?;
    decode_image_blocking(url.to_string(), bytes).await
}

pub async fn resolve<F: AssetFetcher>(
    config: &ViewerConfig,
    catalog: &str,
    fetcher: &F,
) -> AssetSource {
    let timeout = config.load_timeout();

    match fetch_manifest(fetcher, &config.manifest_url, timeout).await {
        Ok(entries) => {
            if let Some(page_count) = manifest_page_count(&entries, catalog) {
                info!("{}: {} pre-rendered pages listed", catalog, page_count);
                return AssetSource::Rasterized {
                    page_count,
                    degraded: false,
                    first_page: None,
                };
            }
            debug!("{}: not listed in manifest, probing first page", catalog);
        }
        Err(e) => warn!("{}: manifest unavailable ({}), probing first page", catalog, e),
    }

    let probe_url = config.page_url(catalog, 1);
    match probe_first_page(fetcher, &probe_url, timeout).await {
        Ok(image) => {
            warn!("{}: only the first page image is known to exist", catalog);
            AssetSource::Rasterized {
                page_count: 1,
                degraded: true,
                first_page: Some(image),
            }
        }
        Err(e) => {
            let document_url = config.document_url(catalog);
            info!(
                "{}: no page images ({}), rendering {}",
                catalog, e, document_url
            );
            AssetSource::VectorFallback { document_url }
        }
    }
}
