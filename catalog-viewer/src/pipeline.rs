use std::sync::Arc;

use tracing::{error, info};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::fetch::AssetFetcher;
use crate::layout::{DeviceProfile, Viewport};
use crate::loader::{load_raster, load_vector, LoadedPages};
use crate::renderer::VectorBackend;
use crate::resolver::{resolve, AssetSource, SourceKind};

/// A catalog as resolved for one viewer session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub id: String,
    pub page_count: usize,
    pub source: SourceKind,
}

#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub pages: LoadedPages,
}

/// Resolve where the catalog's pages come from, then acquire all of them.
///
/// `viewport` and `profile` size vector-rendered pages; raster pages are
/// used at their natural size.
pub async fn open_catalog<F: AssetFetcher, B: VectorBackend>(
    config: &ViewerConfig,
    catalog: &str,
    fetcher: Arc<F>,
    backend: Arc<B>,
    viewport: Viewport,
    profile: DeviceProfile,
) -> Result<LoadedCatalog, ViewerError> {
    let source = resolve(config, catalog, fetcher.as_ref()).await;
    let kind = source.kind();
    let pages = match source {
        AssetSource::Rasterized {
            page_count,
            first_page,
            ..
        } => load_raster(config, catalog, page_count, first_page, fetcher).await,
        AssetSource::VectorFallback { document_url } => {
            load_vector(
                config,
                &document_url,
                fetcher.as_ref(),
                backend,
                viewport,
                profile,
            )
            .await
            .inspect_err(|e| error!("{}: {}", catalog, e))?
        }
    };

    info!(
        "{}: opened {} pages via {:?}",
        catalog,
        pages.page_count(),
        kind
    );
    Ok(LoadedCatalog {
        catalog: Catalog {
            id: catalog.to_string(),
            page_count: pages.page_count(),
            source: kind,
        },
        pages,
    })
}
