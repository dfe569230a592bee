use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use catalog_viewer::config::{DeviceSetting, ViewerConfig};

/// Paginated viewer for intranet catalogs
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Catalog identifier, as listed in the manifest
    catalog: String,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    manifest_url: Option<String>,

    /// Base URL of the pre-rendered page images
    #[arg(long)]
    asset_base: Option<String>,

    /// Base URL of the original documents
    #[arg(long)]
    document_base: Option<String>,

    #[arg(long, value_enum)]
    device: Option<DeviceSetting>,

    /// Per-asset load timeout, 0 to wait forever
    #[arg(long)]
    load_timeout_secs: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<(ViewerConfig, String)> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::from_file(path)?,
            None => ViewerConfig::default(),
        };
        if let Some(url) = self.manifest_url {
            config.manifest_url = url;
        }
        if let Some(base) = self.asset_base {
            config.asset_base = base;
        }
        if let Some(base) = self.document_base {
            config.document_base = base;
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(secs) = self.load_timeout_secs {
            config.load_timeout_secs = secs;
        }
        Ok((config, self.catalog))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("catalog_viewer=debug,info")),
        )
        .init();

    let (config, catalog) = Args::parse().into_config()?;
    tracing::info!("manifest: {}", config.manifest_url);

    catalog_viewer::shell::run(config, catalog)?;
    Ok(())
}
