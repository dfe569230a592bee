//! Viewer configuration
//!
//! Settings are read from an optional JSON file and then overridden by
//! command line flags in the binary. Every field has a default, so an empty
//! object is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::layout::DeviceClass;

/// How the device class is chosen for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSetting {
    /// Pick from the initial window size
    #[default]
    Auto,
    Phone,
    Tablet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Endpoint listing every processed catalog with its page count
    pub manifest_url: String,
    /// Base URL under which pre-rendered page images live
    pub asset_base: String,
    /// Page image path relative to `asset_base`, with `{catalog}` and `{page}` placeholders
    pub page_template: String,
    /// Base URL of the original documents
    pub document_base: String,
    /// Document path relative to `document_base`, with a `{catalog}` placeholder
    pub document_template: String,
    /// Where "report a problem" sends the user, with a `{catalog}` placeholder
    pub report_url: String,
    pub device: DeviceSetting,
    /// Shorter window side (logical px) from which `auto` picks the tablet profile
    pub tablet_min_width: f32,
    /// Per-asset load timeout in seconds, 0 disables it
    pub load_timeout_secs: u64,
    /// Oversampling applied when rendering vector pages
    pub render_density: f32,
    /// Horizontal travel (px) a drag needs to count as a swipe
    pub swipe_threshold: f32,
    /// Directory holding the PDFium shared library
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            manifest_url: "http://localhost:8080/api/catalogs/processed".to_string(),
            asset_base: "http://localhost:8080/processed".to_string(),
            page_template: "{catalog}/page_{page}.jpg".to_string(),
            document_base: "http://localhost:8080/uploads".to_string(),
            document_template: "{catalog}.pdf".to_string(),
            report_url: "mailto:catalog-support@localhost?subject=Problem%20with%20catalog%20{catalog}"
                .to_string(),
            device: DeviceSetting::Auto,
            tablet_min_width: 600.0,
            load_timeout_secs: 20,
            render_density: 2.0,
            swipe_threshold: 50.0,
            pdfium_library_dir: None,
        }
    }
}

impl ViewerConfig {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON for
    /// this structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(s).context("Failed to parse config JSON")?;
        Ok(config)
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        (self.load_timeout_secs > 0).then(|| Duration::from_secs(self.load_timeout_secs))
    }

    /// URL of the pre-rendered image for a 1-based page index
    pub fn page_url(&self, catalog: &str, page: usize) -> String {
        let relative = self
            .page_template
            .replace("{catalog}", catalog)
            .replace("{page}", &page.to_string());
        join_url(&self.asset_base, &relative)
    }

    pub fn document_url(&self, catalog: &str) -> String {
        join_url(
            &self.document_base,
            &self.document_template.replace("{catalog}", catalog),
        )
    }

    pub fn report_url(&self, catalog: &str) -> String {
        self.report_url.replace("{catalog}", catalog)
    }

    /// Resolve the device class, using the window size when set to `auto`
    pub fn device_class(&self, width: f32, height: f32) -> DeviceClass {
        match self.device {
            DeviceSetting::Phone => DeviceClass::Phone,
            DeviceSetting::Tablet => DeviceClass::Tablet,
            DeviceSetting::Auto if width.min(height) >= self.tablet_min_width => {
                DeviceClass::Tablet
            }
            DeviceSetting::Auto => DeviceClass::Phone,
        }
    }
}

fn join_url(base: &str, relative: &str) -> String {
    if base.is_empty() {
        return relative.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ViewerConfig::from_json("{}").unwrap();
        assert_eq!(config.page_template, "{catalog}/page_{page}.jpg");
        assert_eq!(config.load_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(config.device, DeviceSetting::Auto);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = ViewerConfig::from_json(r#"{"load_timeout_secs": 0}"#).unwrap();
        assert_eq!(config.load_timeout(), None);
    }

    #[test]
    fn page_urls_are_one_based_and_joined_once() {
        let config = ViewerConfig {
            asset_base: "https://intranet/processed/".to_string(),
            ..ViewerConfig::default()
        };
        assert_eq!(
            config.page_url("DEMO", 1),
            "https://intranet/processed/DEMO/page_1.jpg"
        );
        assert_eq!(
            config.page_url("DEMO", 12),
            "https://intranet/processed/DEMO/page_12.jpg"
        );
    }

    #[test]
    fn document_and_report_urls_expand_catalog() {
        let config = ViewerConfig::from_json(
            r#"{
                "document_base": "https://intranet/uploads",
                "report_url": "https://intranet/report?catalog={catalog}"
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.document_url("MISSING"),
            "https://intranet/uploads/MISSING.pdf"
        );
        assert_eq!(
            config.report_url("MISSING"),
            "https://intranet/report?catalog=MISSING"
        );
    }

    #[test]
    fn auto_device_uses_shorter_side() {
        let config = ViewerConfig::default();
        assert_eq!(config.device_class(375.0, 812.0), DeviceClass::Phone);
        assert_eq!(config.device_class(812.0, 375.0), DeviceClass::Phone);
        assert_eq!(config.device_class(1024.0, 768.0), DeviceClass::Tablet);

        let forced = ViewerConfig {
            device: DeviceSetting::Tablet,
            ..ViewerConfig::default()
        };
        assert_eq!(forced.device_class(375.0, 812.0), DeviceClass::Tablet);
    }

    #[test]
    fn from_file_reads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"device": "phone", "swipe_threshold": 30.0}}"#).unwrap();

        let config = ViewerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.device, DeviceSetting::Phone);
        assert_eq!(config.swipe_threshold, 30.0);
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = ViewerConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
