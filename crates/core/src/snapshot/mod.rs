pub mod build;
pub mod loader;
pub mod location;
pub mod source;

pub use loader::SnapshotLoader;
pub use location::{snapshot_url, SNAPSHOT_RELATIVE_PATH};
pub use source::{FileSnapshotSource, HttpSnapshotSource, SnapshotSource};

use crate::config::Settings;

/// Snapshot source for the configured environment: a local file when
/// `SENTIMENT_SNAPSHOT_FILE` is set, otherwise the page-relative URL.
pub fn source_from_settings(
    settings: &Settings,
    http: reqwest::Client,
) -> anyhow::Result<Box<dyn SnapshotSource>> {
    Ok(match &settings.snapshot_file {
        Some(path) => Box::new(FileSnapshotSource::new(path)),
        None => Box::new(HttpSnapshotSource::for_page(http, settings.require_page_url()?)?),
    })
}
