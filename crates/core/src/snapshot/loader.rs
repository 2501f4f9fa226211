use crate::domain::snapshot::Snapshot;
use crate::error::SnapshotUnavailable;
use crate::snapshot::source::SnapshotSource;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Lazily loads and memoizes the static snapshot for one client session.
///
/// The first successful `load` populates a write-once cell; concurrent callers
/// wait on the same in-flight fetch. A failed load leaves the cell empty so a
/// later call can retry.
pub struct SnapshotLoader {
    source: Box<dyn SnapshotSource>,
    cell: OnceCell<Arc<Snapshot>>,
}

impl SnapshotLoader {
    pub fn new(source: impl SnapshotSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn SnapshotSource>) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    pub fn location(&self) -> String {
        self.source.location()
    }

    pub async fn load(&self) -> Result<Arc<Snapshot>, SnapshotUnavailable> {
        self.cell
            .get_or_try_init(|| async {
                let t0 = Instant::now();
                let document = self.source.fetch().await?;
                let snapshot = Snapshot::from_json(document, chrono::Utc::now());
                let origin = snapshot.meta.as_ref().map_or("unknown", |m| m.source.as_str());
                if let Some(meta) = &snapshot.meta {
                    if meta.item_count != snapshot.feed.len() as u64 {
                        tracing::warn!(
                            declared = meta.item_count,
                            decoded = snapshot.feed.len(),
                            "snapshot feed length differs from meta.itemCount"
                        );
                    }
                }
                tracing::info!(
                    location = %self.source.location(),
                    origin,
                    generated_at = %snapshot.generated_at,
                    feed_items = snapshot.feed.len(),
                    tickers = snapshot.ticker_index.len(),
                    elapsed_ms = t0.elapsed().as_millis(),
                    "loaded static snapshot"
                );
                Ok::<_, SnapshotUnavailable>(Arc::new(snapshot))
            })
            .await
            .cloned()
    }
}

impl std::fmt::Debug for SnapshotLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotLoader")
            .field("location", &self.source.location())
            .field("loaded", &self.cell.initialized())
            .finish()
    }
}
