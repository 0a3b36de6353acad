use std::time::Duration;

use tracing::{info, warn};

use crate::config::UpdateSettings;
use crate::db::{SeriesRecord, SeriesStore};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::types::{CatalogSync, Observation, OutcomeStatus, SeriesOutcome, UpdateReport};

/// Drives catalog syncs and latest-value refreshes against the store.
/// Shared by the HTTP handlers and the daily job.
#[derive(Clone)]
pub struct Updater {
    store: SeriesStore,
    fetcher: Fetcher,
    settings: UpdateSettings,
}

impl Updater {
    pub fn new(store: SeriesStore, fetcher: Fetcher, settings: UpdateSettings) -> Self {
        Self { store, fetcher, settings }
    }

    /// Fetch the upstream catalog and insert ids not seen before.
    pub async fn sync_catalog(&self) -> Result<CatalogSync> {
        let ids = self.fetcher.fetch_series_catalog().await?;
        let report = self.store.insert_series(&ids).await?;
        Ok(CatalogSync { fetched: ids.len(), report })
    }

    /// Refresh the latest value of one batch of catalog series.
    ///
    /// A series that fails (upstream, bad value, storage) is logged and
    /// reported, and the run moves on to the next one. After every
    /// `rate_limit_every` successes the run pauses, unless the batch is done.
    pub async fn update_latest_values(&self) -> Result<UpdateReport> {
        let catalog = self.store.list_series().await?;
        let start = if self.settings.rotate {
            self.store.load_cursor().await?
        } else {
            0
        };
        let (batch, next_offset) = select_batch(&catalog, start, self.settings.batch_size);

        let mut report = UpdateReport::default();
        let mut updated = 0usize;
        let total = batch.len();

        for (i, record) in batch.into_iter().enumerate() {
            let series_id = record.series_id.clone();
            let status = match self.update_one(&series_id).await {
                Ok(obs) => {
                    updated += 1;
                    OutcomeStatus::Updated { date: obs.date, value: obs.value }
                }
                Err(e) => {
                    warn!(series_id = %series_id, kind = e.kind(), "Failed to update {series_id}: {e}");
                    OutcomeStatus::Failed { error: e.to_string() }
                }
            };
            let succeeded = matches!(status, OutcomeStatus::Updated { .. });
            report.outcomes.push(SeriesOutcome { series_id, status });

            if succeeded && updated % self.settings.rate_limit_every == 0 && i + 1 < total {
                info!(
                    updated,
                    pause_secs = self.settings.rate_limit_pause_secs,
                    "Rate limit: pausing {}s after {updated} updates",
                    self.settings.rate_limit_pause_secs,
                );
                tokio::time::sleep(Duration::from_secs(self.settings.rate_limit_pause_secs)).await;
            }
        }

        if self.settings.rotate {
            if let Err(e) = self.store.save_cursor(next_offset).await {
                warn!("Could not persist update cursor ({next_offset}): {e}");
            }
        }

        info!(
            attempted = total,
            updated = report.updated(),
            failed = total - report.updated(),
            catalog = catalog.len(),
            "Latest values updated: {}/{total} series",
            report.updated(),
        );
        Ok(report)
    }

    async fn update_one(&self, series_id: &str) -> Result<Observation> {
        let obs = self.fetcher.fetch_latest_observation(series_id).await?;
        self.store.update_latest(series_id, &obs.date, obs.value).await?;
        Ok(obs)
    }
}

/// Pick up to `size` records starting at `start`, wrapping past the end of
/// the catalog. Returns the batch and the offset the following batch starts at.
pub fn select_batch(catalog: &[SeriesRecord], start: usize, size: usize) -> (Vec<&SeriesRecord>, usize) {
    let len = catalog.len();
    if len == 0 {
        return (Vec::new(), 0);
    }
    let start = start % len;
    let take = size.min(len);
    let batch = (0..take).map(|k| &catalog[(start + k) % len]).collect();
    (batch, (start + take) % len)
}
