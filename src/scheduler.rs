use chrono::{DateTime, Local, NaiveTime, TimeZone};
use tracing::{error, info, warn};

use crate::updater::Updater;

/// Background task that syncs the catalog and refreshes latest values once
/// a day at a fixed local wall-clock time.
///
/// No last-run state is persisted: a restart close to the trigger time can
/// skip or repeat that day's run.
pub struct DailyJob {
    updater: Updater,
    at: NaiveTime,
}

impl DailyJob {
    pub fn new(updater: Updater, at: NaiveTime) -> Self {
        Self { updater, at }
    }

    pub async fn run(self) {
        info!("Daily job scheduled for {} local time", self.at.format("%H:%M"));

        loop {
            let now = Local::now();
            let next = next_run_after(&now, self.at);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, wait_secs = wait.as_secs(), "Next daily run at {next}");

            tokio::time::sleep(wait).await;
            self.run_once().await;
        }
    }

    /// Catalog sync followed by a latest-value update. A failed sync does not
    /// prevent the update from running over the already-known catalog.
    pub async fn run_once(&self) {
        info!("Running daily job...");

        match self.updater.sync_catalog().await {
            Ok(sync) => info!(
                fetched = sync.fetched,
                inserted = sync.report.inserted,
                "Daily catalog sync: {} series fetched",
                sync.fetched,
            ),
            Err(e) => error!(kind = e.kind(), "Daily catalog sync failed: {e}"),
        }

        match self.updater.update_latest_values().await {
            Ok(report) => {
                for failed in report.failures() {
                    warn!(series_id = %failed.series_id, "Daily update skipped {}", failed.series_id);
                }
                info!(updated = report.updated(), "Daily update finished");
            }
            Err(e) => error!(kind = e.kind(), "Daily update failed: {e}"),
        }
    }
}

/// First instant strictly after `now` whose local time is `at`. Days where
/// `at` does not exist (DST gap) are skipped.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    loop {
        if let Some(candidate) = tz.from_local_datetime(&day.and_time(at)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        day = match day.succ_opt() {
            Some(d) => d,
            None => return now.clone(),
        };
    }
}
