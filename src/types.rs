use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Upstream observation
// ---------------------------------------------------------------------------

/// Latest observation for one series as reported upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: String,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Batch results
// ---------------------------------------------------------------------------

/// Outcome of one catalog insert batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsertReport {
    /// Ids that were not in the catalog before.
    pub inserted: usize,
    /// Ids already present (ignored).
    pub existing: usize,
    /// `(series_id, error)` for ids whose insert failed.
    pub failed: Vec<(String, String)>,
}

/// Result of a catalog fetch followed by an insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSync {
    pub fetched: usize,
    pub report: InsertReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Updated { date: String, value: f64 },
    Failed { error: String },
}

/// What happened to one series during an update run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesOutcome {
    #[serde(rename = "seriesId")]
    pub series_id: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl SeriesOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self.status, OutcomeStatus::Updated { .. })
    }
}

/// Per-series outcomes of one update-latest run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateReport {
    pub outcomes: Vec<SeriesOutcome>,
}

impl UpdateReport {
    pub fn updated(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_updated()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SeriesOutcome> {
        self.outcomes.iter().filter(|o| !o.is_updated())
    }
}
