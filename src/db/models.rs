//! Row types for the `series` and `series_history` tables.
//! Serialized as-is by the HTTP API.
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SeriesRecord {
    pub id: i64,
    #[serde(rename = "seriesId")]
    pub series_id: String,
    /// Date of the latest known observation; None until the first update.
    pub date: Option<String>,
    pub latest_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(rename = "seriesId")]
    pub series_id: String,
    pub date: String,
    pub value: f64,
    /// `YYYY-MM-DD HH:MM:SS.SSS` UTC, set by the database on insert.
    pub recorded_at: String,
}
