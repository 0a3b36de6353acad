use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::Observation;

/// Client for the upstream series catalog and latest-observation endpoints.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    series_url: String,
    obs_url: String,
}

impl Fetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_urls(
            &cfg.series_url,
            &cfg.obs_url,
            Duration::from_secs(cfg.fetch_timeout_secs),
        )
    }

    pub fn with_urls(series_url: &str, obs_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            series_url: series_url.to_string(),
            obs_url: obs_url.to_string(),
        })
    }

    /// GET the catalog and return every `seriesId` in upstream order.
    pub async fn fetch_series_catalog(&self) -> Result<Vec<String>> {
        let resp: serde_json::Value = self
            .client
            .get(&self.series_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let ids = parse_catalog(&resp)?;
        debug!(count = ids.len(), "Fetched series catalog");
        Ok(ids)
    }

    /// GET `obs_url + series_id` and return its date and numeric value.
    pub async fn fetch_latest_observation(&self, series_id: &str) -> Result<Observation> {
        let url = format!("{}{}", self.obs_url, series_id);
        let resp: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(series_id, payload = %resp, "Fetched latest observation");
        parse_observation(series_id, &resp)
    }
}

/// Extract `seriesId` from each object of a catalog array. One malformed
/// item fails the whole catalog.
pub fn parse_catalog(v: &serde_json::Value) -> Result<Vec<String>> {
    let items = v
        .as_array()
        .ok_or_else(|| AppError::Payload("series catalog was not an array".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.get("seriesId")
                .and_then(|s| s.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    AppError::Payload(format!("catalog item {i} has no string seriesId"))
                })
        })
        .collect()
}

pub fn parse_observation(series_id: &str, v: &serde_json::Value) -> Result<Observation> {
    let date = v
        .get("date")
        .and_then(|d| d.as_str())
        .ok_or_else(|| {
            AppError::Payload(format!("observation for {series_id} has no string date"))
        })?
        .to_string();

    let raw = v.get("value").unwrap_or(&serde_json::Value::Null);
    let value = coerce_value(raw).ok_or_else(|| AppError::Value {
        series_id: series_id.to_string(),
        raw: raw.to_string(),
    })?;

    Ok(Observation { date, value })
}

/// Numbers pass through; numeric strings are parsed. Non-finite results are
/// rejected since SQLite stores NaN as NULL.
fn coerce_value(v: &serde_json::Value) -> Option<f64> {
    let n = v
        .as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))?;
    n.is_finite().then_some(n)
}
