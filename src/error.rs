use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Unexpected upstream payload: {0}")]
    Payload(String),

    #[error("Non-numeric value for {series_id}: {raw}")]
    Value { series_id: String, raw: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Coarse error class used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Fetch(_) | AppError::Payload(_) => "fetch",
            AppError::Value { .. } => "value",
            AppError::Database(_) | AppError::Migration(_) => "storage",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // Every kind maps to 500; the message carries the detail.
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
