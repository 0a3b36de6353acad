pub mod models;
pub mod store;

pub use models::{HistoryEntry, SeriesRecord};
pub use store::SeriesStore;
