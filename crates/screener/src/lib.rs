//! Tollgate Screener - Population anomaly screening
//!
//! Retrained from scratch every audit cycle over all live actors:
//! 1. Sanitize and standardize each feature over the population
//! 2. Apply per-group multipliers, zeroing near-constant features
//! 3. Score with an isolation forest; negative decision = anomalous

pub mod config;
pub mod error;
pub mod forest;
pub mod screener;
pub mod standardize;

pub use config::ScreenerConfig;
pub use error::{ScreenerError, ScreenerResult};
pub use forest::IsolationForest;
pub use screener::{Diagnosis, Screener};
pub use standardize::{FeatureGroup, Standardizer};
