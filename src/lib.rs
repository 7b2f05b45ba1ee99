pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod intervention;
pub mod models;
pub mod mood;
pub mod normalize;
pub mod prediction;
pub mod reconcile;
pub mod report;
pub mod risk;
pub mod telemetry;

pub use engine::RiskEngine;
pub use reconcile::{assess_with_fallback, reconcile, summarize};
