// Core modules
pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod persistence;
pub mod reconcile;
pub mod risk;

// Re-export commonly used types
pub use config::{AppConfig, RiskPolicy, StartupPosition};
pub use engine::{EngineSnapshot, TickOutcome, TradingEngine};
pub use error::{Result, TraderError};
pub use models::*;
