//! Live view of the fitted pair
//!
//! The cheap per-tick half of the dual cadence: an atomically swapped cache
//! of the current model plus frozen rolling window, and the level-triggered
//! alert check over its snapshots.

mod alert;
mod cache;

pub use alert::{AlertEvaluator, AlertMode, AlertState, BreachDirection};
pub use cache::{FrozenWindow, LiveStats, LiveStatsCache};
