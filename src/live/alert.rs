//! Z-score threshold alerts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cache::LiveStats;

/// Which side of the threshold was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreachDirection {
    /// z >= threshold: spread rich, short the spread
    Above,
    /// z <= -threshold: spread cheap, long the spread
    Below,
}

/// Which crossings count as a breach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMode {
    /// Breach on either side of the band
    Symmetric,
    /// Breach only when the spread is rich
    Above,
    /// Breach only when the spread is cheap
    Below,
}

/// Level-triggered alert evaluation; no edge detection, no history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    /// Threshold the evaluation used
    pub threshold: f64,
    /// True while the z-score sits in the breach region
    pub breached: bool,
    /// Side of the breach, when breached
    pub direction: Option<BreachDirection>,
    /// The z-score that breached, when breached
    pub z_score_at_breach: Option<f64>,
    /// Timestamp of the snapshot that was evaluated
    pub timestamp: DateTime<Utc>,
}

/// Pure threshold check over a live snapshot.
///
/// Repeated evaluations of the same snapshot re-report the same state; an
/// undefined z-score never breaches.
pub struct AlertEvaluator {
    threshold: f64,
    mode: AlertMode,
}

impl AlertEvaluator {
    /// Create an evaluator for the given threshold and mode
    pub fn new(threshold: f64, mode: AlertMode) -> Self {
        Self { threshold, mode }
    }

    /// Evaluate one snapshot
    pub fn evaluate(&self, stats: &LiveStats) -> AlertState {
        let breach = stats.latest_z_score.and_then(|z| match self.mode {
            AlertMode::Symmetric => {
                if z >= self.threshold {
                    Some((z, BreachDirection::Above))
                } else if z <= -self.threshold {
                    Some((z, BreachDirection::Below))
                } else {
                    None
                }
            }
            AlertMode::Above => (z >= self.threshold).then_some((z, BreachDirection::Above)),
            AlertMode::Below => (z <= -self.threshold).then_some((z, BreachDirection::Below)),
        });

        match breach {
            Some((z, direction)) => AlertState {
                threshold: self.threshold,
                breached: true,
                direction: Some(direction),
                z_score_at_breach: Some(z),
                timestamp: stats.computed_at,
            },
            None => AlertState {
                threshold: self.threshold,
                breached: false,
                direction: None,
                z_score_at_breach: None,
                timestamp: stats.computed_at,
            },
        }
    }
}
