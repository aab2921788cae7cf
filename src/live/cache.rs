//! Live statistics cache

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;

use crate::analytics::{AnalyticsError, HedgeModel};

/// Rolling mean/std pair frozen from the latest batch run.
///
/// Live z-scores are measured against this window until the next batch fit
/// replaces it; per-tick updates never slide it forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrozenWindow {
    /// Rolling mean at the last defined batch point
    pub mean: f64,
    /// Rolling sample deviation at the last defined batch point
    pub std: f64,
    /// Timestamp of the batch point the pair was taken from
    pub as_of: DateTime<Utc>,
}

/// Immutable snapshot of the live view, published per tick pair
#[derive(Debug, Clone)]
pub struct LiveStats {
    /// Model the spread was computed under; weak so a stale snapshot
    /// cannot keep a superseded model alive
    pub model_ref: Weak<HedgeModel>,
    /// Most recent X-leg price
    pub latest_price_x: Decimal,
    /// Most recent Y-leg price
    pub latest_price_y: Decimal,
    /// Spread of the latest pair under the current model
    pub latest_spread: f64,
    /// Z-score against the frozen window; None when undefined
    pub latest_z_score: Option<f64>,
    /// Snapshot creation time
    pub computed_at: DateTime<Utc>,
}

struct CacheState {
    model: Option<Arc<HedgeModel>>,
    frozen: Option<FrozenWindow>,
    snapshot: Option<Arc<LiveStats>>,
}

/// Shared cache reconciling the batch and live cadences.
///
/// `replace_model` swaps in a freshly fitted model and frozen window
/// atomically; `update` is the O(1) per-tick path. Readers only ever see a
/// snapshot that was complete under some model. A failed update leaves the
/// previous snapshot in place.
pub struct LiveStatsCache {
    state: RwLock<CacheState>,
}

impl LiveStatsCache {
    /// Empty cache; live queries fail with ModelNotReady until the first fit
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState {
                model: None,
                frozen: None,
                snapshot: None,
            }),
        }
    }

    /// Install the model and frozen window from a successful batch run.
    ///
    /// The previous snapshot stays readable until the next update publishes
    /// one computed under the new model.
    pub async fn replace_model(&self, model: Arc<HedgeModel>, frozen: Option<FrozenWindow>) {
        let mut state = self.state.write().await;
        state.model = Some(model);
        state.frozen = frozen;
    }

    /// Recompute the live view for the latest price pair
    pub async fn update(
        &self,
        price_x: Decimal,
        price_y: Decimal,
    ) -> Result<Arc<LiveStats>, AnalyticsError> {
        let mut state = self.state.write().await;
        let model = state
            .model
            .as_ref()
            .ok_or(AnalyticsError::ModelNotReady)?
            .clone();
        let spread = model.spread(price_x, price_y)?;
        let z_score = state.frozen.as_ref().and_then(|w| {
            if w.std > 0.0 {
                Some((spread - w.mean) / w.std)
            } else {
                None
            }
        });
        let stats = Arc::new(LiveStats {
            model_ref: Arc::downgrade(&model),
            latest_price_x: price_x,
            latest_price_y: price_y,
            latest_spread: spread,
            latest_z_score: z_score,
            computed_at: Utc::now(),
        });
        state.snapshot = Some(stats.clone());
        Ok(stats)
    }

    /// Latest published snapshot, if any
    pub async fn snapshot(&self) -> Option<Arc<LiveStats>> {
        self.state.read().await.snapshot.clone()
    }

    /// Currently installed model, if any
    pub async fn model(&self) -> Option<Arc<HedgeModel>> {
        self.state.read().await.model.clone()
    }

    /// True once a model has been installed
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.model.is_some()
    }
}

impl Default for LiveStatsCache {
    fn default() -> Self {
        Self::new()
    }
}
