use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::api::{ApiError, PortalApi, RequestOptions};
use crate::models::FundTarget;

/// Portal path of the fund target collection
pub const FUND_TARGETS_PATH: &str = "fundTargets/";

#[derive(Debug, Clone)]
struct Loaded {
    targets: HashMap<String, FundTarget>,
    loaded_at: DateTime<Utc>,
}

/// Fund targets keyed by code, fetched at most once until invalidated.
#[derive(Debug, Clone, Default)]
pub struct FundTargetCache {
    loaded: Option<Loaded>,
}

impl FundTargetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache without a portal call
    pub fn from_targets(targets: impl IntoIterator<Item = FundTarget>) -> Self {
        let mut cache = Self::new();
        cache.store(targets);
        cache
    }

    fn store(&mut self, targets: impl IntoIterator<Item = FundTarget>) {
        let targets = targets
            .into_iter()
            .map(|t| (t.code.clone(), t))
            .collect();
        self.loaded = Some(Loaded {
            targets,
            loaded_at: Utc::now(),
        });
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded.as_ref().map(|l| l.loaded_at)
    }

    /// Fetch targets from the portal unless already loaded.
    /// Returns false when the portal gave no data; nothing is memoised then,
    /// so a later call tries again.
    pub async fn load(&mut self, api: &PortalApi) -> Result<bool, ApiError> {
        if self.is_loaded() {
            return Ok(true);
        }

        match api.get::<Vec<FundTarget>>(RequestOptions::new()).await?.into_data() {
            Some(targets) => {
                debug!(count = targets.len(), "Loaded fund targets");
                self.store(targets);
                Ok(true)
            }
            None => {
                warn!(url = api.url(), "Fund targets unavailable");
                Ok(false)
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&FundTarget> {
        self.loaded.as_ref()?.targets.get(code)
    }

    pub fn url_for(&self, code: &str) -> Option<&str> {
        self.get(code)?.url.as_deref()
    }

    pub fn len(&self) -> usize {
        self.loaded.as_ref().map(|l| l.targets.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the memoised targets so the next `load` refetches
    pub fn invalidate(&mut self) {
        self.loaded = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
