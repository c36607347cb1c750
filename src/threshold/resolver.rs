use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::THRESHOLD_SETTING_KEY;
use crate::submissions::SubmissionStore;

const CACHE_CAPACITY: u64 = 10_000;

/// Resolves the flagging threshold for a tenant from its settings document.
///
/// With a non-zero TTL, resolved values are cached per tenant and may be stale for at most
/// that long. Store failures are never cached.
pub struct ThresholdResolver<S> {
    store: Arc<S>,
    default_threshold: f32,
    cache: Option<Cache<String, f32>>,
}

impl<S: SubmissionStore> ThresholdResolver<S> {
    pub fn new(store: Arc<S>, default_threshold: f32, cache_ttl: Duration) -> Self {
        let cache = (!cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(cache_ttl)
                .build()
        });

        Self {
            store,
            default_threshold,
            cache,
        }
    }

    pub fn default_threshold(&self) -> f32 {
        self.default_threshold
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub async fn resolve_threshold(&self, tenant_id: &str) -> f32 {
        if let Some(cache) = &self.cache
            && let Some(threshold) = cache.get(tenant_id)
        {
            return threshold;
        }

        let threshold = match self.store.get_tenant_settings(tenant_id).await {
            Ok(settings) => threshold_from_settings(settings.as_ref(), self.default_threshold),
            Err(e) => {
                warn!(tenant_id, error = %e, "Tenant settings unavailable, using default threshold");
                return self.default_threshold;
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(tenant_id.to_string(), threshold);
        }
        debug!(tenant_id, threshold, "Threshold resolved");
        threshold
    }
}

/// Reads `plagiarism_threshold` from a settings document.
///
/// Falls back to `default` unless the value is a finite number in `[0, 1]`.
pub fn threshold_from_settings(settings: Option<&Value>, default: f32) -> f32 {
    settings
        .and_then(|s| s.get(THRESHOLD_SETTING_KEY))
        .and_then(Value::as_f64)
        .filter(|t| t.is_finite() && (0.0..=1.0).contains(t))
        .map(|t| t as f32)
        .unwrap_or(default)
}
