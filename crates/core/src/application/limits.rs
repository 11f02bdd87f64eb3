// Limit reconciliation - pulls configured ceilings onto the registry

use crate::application::UsageRegistry;
use crate::error::Result;
use crate::port::LimitProvider;
use std::sync::Arc;
use tracing::info;

/// Pulls the current limit set from a [`LimitProvider`] and hands it to the
/// registry. One shot per call; scheduling and retry policy belong to the
/// caller.
pub struct LimitReconciler {
    provider: Arc<dyn LimitProvider>,
}

impl LimitReconciler {
    pub fn new(provider: Arc<dyn LimitProvider>) -> Self {
        Self { provider }
    }

    /// Load limits and apply them registry-wide. Returns how many tree/entry
    /// applications happened (zero when no tree is live yet; the stored set
    /// still reaches trees created later).
    pub async fn reconcile(&self, registry: &UsageRegistry) -> Result<usize> {
        let entries = self.provider.load_limits().await?;
        let loaded = entries.len();
        let applied = registry.replace_limits(entries)?;
        info!(loaded, applied, "limit configuration reconciled");
        Ok(applied)
    }
}
