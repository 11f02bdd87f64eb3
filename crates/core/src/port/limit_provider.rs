// Limit configuration port

use crate::domain::QueueLimits;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configured ceilings for one queue, addressed by dotted path.
///
/// The path is rooted at `root`; splitting it into a hierarchy happens on
/// the application side, never in the tracker itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitEntry {
    pub queue_path: String,
    pub limits: QueueLimits,
}

impl LimitEntry {
    pub fn new(queue_path: impl Into<String>, limits: QueueLimits) -> Self {
        Self {
            queue_path: queue_path.into(),
            limits,
        }
    }
}

/// Source of queue limit configuration.
///
/// Implementations live in infra crates (file-backed today); the engine only
/// ever pulls, it never watches or retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LimitProvider: Send + Sync {
    /// Load the complete current limit set.
    async fn load_limits(&self) -> Result<Vec<LimitEntry>>;
}
