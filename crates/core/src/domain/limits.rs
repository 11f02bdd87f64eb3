// Queue limit settings

use crate::domain::ResourceVector;
use serde::{Deserialize, Serialize};

/// Configured ceilings for one queue.
///
/// `None` means no limit. `Some` of a zero vector or `Some(0)` applications
/// is a real, fully closed limit - the two are never conflated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLimits {
    /// Ceiling on subtree resource usage. Dimensions the vector does not
    /// define are unconstrained at this queue.
    pub max_resources: Option<ResourceVector>,
    /// Ceiling on distinct running applications counted at this queue.
    pub max_applications: Option<u32>,
}

impl QueueLimits {
    pub fn new(max_resources: Option<ResourceVector>, max_applications: Option<u32>) -> Self {
        Self {
            max_resources,
            max_applications,
        }
    }

    /// True when neither ceiling is set.
    pub fn is_unlimited(&self) -> bool {
        self.max_resources.is_none() && self.max_applications.is_none()
    }
}
