// Headroom - residual capacity with an explicit "no limit known" sentinel

use crate::domain::ResourceVector;

/// Residual capacity for a queue after all ancestor limits and current usage.
///
/// `Unbounded` means no ancestor on the path defined a resource limit. It is
/// never the same thing as `Limited` of a zero vector: callers must be able
/// to tell "no known limit" from "zero headroom".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Headroom {
    /// No constraint discovered anywhere on the path.
    Unbounded,
    /// Remaining capacity in the dimensions some ancestor limits. A
    /// dimension that appears in no ancestor's limit is untracked and never
    /// present here, regardless of usage.
    Limited(ResourceVector),
}

impl Headroom {
    /// Merge another level's headroom into this one.
    ///
    /// The first constraint discovered is adopted verbatim as the baseline;
    /// merging it against the sentinel would wrongly zero it. Two constrained
    /// operands merge as the minimum over the dimension union, a dimension
    /// absent from one operand being unconstrained there.
    pub fn merge(self, other: Headroom) -> Headroom {
        match (self, other) {
            (Headroom::Unbounded, h) | (h, Headroom::Unbounded) => h,
            (Headroom::Limited(a), Headroom::Limited(b)) => {
                Headroom::Limited(a.component_min(&b))
            }
        }
    }

    /// Whether an ask fits inside this headroom. Only tracked dimensions
    /// constrain; `Unbounded` fits everything.
    pub fn fits(&self, ask: &ResourceVector) -> bool {
        match self {
            Headroom::Unbounded => true,
            Headroom::Limited(room) => ask.first_dimension_over(room).is_none(),
        }
    }
}
