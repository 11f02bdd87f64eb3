// QueueTracker - one node of the queue hierarchy
//
// Tracks subtree-aggregate usage and running applications per queue, enforces
// configured ceilings at every ancestor, and reclaims drained subtrees.

use crate::domain::{DomainError, Headroom, QueueLimits, ResourceVector};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Name of the queue every hierarchy starts at.
pub const ROOT_QUEUE: &str = "root";

/// One node of the queue hierarchy.
///
/// `resource_usage` and `running_applications` cover the node's entire
/// subtree, not just the node itself: every mutation walks the full
/// root-to-leaf path, which is what makes ancestor ceilings enforceable and
/// counts queryable at any level. Children are exclusively owned; the tree
/// has no back-pointers and no sharing.
#[derive(Debug)]
pub struct QueueTracker {
    /// Dotted path of the parent queue, empty at the root.
    queue_path: String,
    /// Local segment name.
    queue_name: String,
    /// Combined usage of this node and its entire subtree.
    resource_usage: ResourceVector,
    /// Resource ceiling; `None` is unlimited, and dimensions a present
    /// vector does not define are unlimited at this node only.
    max_resources: Option<ResourceVector>,
    /// Ceiling on distinct running applications; `None` is unlimited.
    max_running_apps: Option<u32>,
    /// Applications with charged usage anywhere in this subtree.
    running_applications: HashSet<String>,
    child_queue_trackers: HashMap<String, QueueTracker>,
}

impl QueueTracker {
    pub fn new(queue_path: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            queue_path: queue_path.into(),
            queue_name: queue_name.into(),
            resource_usage: ResourceVector::new(),
            max_resources: None,
            max_running_apps: None,
            running_applications: HashSet::new(),
            child_queue_trackers: HashMap::new(),
        }
    }

    /// A tree root named `root`.
    pub fn new_root() -> Self {
        Self::new("", ROOT_QUEUE)
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Fully qualified dotted path of this queue.
    pub fn full_path(&self) -> String {
        if self.queue_path.is_empty() {
            self.queue_name.clone()
        } else {
            format!("{}.{}", self.queue_path, self.queue_name)
        }
    }

    pub fn resource_usage(&self) -> &ResourceVector {
        &self.resource_usage
    }

    pub fn child(&self, name: &str) -> Option<&QueueTracker> {
        self.child_queue_trackers.get(name)
    }

    /// Zero usage, no running applications, no children. An empty root is
    /// reported to the caller as removable, never removed from here.
    pub fn is_empty(&self) -> bool {
        self.resource_usage.is_zero()
            && self.running_applications.is_empty()
            && self.child_queue_trackers.is_empty()
    }

    /// Charge `delta` against `application_id` at every node from this root
    /// to the named leaf, creating missing nodes on the way.
    ///
    /// Every ceiling on the path is checked before anything commits: a
    /// single rejection leaves every pre-existing node untouched. Freshly
    /// created nodes carry no limits and cannot reject, so no partial chain
    /// lingers below a rejecting node. `user` is carried for bookkeeping and
    /// never affects the outcome.
    pub fn increase_tracked_resource(
        &mut self,
        hierarchy: &[&str],
        application_id: &str,
        user: &str,
        delta: &ResourceVector,
    ) -> Result<(), DomainError> {
        self.check_hierarchy_head(hierarchy)?;
        self.increase_inner(hierarchy, application_id, user, delta)?;
        debug!(
            user,
            application_id,
            queue_path = %hierarchy.join("."),
            delta = %delta,
            "tracked resource increased"
        );
        Ok(())
    }

    // Checks run on the way down, commits on the way back up: by the time
    // any node mutates, every check on the path has already passed.
    fn increase_inner(
        &mut self,
        hierarchy: &[&str],
        application_id: &str,
        user: &str,
        delta: &ResourceVector,
    ) -> Result<(), DomainError> {
        let next_usage = self.resource_usage.add(delta);
        if let Some(max) = &self.max_resources {
            if let Some((dimension, attempted, limit)) = next_usage.first_dimension_over(max) {
                warn!(
                    queue_path = %self.full_path(),
                    user,
                    application_id,
                    dimension,
                    attempted,
                    limit,
                    "increase rejected: resource quota exceeded"
                );
                return Err(DomainError::ResourceQuotaExceeded {
                    queue_path: self.full_path(),
                    dimension: dimension.to_string(),
                    attempted,
                    limit,
                });
            }
        }
        if let Some(limit) = self.max_running_apps {
            if !self.running_applications.contains(application_id) {
                let attempted = self.running_applications.len() + 1;
                if attempted > limit as usize {
                    warn!(
                        queue_path = %self.full_path(),
                        user,
                        application_id,
                        attempted,
                        limit,
                        "increase rejected: application quota exceeded"
                    );
                    return Err(DomainError::ApplicationQuotaExceeded {
                        queue_path: self.full_path(),
                        attempted,
                        limit,
                    });
                }
            }
        }

        if hierarchy.len() > 1 {
            self.obtain_child(hierarchy[1])
                .increase_inner(&hierarchy[1..], application_id, user, delta)?;
        }

        self.resource_usage = next_usage;
        self.running_applications.insert(application_id.to_string());
        Ok(())
    }

    /// Release `delta` at every node from this root to the named leaf.
    ///
    /// A path segment that was never created is an accounting desync and an
    /// error, as is any dimension that would go negative; either way nothing
    /// on the path is mutated. With `remove_app` the application's membership
    /// is dropped at every node on the path (the full-completion signal);
    /// without it membership stays even if usage transiently reaches zero.
    ///
    /// Drained children (zero usage, no members, no children) are pruned on
    /// the way back up. `Ok(true)` reports that this root itself ended the
    /// call fully drained; the caller owns root removal.
    pub fn decrease_tracked_resource(
        &mut self,
        hierarchy: &[&str],
        application_id: &str,
        delta: &ResourceVector,
        remove_app: bool,
    ) -> Result<bool, DomainError> {
        self.check_hierarchy_head(hierarchy)?;
        self.decrease_inner(hierarchy, application_id, delta, remove_app)
    }

    fn decrease_inner(
        &mut self,
        hierarchy: &[&str],
        application_id: &str,
        delta: &ResourceVector,
        remove_app: bool,
    ) -> Result<bool, DomainError> {
        // existence and underflow are validated on the way down; subtraction
        // commits on the unwind, so a failure anywhere mutates nothing
        if let Some(dimension) = self.resource_usage.underflow_dimension(delta) {
            warn!(
                queue_path = %self.full_path(),
                application_id,
                dimension,
                "decrease rejected: usage would go negative"
            );
            return Err(DomainError::UsageUnderflow {
                queue_path: self.full_path(),
                dimension: dimension.to_string(),
                current: self.resource_usage.get(dimension),
                delta: delta.get(dimension),
            });
        }

        if hierarchy.len() > 1 {
            let segment = hierarchy[1];
            let path = self.full_path();
            let child = match self.child_queue_trackers.get_mut(segment) {
                Some(child) => child,
                None => {
                    warn!(
                        queue_path = %path,
                        segment,
                        application_id,
                        "decrease targets a queue that was never created"
                    );
                    return Err(DomainError::UnknownQueuePath {
                        queue_path: path,
                        segment: segment.to_string(),
                    });
                }
            };
            if child.decrease_inner(&hierarchy[1..], application_id, delta, remove_app)? {
                debug!(queue_path = %path, segment, "pruning drained queue tracker");
                self.child_queue_trackers.remove(segment);
            }
        }

        self.resource_usage.sub_assign(delta);
        if remove_app {
            self.running_applications.remove(application_id);
        }
        Ok(self.is_empty())
    }

    /// Residual capacity for the named leaf under every ancestor's resource
    /// ceiling. Pure lookup: a missing node contributes no constraint and no
    /// usage. An unconfigured path yields [`Headroom::Unbounded`], never a
    /// zero vector.
    pub fn headroom(&self, hierarchy: &[&str]) -> Headroom {
        if hierarchy.first() != Some(&self.queue_name.as_str()) {
            return Headroom::Unbounded;
        }
        let below = if hierarchy.len() > 1 {
            match self.child_queue_trackers.get(hierarchy[1]) {
                Some(child) => child.headroom(&hierarchy[1..]),
                None => Headroom::Unbounded,
            }
        } else {
            Headroom::Unbounded
        };
        let own = match &self.max_resources {
            Some(max) => Headroom::Limited(max.remaining_under(&self.resource_usage)),
            None => Headroom::Unbounded,
        };
        below.merge(own)
    }

    /// Distinct running applications at the named queue; a level that does
    /// not exist counts zero. Lookup only.
    pub fn running_application_count(&self, hierarchy: &[&str]) -> usize {
        if hierarchy.first() != Some(&self.queue_name.as_str()) {
            return 0;
        }
        if hierarchy.len() == 1 {
            return self.running_applications.len();
        }
        self.child_queue_trackers
            .get(hierarchy[1])
            .map_or(0, |child| child.running_application_count(&hierarchy[1..]))
    }

    /// Overwrite both ceilings at the named queue, creating missing nodes on
    /// the way (limits routinely arrive from configuration before the first
    /// charge does).
    pub fn set_limits(
        &mut self,
        hierarchy: &[&str],
        limits: QueueLimits,
    ) -> Result<(), DomainError> {
        self.check_hierarchy_head(hierarchy)?;
        let mut node = self;
        for segment in &hierarchy[1..] {
            node = node.obtain_child(segment);
        }
        node.max_resources = limits.max_resources;
        node.max_running_apps = limits.max_applications;
        Ok(())
    }

    /// Dotted path -> subtree usage for every node currently present.
    pub fn usage_snapshot(&self) -> BTreeMap<String, ResourceVector> {
        let mut out = BTreeMap::new();
        self.collect_usage(&mut out);
        out
    }

    fn collect_usage(&self, out: &mut BTreeMap<String, ResourceVector>) {
        out.insert(self.full_path(), self.resource_usage.clone());
        for child in self.child_queue_trackers.values() {
            child.collect_usage(out);
        }
    }

    fn obtain_child(&mut self, name: &str) -> &mut QueueTracker {
        let parent_path = self.full_path();
        self.child_queue_trackers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(queue_path = %parent_path, child = name, "lazily creating queue tracker");
                QueueTracker::new(parent_path.as_str(), name)
            })
    }

    fn check_hierarchy_head(&self, hierarchy: &[&str]) -> Result<(), DomainError> {
        match hierarchy.first() {
            None => Err(DomainError::InvalidHierarchy {
                reason: "hierarchy is empty".to_string(),
            }),
            Some(head) if *head != self.queue_name => Err(DomainError::InvalidHierarchy {
                reason: format!("hierarchy starts at {}, tracker is {}", head, self.queue_name),
            }),
            Some(_) => Ok(()),
        }
    }
}
