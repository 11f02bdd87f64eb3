// UsageRegistry - owns one tracker tree per submitting user
//
// The registry is the explicitly constructed context object the trackers
// live in; there is no process-wide accessor. Each tree sits behind its own
// lock, held for the duration of one call: the multi-level check-then-commit
// inside a tracker needs a consistent view across all ancestors, and calls
// on distinct trees stay fully parallel.
//
// Lock order is map first, tree second, everywhere. The map read lock stays
// held across a tree operation so a drained-tree removal (map write lock)
// can never interleave with a charge landing on the tree it is removing.

use crate::domain::{Headroom, QueueTracker, ResourceVector, ROOT_QUEUE};
use crate::error::{AppError, Result};
use crate::port::LimitEntry;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Registry-wide usage snapshot: user -> dotted queue path -> subtree usage.
#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub taken_at: DateTime<Utc>,
    pub trees: BTreeMap<String, BTreeMap<String, ResourceVector>>,
}

impl UsageReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(AppError::from)
    }
}

/// Owner of per-user tracker trees.
pub struct UsageRegistry {
    trees: RwLock<HashMap<String, Arc<Mutex<QueueTracker>>>>,
    limits: RwLock<Vec<LimitEntry>>,
}

impl Default for UsageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageRegistry {
    pub fn new() -> Self {
        Self {
            trees: RwLock::new(HashMap::new()),
            limits: RwLock::new(Vec::new()),
        }
    }

    /// Charge `delta` for `application_id` on the user's tree, creating the
    /// tree (with the stored limit set applied) on first use.
    pub fn increase(
        &self,
        user: &str,
        hierarchy: &[&str],
        application_id: &str,
        delta: &ResourceVector,
    ) -> Result<()> {
        {
            let trees = self.trees.read();
            if let Some(tree) = trees.get(user) {
                return tree
                    .lock()
                    .increase_tracked_resource(hierarchy, application_id, user, delta)
                    .map_err(AppError::from);
            }
        }

        // first charge for this user: build the tree under the write lock so
        // the charge lands before anyone else can observe (or drain) it.
        // the limit set is cloned up front; the two registry locks are never
        // held together
        let limits = self.limits.read().clone();
        let mut trees = self.trees.write();
        let tree = trees
            .entry(user.to_string())
            .or_insert_with(|| {
                info!(user, "created usage tree");
                let mut tracker = QueueTracker::new_root();
                for entry in &limits {
                    apply_entry(&mut tracker, user, entry);
                }
                Arc::new(Mutex::new(tracker))
            })
            .clone();
        let result = tree
            .lock()
            .increase_tracked_resource(hierarchy, application_id, user, delta)
            .map_err(AppError::from);
        result
    }

    /// Release `delta` for `application_id` on the user's tree. When the
    /// release drains the root completely, the registry removes the tree -
    /// the tracker only ever reports removability.
    pub fn decrease(
        &self,
        user: &str,
        hierarchy: &[&str],
        application_id: &str,
        delta: &ResourceVector,
        remove_app: bool,
    ) -> Result<()> {
        let removable = {
            let trees = self.trees.read();
            let tree = match trees.get(user) {
                Some(tree) => tree,
                None => {
                    warn!(user, "decrease for a user with no usage tree");
                    return Err(AppError::Domain(
                        crate::domain::DomainError::UnknownQueuePath {
                            queue_path: hierarchy.join("."),
                            segment: hierarchy.first().unwrap_or(&"").to_string(),
                        },
                    ));
                }
            };
            let removable = tree
                .lock()
                .decrease_tracked_resource(hierarchy, application_id, delta, remove_app)?;
            removable
        };

        if removable {
            // re-validate under the map write lock: an increase may have
            // repopulated the tree between the drain and this point
            let mut trees = self.trees.write();
            let still_empty = trees.get(user).map_or(false, |tree| tree.lock().is_empty());
            if still_empty {
                trees.remove(user);
                info!(user, "removed drained usage tree");
            }
        }
        Ok(())
    }

    /// Residual capacity for the named queue on the user's tree. A user with
    /// no tree has no constraints.
    pub fn headroom(&self, user: &str, hierarchy: &[&str]) -> Headroom {
        let trees = self.trees.read();
        match trees.get(user) {
            Some(tree) => tree.lock().headroom(hierarchy),
            None => Headroom::Unbounded,
        }
    }

    /// Distinct running applications at the named queue; zero for anything
    /// that does not exist.
    pub fn running_application_count(&self, user: &str, hierarchy: &[&str]) -> usize {
        let trees = self.trees.read();
        match trees.get(user) {
            Some(tree) => tree.lock().running_application_count(hierarchy),
            None => 0,
        }
    }

    /// Replace the stored limit set and apply it to every live tree. New
    /// trees pick the stored set up on creation. Returns how many tree/entry
    /// applications happened.
    pub fn replace_limits(&self, entries: Vec<LimitEntry>) -> Result<usize> {
        for entry in &entries {
            validate_queue_path(&entry.queue_path)?;
        }
        *self.limits.write() = entries.clone();

        let trees = self.trees.read();
        let mut applied = 0;
        for (user, tree) in trees.iter() {
            let mut tracker = tree.lock();
            for entry in &entries {
                apply_entry(&mut tracker, user, entry);
                applied += 1;
            }
        }
        info!(
            entries = entries.len(),
            trees = trees.len(),
            "replaced limit configuration"
        );
        Ok(applied)
    }

    /// Users with a live tree.
    pub fn tracked_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.trees.read().keys().cloned().collect();
        users.sort();
        users
    }

    /// Timestamped usage snapshot of every live tree.
    pub fn report(&self) -> UsageReport {
        let trees = self.trees.read();
        UsageReport {
            taken_at: Utc::now(),
            trees: trees
                .iter()
                .map(|(user, tree)| (user.clone(), tree.lock().usage_snapshot()))
                .collect(),
        }
    }
}

fn apply_entry(tracker: &mut QueueTracker, user: &str, entry: &LimitEntry) {
    let hierarchy: Vec<&str> = entry.queue_path.split('.').collect();
    if let Err(error) = tracker.set_limits(&hierarchy, entry.limits.clone()) {
        // entries are validated on the way in; anything here is a desync
        warn!(user, queue_path = %entry.queue_path, %error, "failed to apply limit entry");
    }
}

fn validate_queue_path(queue_path: &str) -> Result<()> {
    if queue_path.split('.').next() != Some(ROOT_QUEUE) {
        return Err(AppError::Validation(format!(
            "limit path must start at {}: {}",
            ROOT_QUEUE, queue_path
        )));
    }
    if queue_path.split('.').any(|segment| segment.is_empty()) {
        return Err(AppError::Validation(format!(
            "limit path has an empty segment: {}",
            queue_path
        )));
    }
    Ok(())
}
