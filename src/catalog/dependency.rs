// Dependency tracking between catalog objects
//
// Objects are referred to by `ObjectId`, which stays the same when an object
// is renamed. The catalog registers edges on create, asks for dependents on
// drop and erases edges when a create is rolled back or a committed drop is
// vacuumed.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use log::debug;
use parking_lot::RwLock;

use crate::catalog::lock_set::LockPlan;
use crate::common::types::ObjectId;

/// Collaborator that owns the dependency graph
pub trait DependencyManager: Send + Sync {
    /// Record that `object` depends on every object in `dependencies`
    fn register_dependencies(&self, object: ObjectId, dependencies: &[ObjectId]);

    /// Objects that directly depend on `object`
    fn get_dependents(&self, object: ObjectId) -> Vec<ObjectId>;

    /// Forget every edge touching `object`
    fn erase_object(&self, object: ObjectId);

    /// Every object a cascading drop of `object` may reach, nearest first.
    ///
    /// Adds the catalog set of each of them to `lock_plan`. Liveness is not
    /// checked here: the caller re-checks every target under the set locks.
    fn cascade_drop(&self, object: ObjectId, lock_plan: &mut LockPlan) -> Vec<ObjectId> {
        let mut targets = Vec::new();
        let mut visited = HashSet::from([object]);
        let mut queue = VecDeque::from([object]);
        lock_plan.include(object.set_id);

        while let Some(current) = queue.pop_front() {
            for dependent in self.get_dependents(current) {
                if visited.insert(dependent) {
                    lock_plan.include(dependent.set_id);
                    targets.push(dependent);
                    queue.push_back(dependent);
                }
            }
        }
        targets
    }
}

#[derive(Debug, Default)]
struct Edges {
    /// object -> objects that depend on it
    dependents: HashMap<ObjectId, BTreeSet<ObjectId>>,
    /// object -> objects it depends on
    dependencies: HashMap<ObjectId, BTreeSet<ObjectId>>,
}

/// In-memory dependency graph shared by all catalog sets of a catalog
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: RwLock<Edges>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects `object` depends on
    pub fn get_dependencies(&self, object: ObjectId) -> Vec<ObjectId> {
        self.edges
            .read()
            .dependencies
            .get(&object)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of recorded edges
    pub fn edge_count(&self) -> usize {
        self.edges.read().dependencies.values().map(BTreeSet::len).sum()
    }
}

impl DependencyManager for DependencyGraph {
    fn register_dependencies(&self, object: ObjectId, dependencies: &[ObjectId]) {
        if dependencies.is_empty() {
            return;
        }
        let mut edges = self.edges.write();
        for &dependency in dependencies {
            if dependency == object {
                continue;
            }
            edges.dependents.entry(dependency).or_default().insert(object);
            edges.dependencies.entry(object).or_default().insert(dependency);
        }
        debug!("Registered {} dependencies for object {}", dependencies.len(), object);
    }

    fn get_dependents(&self, object: ObjectId) -> Vec<ObjectId> {
        self.edges
            .read()
            .dependents
            .get(&object)
            .map(|dependents| dependents.iter().copied().collect())
            .unwrap_or_default()
    }

    fn erase_object(&self, object: ObjectId) {
        let mut guard = self.edges.write();
        let edges = &mut *guard;
        let mut erased = 0;
        if let Some(dependencies) = edges.dependencies.remove(&object) {
            erased += dependencies.len();
            for dependency in dependencies {
                if let Some(dependents) = edges.dependents.get_mut(&dependency) {
                    dependents.remove(&object);
                    if dependents.is_empty() {
                        edges.dependents.remove(&dependency);
                    }
                }
            }
        }
        if let Some(dependents) = edges.dependents.remove(&object) {
            erased += dependents.len();
            for dependent in dependents {
                if let Some(dependencies) = edges.dependencies.get_mut(&dependent) {
                    dependencies.remove(&object);
                    if dependencies.is_empty() {
                        edges.dependencies.remove(&dependent);
                    }
                }
            }
        }
        if erased > 0 {
            debug!("Erased {} dependency edges of object {}", erased, object);
        }
    }
}
