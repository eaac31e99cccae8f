// Version chains
//
// Versions of a name binding or of a catalog object live in an arena and point
// at their neighbours by index. The head of a chain is the newest version; the
// tail is the oldest one still retained.

use crate::common::types::Timestamp;
use crate::transaction::TransactionContext;

/// Index of a version inside its arena
pub type VersionId = usize;

/// One version in a chain
#[derive(Debug, Clone)]
pub struct VersionNode<T> {
    /// Data carried by this version
    pub value: T,
    /// Commit timestamp, or the writer's transaction id while uncommitted
    pub timestamp: Timestamp,
    /// Tombstone flag
    pub deleted: bool,
    /// The version this one superseded
    pub older: Option<VersionId>,
    /// The version that superseded this one
    pub newer: Option<VersionId>,
}

/// Arena owning every version of every chain in one table
#[derive(Debug)]
pub struct VersionArena<T> {
    slots: Vec<Option<VersionNode<T>>>,
    free: Vec<VersionId>,
}

impl<T> Default for VersionArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VersionArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live versions
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: VersionId) -> &VersionNode<T> {
        match self.slots.get(id) {
            Some(Some(node)) => node,
            _ => panic!("dangling catalog version {}", id),
        }
    }

    pub fn get_mut(&mut self, id: VersionId) -> &mut VersionNode<T> {
        match self.slots.get_mut(id) {
            Some(Some(node)) => node,
            _ => panic!("dangling catalog version {}", id),
        }
    }

    /// Prepend a new version on top of `head` and return its id
    pub fn push(&mut self, head: Option<VersionId>, value: T, timestamp: Timestamp, deleted: bool) -> VersionId {
        let node = VersionNode {
            value,
            timestamp,
            deleted,
            older: head,
            newer: None,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        if let Some(head) = head {
            let previous = self.get_mut(head);
            debug_assert!(previous.newer.is_none(), "pushing onto a version that is not a chain head");
            previous.newer = Some(id);
        }
        id
    }

    /// Remove a version from its chain, splicing its neighbours together.
    ///
    /// Returns the removed node; when it was the head its `older` link is the
    /// chain's new head.
    pub fn unlink(&mut self, id: VersionId) -> VersionNode<T> {
        let node = match self.slots.get_mut(id).and_then(Option::take) {
            Some(node) => node,
            None => panic!("unlinking dangling catalog version {}", id),
        };
        self.free.push(id);
        if let Some(older) = node.older {
            self.get_mut(older).newer = node.newer;
        }
        if let Some(newer) = node.newer {
            self.get_mut(newer).older = node.older;
        }
        node
    }

    /// Walk from `head` towards the tail and return the first version the
    /// transaction may see. Tombstones are returned as-is; callers decide
    /// what a visible tombstone means.
    pub fn visible(&self, ctx: &dyn TransactionContext, head: Option<VersionId>) -> Option<VersionId> {
        let mut current = head;
        while let Some(id) = current {
            let node = self.get(id);
            if ctx.use_timestamp(node.timestamp) {
                return Some(id);
            }
            current = node.older;
        }
        None
    }

    /// Iterate a chain from `head` (newest first)
    pub fn chain(&self, head: Option<VersionId>) -> ChainIter<'_, T> {
        ChainIter { arena: self, next: head }
    }

    /// Free every version older than `keep`. Returns how many were freed.
    pub fn prune_older_than(&mut self, keep: VersionId) -> usize {
        let mut next = self.get_mut(keep).older.take();
        let mut freed = 0;
        while let Some(id) = next {
            let node = match self.slots.get_mut(id).and_then(Option::take) {
                Some(node) => node,
                None => panic!("pruning dangling catalog version {}", id),
            };
            self.free.push(id);
            next = node.older;
            freed += 1;
        }
        freed
    }
}

/// Iterator over the versions of one chain, newest first
pub struct ChainIter<'a, T> {
    arena: &'a VersionArena<T>,
    next: Option<VersionId>,
}

impl<'a, T> Iterator for ChainIter<'a, T> {
    type Item = (VersionId, &'a VersionNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.arena.get(id);
        self.next = node.older;
        Some((id, node))
    }
}

/// Newest version in a chain that every transaction starting at or after
/// `horizon` is guaranteed to see (or to see something newer than)
pub fn oldest_needed<T>(arena: &VersionArena<T>, head: Option<VersionId>, horizon: Timestamp) -> Option<VersionId> {
    arena
        .chain(head)
        .find(|(_, node)| crate::common::types::is_committed(node.timestamp) && node.timestamp < horizon)
        .map(|(id, _)| id)
}
