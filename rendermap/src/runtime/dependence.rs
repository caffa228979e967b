//! Per-context dependence tracking.
//!
//! Operations a task issues on the same region tree are ordered by access
//! kind: a writer waits for everything issued before it on that tree, a
//! reader waits only for the last writer. Readers issued between two writers
//! run concurrently.

use super::future::Completion;
use crate::region::RegionTreeId;
use std::collections::HashMap;

/// How an operation touches a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    /// Any write, and the coherence operations (acquire, release, destroy).
    Write,
}

#[derive(Default)]
struct TreeDeps {
    last_writer: Option<Completion>,
    readers: Vec<Completion>,
}

/// Tracks outstanding operations per region tree for one task context.
#[derive(Default)]
pub struct DependenceTracker {
    trees: HashMap<RegionTreeId, TreeDeps>,
}

impl DependenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations an access of `kind` on `tree` must wait for.
    pub fn preconditions(&self, tree: RegionTreeId, kind: AccessKind) -> Vec<Completion> {
        let Some(deps) = self.trees.get(&tree) else {
            return Vec::new();
        };
        let mut pre: Vec<Completion> = deps.last_writer.iter().cloned().collect();
        if kind == AccessKind::Write {
            pre.extend(deps.readers.iter().cloned());
        }
        pre
    }

    /// Records an issued access so later operations can order against it.
    pub fn record(&mut self, tree: RegionTreeId, kind: AccessKind, completion: Completion) {
        let deps = self.trees.entry(tree).or_default();
        match kind {
            AccessKind::Write => {
                deps.last_writer = Some(completion);
                deps.readers.clear();
            }
            AccessKind::Read => deps.readers.push(completion),
        }
    }

    /// Number of operations a writer on `tree` would currently wait for.
    pub fn outstanding(&self, tree: RegionTreeId) -> usize {
        self.preconditions(tree, AccessKind::Write).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Arc;

    fn done() -> Completion {
        async { Ok(Arc::new(()) as Arc<dyn std::any::Any + Send + Sync>) }
            .boxed()
            .shared()
    }

    #[test]
    fn test_readers_wait_for_last_writer_only() {
        let mut deps = DependenceTracker::new();
        let tree = RegionTreeId(1);

        deps.record(tree, AccessKind::Write, done());
        deps.record(tree, AccessKind::Read, done());
        deps.record(tree, AccessKind::Read, done());

        assert_eq!(deps.preconditions(tree, AccessKind::Read).len(), 1);
        assert_eq!(deps.preconditions(tree, AccessKind::Write).len(), 3);
    }

    #[test]
    fn test_writer_resets_readers() {
        let mut deps = DependenceTracker::new();
        let tree = RegionTreeId(1);

        deps.record(tree, AccessKind::Read, done());
        deps.record(tree, AccessKind::Write, done());

        assert_eq!(deps.outstanding(tree), 1);
    }

    #[test]
    fn test_trees_are_independent() {
        let mut deps = DependenceTracker::new();
        deps.record(RegionTreeId(1), AccessKind::Write, done());

        assert!(deps.preconditions(RegionTreeId(2), AccessKind::Write).is_empty());
    }
}
