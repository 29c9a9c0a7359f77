use std::collections::HashSet;
use std::fmt;
use std::iter::FusedIterator;
use std::num::NonZeroUsize;
use std::str::FromStr;

use tracing::{debug, trace};

use super::filter::{ActHierarchyFilter, InclusionPolicy};
use super::tree::{ActTree, HierarchyEntry};
use crate::db::ActResolver;
use crate::error::{ActHistoryError, Result};
use crate::models::{Act, ActCategory, ActId};

// ---------------------------------------------------------------------------
// Traversal settings
// ---------------------------------------------------------------------------

/// Maximum depth of a traversal. Roots are at depth 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxDepth {
    #[default]
    Unbounded,
    Limited(NonZeroUsize),
}

impl MaxDepth {
    /// Maps `-1` to [`MaxDepth::Unbounded`] and positive values to a limit.
    pub fn from_depth(depth: i64) -> Result<Self> {
        match depth {
            -1 => Ok(Self::Unbounded),
            d if d >= 1 => usize::try_from(d)
                .ok()
                .and_then(NonZeroUsize::new)
                .map(Self::Limited)
                .ok_or(ActHistoryError::InvalidDepth(depth)),
            _ => Err(ActHistoryError::InvalidDepth(depth)),
        }
    }

    pub fn limited(depth: usize) -> Result<Self> {
        NonZeroUsize::new(depth)
            .map(Self::Limited)
            .ok_or(ActHistoryError::InvalidDepth(0))
    }

    /// True if a node at `depth` may be emitted.
    pub fn allows(&self, depth: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(max) => depth <= max.get(),
        }
    }

    /// True if the children of a node at `depth` may be emitted.
    pub fn expands(&self, depth: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Limited(max) => depth < max.get(),
        }
    }

}

impl fmt::Display for MaxDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Limited(max) => write!(f, "{}", max),
        }
    }
}

impl FromStr for MaxDepth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") || s.eq_ignore_ascii_case("unlimited") {
            return Ok(Self::Unbounded);
        }
        let depth: i64 = s.parse().map_err(|_| format!("Invalid depth: {}", s))?;
        Self::from_depth(depth).map_err(|e| e.to_string())
    }
}

/// Where an act reachable through more than one relationship is placed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Placement {
    /// Keep the act under the first parent it was found beneath.
    FirstSeen,
    /// Move the act under the deepest parent found. Among parents at the
    /// same level the last one visited wins.
    #[default]
    Deepest,
    /// Like `Deepest`, restricted to acts of the listed categories.
    Categories(HashSet<ActCategory>),
}

impl Placement {
    pub fn reparents(&self, category: ActCategory) -> bool {
        match self {
            Self::FirstSeen => false,
            Self::Deepest => true,
            Self::Categories(categories) => categories.contains(&category),
        }
    }
}

// ---------------------------------------------------------------------------
// Iterator
// ---------------------------------------------------------------------------

/// Pre-order traversal of the filtered act hierarchy beneath a set of roots,
/// down to a maximum depth.
pub struct ActHierarchyIterator<'a, P = super::IncludeAll> {
    roots: Vec<&'a Act>,
    filter: ActHierarchyFilter<P>,
    resolver: &'a dyn ActResolver,
    max_depth: MaxDepth,
    placement: Placement,
}

impl<'a, P: InclusionPolicy> ActHierarchyIterator<'a, P> {
    pub fn new(
        roots: impl IntoIterator<Item = &'a Act>,
        filter: ActHierarchyFilter<P>,
        max_depth: MaxDepth,
        resolver: &'a dyn ActResolver,
    ) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            filter,
            resolver,
            max_depth,
            placement: Placement::default(),
        }
    }

    /// Resolve the roots by id. Fails on the first id that does not resolve.
    pub fn from_ids(
        ids: impl IntoIterator<Item = ActId>,
        filter: ActHierarchyFilter<P>,
        max_depth: MaxDepth,
        resolver: &'a dyn ActResolver,
    ) -> Result<Self> {
        let roots = ids
            .into_iter()
            .map(|id| resolver.get_act(&id).ok_or(ActHistoryError::RootNotFound(id)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(roots, filter, max_depth, resolver))
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn roots(&self) -> &[&'a Act] {
        &self.roots
    }

    pub fn max_depth(&self) -> MaxDepth {
        self.max_depth
    }

    pub fn filter(&self) -> &ActHierarchyFilter<P> {
        &self.filter
    }

    /// Lazily yields every emitted act with its depth.
    pub fn entries(&self) -> Entries<'_, 'a, P> {
        Entries {
            source: self,
            next_root: 0,
            pending: Vec::new().into_iter(),
        }
    }

    /// Lazily yields every emitted act. Each call starts a new traversal.
    pub fn iter(&self) -> Acts<'_, 'a, P> {
        Acts {
            entries: self.entries(),
        }
    }

    /// Flattened subtree of a single root. Empty if the root is excluded.
    pub fn flatten_root(&self, root: &'a Act) -> Vec<HierarchyEntry<'a>> {
        if !self.max_depth.expands(1) {
            return if self.filter.includes(root) {
                vec![HierarchyEntry {
                    act: root,
                    depth: 1,
                }]
            } else {
                Vec::new()
            };
        }

        let Some(tree) = self.build(root) else {
            debug!(root = %root.id, "Root excluded from traversal");
            return Vec::new();
        };
        let entries = tree.flatten(self.max_depth);
        debug!(
            root = %root.id,
            reachable = tree.len(),
            emitted = entries.len(),
            "Flattened act hierarchy"
        );
        entries
    }

    fn build(&self, root: &'a Act) -> Option<ActTree<'a>> {
        let mut tree = ActTree::new(root);
        let mut excluded: HashSet<&'a ActId> = HashSet::new();
        let mut stack = vec![ActTree::ROOT];

        while let Some(node) = stack.pop() {
            let act = tree.act(node);
            if tree.find(&act.id) != Some(node) {
                // removed along with an excluded ancestor
                continue;
            }
            let depth = tree.depth(node);
            if !self.max_depth.expands(depth) {
                continue;
            }

            let Some(children) = self.filter.evaluate(act, self.resolver) else {
                if node == ActTree::ROOT {
                    return None;
                }
                trace!(act = %act.id, "Excluding act after evaluating its children");
                tree.remove(node);
                excluded.insert(&act.id);
                continue;
            };

            let mut added = Vec::with_capacity(children.len());
            for child in children {
                if excluded.contains(&child.id) {
                    continue;
                }
                match tree.find(&child.id) {
                    Some(existing) => {
                        if tree.is_ancestor_or_self(existing, node) {
                            continue;
                        }
                        if self.placement.reparents(child.category)
                            && tree.depth(existing) <= depth + 1
                        {
                            // same level counts, so the last parent in sort order wins
                            trace!(
                                act = %child.id,
                                parent = %act.id,
                                "Moving act beneath later parent"
                            );
                            tree.move_to(existing, node);
                        }
                    }
                    None => {
                        if !self.filter.includes(child) {
                            excluded.insert(&child.id);
                            continue;
                        }
                        added.push(tree.add(node, child));
                    }
                }
            }
            stack.extend(added.into_iter().rev());
        }
        Some(tree)
    }
}

impl<'i, 'a, P: InclusionPolicy> IntoIterator for &'i ActHierarchyIterator<'a, P> {
    type Item = &'a Act;
    type IntoIter = Acts<'i, 'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy sequence of [`HierarchyEntry`]. A root's subtree is only built once
/// the previous root's entries are exhausted.
pub struct Entries<'i, 'a, P> {
    source: &'i ActHierarchyIterator<'a, P>,
    next_root: usize,
    pending: std::vec::IntoIter<HierarchyEntry<'a>>,
}

impl<'a, P: InclusionPolicy> Iterator for Entries<'_, 'a, P> {
    type Item = HierarchyEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.next() {
                return Some(entry);
            }
            let root = *self.source.roots.get(self.next_root)?;
            self.next_root += 1;
            self.pending = self.source.flatten_root(root).into_iter();
        }
    }
}

impl<P: InclusionPolicy> FusedIterator for Entries<'_, '_, P> {}

/// Lazy sequence of emitted acts.
pub struct Acts<'i, 'a, P> {
    entries: Entries<'i, 'a, P>,
}

impl<'a, P: InclusionPolicy> Iterator for Acts<'_, 'a, P> {
    type Item = &'a Act;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|entry| entry.act)
    }
}

impl<P: InclusionPolicy> FusedIterator for Acts<'_, '_, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ActSnapshot;
    use crate::hierarchy::{CategoryPredicate, ExcludeChildless};
    use crate::models::{ActivityTime, SortDirection};
    use chrono::{TimeZone, Utc};

    fn at(minute: u32) -> ActivityTime {
        ActivityTime::Instant(Utc.with_ymd_and_hms(2014, 8, 25, 9, minute, 0).unwrap())
    }

    fn ids<'a>(acts: impl IntoIterator<Item = &'a Act>) -> Vec<String> {
        acts.into_iter().map(|a| a.id.to_string()).collect()
    }

    /// e1 -> {p1, n1, w1}, p1 -> {n1, m1}, m1 -> {a1}
    fn nested() -> ActSnapshot {
        ActSnapshot::builder()
            .act(Act::new("e1", ActCategory::Event).with_start_time(at(0)))
            .act(Act::new("w1", ActCategory::Weight).with_start_time(at(1)))
            .act(Act::new("n1", ActCategory::Note).with_start_time(at(2)))
            .act(Act::new("p1", ActCategory::Problem).with_start_time(at(3)))
            .act(Act::new("m1", ActCategory::Medication).with_start_time(at(4)))
            .act(Act::new("a1", ActCategory::Addendum).with_start_time(at(5)))
            .link("e1", "p1")
            .link("e1", "n1")
            .link("e1", "w1")
            .link("p1", "n1")
            .link("p1", "m1")
            .link("m1", "a1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_max_depth_from_depth() {
        assert_eq!(MaxDepth::from_depth(-1).unwrap(), MaxDepth::Unbounded);
        assert_eq!(MaxDepth::from_depth(3).unwrap(), MaxDepth::limited(3).unwrap());
        assert!(matches!(
            MaxDepth::from_depth(0),
            Err(ActHistoryError::InvalidDepth(0))
        ));
        assert!(matches!(
            MaxDepth::from_depth(-2),
            Err(ActHistoryError::InvalidDepth(-2))
        ));
    }

    #[test]
    fn test_max_depth_bounds() {
        let two = MaxDepth::limited(2).unwrap();
        assert!(two.allows(2));
        assert!(!two.allows(3));
        assert!(two.expands(1));
        assert!(!two.expands(2));
        assert!(MaxDepth::Unbounded.expands(usize::MAX - 1));
    }

    #[test]
    fn test_max_depth_parse() {
        assert_eq!("-1".parse::<MaxDepth>().unwrap(), MaxDepth::Unbounded);
        assert_eq!("unbounded".parse::<MaxDepth>().unwrap(), MaxDepth::Unbounded);
        assert_eq!(" 4 ".parse::<MaxDepth>().unwrap().to_string(), "4");
        assert!("0".parse::<MaxDepth>().is_err());
        assert!("deep".parse::<MaxDepth>().is_err());
    }

    #[test]
    fn test_deepest_placement_moves_shared_child() {
        let snapshot = nested();
        let root = snapshot.get_act(&ActId::from("e1")).unwrap();
        let iter = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all(),
            MaxDepth::Unbounded,
            &snapshot,
        );

        let entries: Vec<String> = iter
            .entries()
            .map(|e| format!("{}@{}", e.act.id, e.depth))
            .collect();
        assert_eq!(entries, vec!["e1@1", "w1@2", "p1@2", "n1@3", "m1@3", "a1@4"]);
    }

    #[test]
    fn test_first_seen_placement_keeps_shallow_position() {
        let snapshot = nested();
        let root = snapshot.get_act(&ActId::from("e1")).unwrap();
        let iter = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all(),
            MaxDepth::Unbounded,
            &snapshot,
        )
        .with_placement(Placement::FirstSeen);

        assert_eq!(ids(&iter), vec!["e1", "w1", "n1", "p1", "m1", "a1"]);
    }

    #[test]
    fn test_shared_child_follows_last_sibling_parent() {
        let snapshot = ActSnapshot::builder()
            .act(Act::new("e1", ActCategory::Event).with_start_time(at(0)))
            .act(Act::new("p1", ActCategory::Problem).with_start_time(at(1)))
            .act(Act::new("p2", ActCategory::Problem).with_start_time(at(3)))
            .act(Act::new("n1", ActCategory::Note).with_start_time(at(5)))
            .link("e1", "p1")
            .link("e1", "p2")
            .link("p1", "n1")
            .link("p2", "n1")
            .build()
            .unwrap();
        let root = snapshot.get_act(&ActId::from("e1")).unwrap();

        let ascending = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all(),
            MaxDepth::Unbounded,
            &snapshot,
        );
        let entries: Vec<String> = ascending
            .entries()
            .map(|e| format!("{}@{}", e.act.id, e.depth))
            .collect();
        assert_eq!(entries, vec!["e1@1", "p1@2", "p2@2", "n1@3"]);

        let descending = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all().with_direction(SortDirection::Descending),
            MaxDepth::Unbounded,
            &snapshot,
        );
        assert_eq!(ids(&descending), vec!["e1", "p2", "p1", "n1"]);
    }

    #[test]
    fn test_depth_limit() {
        let snapshot = nested();
        let root = snapshot.get_act(&ActId::from("e1")).unwrap();

        let one = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all(),
            MaxDepth::limited(1).unwrap(),
            &snapshot,
        );
        assert_eq!(ids(&one), vec!["e1"]);

        let two = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all(),
            MaxDepth::limited(2).unwrap(),
            &snapshot,
        );
        assert_eq!(ids(&two), vec!["e1", "w1", "n1", "p1"]);
        assert!(two.entries().all(|e| e.depth <= 2));
    }

    #[test]
    fn test_moved_nodes_respect_depth_limit() {
        let snapshot = nested();
        let root = snapshot.get_act(&ActId::from("e1")).unwrap();
        let iter = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all(),
            MaxDepth::limited(3).unwrap(),
            &snapshot,
        );
        assert_eq!(ids(&iter), vec!["e1", "w1", "p1", "n1", "m1"]);
    }

    #[test]
    fn test_descending_order() {
        let snapshot = nested();
        let root = snapshot.get_act(&ActId::from("e1")).unwrap();
        let iter = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all().with_direction(SortDirection::Descending),
            MaxDepth::Unbounded,
            &snapshot,
        );
        assert_eq!(ids(&iter), vec!["e1", "p1", "m1", "a1", "n1", "w1"]);
    }

    #[test]
    fn test_cycle_is_ignored() {
        let snapshot = ActSnapshot::builder()
            .act(Act::new("p1", ActCategory::Problem))
            .act(Act::new("n1", ActCategory::Note))
            .link("p1", "n1")
            .link("n1", "p1")
            .build()
            .unwrap();
        let root = snapshot.get_act(&ActId::from("p1")).unwrap();
        let iter = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all(),
            MaxDepth::Unbounded,
            &snapshot,
        );
        assert_eq!(ids(&iter), vec!["p1", "n1"]);
    }

    #[test]
    fn test_from_ids_rejects_unknown_root() {
        let snapshot = nested();
        let result = ActHierarchyIterator::from_ids(
            [ActId::from("e1"), ActId::from("missing")],
            ActHierarchyFilter::all(),
            MaxDepth::Unbounded,
            &snapshot,
        );
        assert!(matches!(
            result,
            Err(ActHistoryError::RootNotFound(id)) if id.as_str() == "missing"
        ));
    }

    #[test]
    fn test_multiple_roots_in_order() {
        let snapshot = nested();
        let iter = ActHierarchyIterator::from_ids(
            [ActId::from("m1"), ActId::from("w1")],
            ActHierarchyFilter::all(),
            MaxDepth::Unbounded,
            &snapshot,
        )
        .unwrap();
        assert_eq!(iter.roots().len(), 2);
        assert_eq!(ids(&iter), vec!["m1", "a1", "w1"]);
    }

    #[test]
    fn test_iteration_is_repeatable() {
        let snapshot = nested();
        let root = snapshot.get_act(&ActId::from("e1")).unwrap();
        let iter = ActHierarchyIterator::new(
            [root],
            ActHierarchyFilter::all(),
            MaxDepth::Unbounded,
            &snapshot,
        );
        assert_eq!(ids(iter.iter()), ids(iter.iter()));
    }

    #[test]
    fn test_childless_parents_pruned() {
        let snapshot = nested();
        let root = snapshot.get_act(&ActId::from("p1")).unwrap();
        let filter = ActHierarchyFilter::with_policy(CategoryPredicate::All, ExcludeChildless);
        let iter = ActHierarchyIterator::new([root], filter, MaxDepth::Unbounded, &snapshot);
        // n1 and a1 are pruned when expanded; m1 was kept while a1 was present
        assert_eq!(ids(&iter), vec!["p1", "m1"]);
    }

    #[test]
    fn test_excluded_root_yields_nothing() {
        let snapshot = nested();
        let root = snapshot.get_act(&ActId::from("w1")).unwrap();
        let filter = ActHierarchyFilter::with_policy(CategoryPredicate::All, ExcludeChildless);
        let iter = ActHierarchyIterator::new([root], filter, MaxDepth::Unbounded, &snapshot);
        assert_eq!(iter.iter().count(), 0);
    }
}
