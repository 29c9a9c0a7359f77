//! Filtered, depth-bounded traversal of the act hierarchy.

pub mod filter;
pub mod iterator;
mod tree;

pub use filter::{
    compare_start_time, ActHierarchyFilter, CategoryPredicate, ExcludeChildless, IncludeAll,
    InclusionPolicy,
};
pub use iterator::{Acts, ActHierarchyIterator, Entries, MaxDepth, Placement};
pub use tree::HierarchyEntry;
