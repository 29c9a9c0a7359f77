use std::collections::HashSet;

use crate::hierarchy::{ActHierarchyFilter, CategoryPredicate, InclusionPolicy};
use crate::models::{Act, ActCategory, SortDirection};

/// Inclusion rules of the patient medical history.
///
/// Events are never children, and a document version is only followed from
/// the document it is a version of.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryPolicy;

impl InclusionPolicy for HistoryPolicy {
    fn include_child(&self, child: &Act, parent: &Act) -> bool {
        if child.category.is_event() {
            return false;
        }
        match child.category.versioned_document() {
            Some(document) => parent.is_a(document),
            None => true,
        }
    }
}

pub type PatientHistoryFilter = ActHierarchyFilter<HistoryPolicy>;

/// Filter following only relationships to `categories`. An empty set follows
/// nothing.
pub fn history_filter(
    categories: impl IntoIterator<Item = ActCategory>,
    direction: SortDirection,
) -> PatientHistoryFilter {
    let categories: HashSet<ActCategory> = categories
        .into_iter()
        .filter(|category| !category.is_event())
        .collect();
    ActHierarchyFilter::with_policy(CategoryPredicate::Include(categories), HistoryPolicy)
        .with_direction(direction)
}
