use std::collections::HashSet;

use tracing::debug;

use super::filter::{history_filter, HistoryPolicy};
use crate::db::ActResolver;
use crate::hierarchy::{
    ActHierarchyIterator, Acts, Entries, HierarchyEntry, MaxDepth, Placement,
};
use crate::models::{Act, ActCategory, SortDirection};

/// Categories that are moved beneath a problem when they are linked both to
/// the event and to one of the event's problems.
pub fn reparentable_categories() -> HashSet<ActCategory> {
    ActCategory::ALL
        .into_iter()
        .filter(|category| !matches!(category, ActCategory::Event | ActCategory::Problem))
        .collect()
}

/// Traverses the medical history of clinical events.
///
/// Each event is followed by its items, restricted to the selected
/// categories and sorted on start time. Items that belong to one of the
/// event's problems appear once, beneath the problem.
pub struct PatientHistoryIterator<'a> {
    inner: ActHierarchyIterator<'a, HistoryPolicy>,
}

impl<'a> PatientHistoryIterator<'a> {
    /// Unbounded traversal beneath `events`. Non-event roots are skipped.
    pub fn new(
        events: impl IntoIterator<Item = &'a Act>,
        categories: impl IntoIterator<Item = ActCategory>,
        direction: SortDirection,
        resolver: &'a dyn ActResolver,
    ) -> Self {
        Self::with_max_depth(events, categories, direction, MaxDepth::Unbounded, resolver)
    }

    pub fn with_max_depth(
        events: impl IntoIterator<Item = &'a Act>,
        categories: impl IntoIterator<Item = ActCategory>,
        direction: SortDirection,
        max_depth: MaxDepth,
        resolver: &'a dyn ActResolver,
    ) -> Self {
        let mut skipped = 0usize;
        let events: Vec<&'a Act> = events
            .into_iter()
            .filter(|act| {
                let keep = act.category.is_event();
                if !keep {
                    skipped += 1;
                }
                keep
            })
            .collect();
        if skipped > 0 {
            debug!(skipped, "Ignoring history roots that are not events");
        }

        let inner = ActHierarchyIterator::new(
            events,
            history_filter(categories, direction),
            max_depth,
            resolver,
        )
        .with_placement(Placement::Categories(reparentable_categories()));
        Self { inner }
    }

    pub fn events(&self) -> &[&'a Act] {
        self.inner.roots()
    }

    pub fn max_depth(&self) -> MaxDepth {
        self.inner.max_depth()
    }

    pub fn direction(&self) -> SortDirection {
        self.inner.filter().direction()
    }

    pub fn entries(&self) -> Entries<'_, 'a, HistoryPolicy> {
        self.inner.entries()
    }

    pub fn iter(&self) -> Acts<'_, 'a, HistoryPolicy> {
        self.inner.iter()
    }

    /// Entries beneath a single event.
    pub fn flatten_event(&self, event: &'a Act) -> Vec<HierarchyEntry<'a>> {
        if !event.category.is_event() {
            return Vec::new();
        }
        self.inner.flatten_root(event)
    }
}

impl<'i, 'a> IntoIterator for &'i PatientHistoryIterator<'a> {
    type Item = &'a Act;
    type IntoIter = Acts<'i, 'a, HistoryPolicy>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
