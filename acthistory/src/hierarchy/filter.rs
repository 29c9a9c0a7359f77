use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::trace;

use crate::db::ActResolver;
use crate::models::{Act, ActCategory, ActRelationship, SortDirection};

/// Selects relationships by the category of their target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryPredicate {
    #[default]
    All,
    Include(HashSet<ActCategory>),
    Exclude(HashSet<ActCategory>),
}

impl CategoryPredicate {
    pub fn include(categories: impl IntoIterator<Item = ActCategory>) -> Self {
        Self::Include(categories.into_iter().collect())
    }

    pub fn exclude(categories: impl IntoIterator<Item = ActCategory>) -> Self {
        Self::Exclude(categories.into_iter().collect())
    }

    pub fn matches(&self, category: ActCategory) -> bool {
        match self {
            Self::All => true,
            Self::Include(categories) => categories.contains(&category),
            Self::Exclude(categories) => !categories.contains(&category),
        }
    }

    /// True if no category can ever match.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Include(categories) if categories.is_empty())
    }
}

/// Hooks that refine which acts a filter lets through.
///
/// Every hook defaults to accepting everything.
pub trait InclusionPolicy: Send + Sync {
    /// Determines if an act should appear at all. Evaluated before its
    /// children are resolved.
    fn include_act(&self, _act: &Act) -> bool {
        true
    }

    /// Determines if a relationship should be followed. Evaluated after the
    /// category predicate and before the target is resolved.
    fn include_relationship(&self, _relationship: &ActRelationship) -> bool {
        true
    }

    /// Determines if a resolved child should be kept beneath `parent`.
    fn include_child(&self, _child: &Act, _parent: &Act) -> bool {
        true
    }

    /// Determines if the parent should still appear once its children are
    /// known, e.g. to drop parents without children.
    fn include_parent(&self, _parent: &Act, _children: &[&Act]) -> bool {
        true
    }
}

/// Policy that accepts every act.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeAll;

impl InclusionPolicy for IncludeAll {}

/// Policy that drops parents with no surviving children.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcludeChildless;

impl InclusionPolicy for ExcludeChildless {
    fn include_parent(&self, _parent: &Act, children: &[&Act]) -> bool {
        !children.is_empty()
    }
}

/// Orders acts on activity start time. Acts without a usable start time sort
/// high; ties are broken on act id so the order is total.
pub fn compare_start_time(a: &Act, b: &Act) -> Ordering {
    match (a.activity_start(), b.activity_start()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

/// Selects and orders the children of an act.
#[derive(Debug, Clone, Default)]
pub struct ActHierarchyFilter<P = IncludeAll> {
    predicate: CategoryPredicate,
    policy: P,
    direction: SortDirection,
}

impl ActHierarchyFilter<IncludeAll> {
    pub fn new(predicate: CategoryPredicate) -> Self {
        Self::with_policy(predicate, IncludeAll)
    }

    /// Filter that follows every relationship.
    pub fn all() -> Self {
        Self::new(CategoryPredicate::All)
    }

    /// Filter that only follows relationships to the given categories.
    pub fn including(categories: impl IntoIterator<Item = ActCategory>) -> Self {
        Self::new(CategoryPredicate::include(categories))
    }

    /// Filter that follows relationships to anything but the given categories.
    pub fn excluding(categories: impl IntoIterator<Item = ActCategory>) -> Self {
        Self::new(CategoryPredicate::exclude(categories))
    }
}

impl<P: InclusionPolicy> ActHierarchyFilter<P> {
    pub fn with_policy(predicate: CategoryPredicate, policy: P) -> Self {
        Self {
            predicate,
            policy,
            direction: SortDirection::Ascending,
        }
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn predicate(&self) -> &CategoryPredicate {
        &self.predicate
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Determines if `act` may appear, without resolving its children.
    pub fn includes(&self, act: &Act) -> bool {
        self.policy.include_act(act)
    }

    /// Returns the ordered children of `act`, or `None` if the policy
    /// excludes `act` itself.
    ///
    /// The predicate is tested on the relationship's reference before the
    /// target is resolved. A target whose resolved category differs from its
    /// reference must match the predicate as well, so an edge is only
    /// followed when both categories are selected.
    pub fn evaluate<'a>(
        &self,
        act: &'a Act,
        resolver: &'a dyn ActResolver,
    ) -> Option<Vec<&'a Act>> {
        if !self.policy.include_act(act) {
            return None;
        }

        let mut children: Vec<&'a Act> = Vec::new();
        for relationship in &act.relationships {
            if !self.predicate.matches(relationship.target.category)
                || !self.policy.include_relationship(relationship)
            {
                continue;
            }
            let Some(child) = resolver.resolve(&relationship.target) else {
                trace!(
                    parent = %act.id,
                    target = %relationship.target.id,
                    "Skipping unresolvable relationship target"
                );
                continue;
            };
            if child.category != relationship.target.category
                && !self.predicate.matches(child.category)
            {
                trace!(
                    parent = %act.id,
                    target = %child.id,
                    category = %child.category,
                    "Skipping target whose category does not match its reference"
                );
                continue;
            }
            if children.iter().any(|existing| existing.id == child.id) {
                continue;
            }
            if self.policy.include_child(child, act) {
                children.push(child);
            }
        }

        if !self.policy.include_parent(act, &children) {
            return None;
        }
        self.sort(&mut children);
        Some(children)
    }

    /// Returns the ordered children of `act`. Empty when none survive or
    /// `act` is excluded.
    pub fn filter<'a>(&self, act: &'a Act, resolver: &'a dyn ActResolver) -> Vec<&'a Act> {
        self.evaluate(act, resolver).unwrap_or_default()
    }

    pub fn sort(&self, acts: &mut [&Act]) {
        match self.direction {
            SortDirection::Ascending => acts.sort_by(|a, b| compare_start_time(a, b)),
            SortDirection::Descending => acts.sort_by(|a, b| compare_start_time(b, a)),
        }
    }
}
