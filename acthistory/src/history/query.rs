use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::iterator::PatientHistoryIterator;
use crate::config::Config;
use crate::date::RelativeDateParser;
use crate::db::ActSource;
use crate::error::{ActHistoryError, Result};
use crate::hierarchy::MaxDepth;
use crate::models::{Act, ActCategory, SortDirection};

const SUMMARY_DEPTH: NonZeroUsize = NonZeroUsize::MIN.saturating_add(1);

/// Item categories selected for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySelection {
    #[default]
    All,
    Single(ActCategory),
}

impl CategorySelection {
    /// The selected categories, with the versions of selected documents.
    pub fn categories(&self) -> BTreeSet<ActCategory> {
        let selected: Vec<ActCategory> = match self {
            Self::All => ActCategory::EVENT_ITEMS.to_vec(),
            Self::Single(category) => vec![*category],
        };
        selected
            .into_iter()
            .flat_map(|category| std::iter::once(category).chain(category.version_category()))
            .collect()
    }
}

impl std::fmt::Display for CategorySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Single(category) => write!(f, "{}", category),
        }
    }
}

impl std::str::FromStr for CategorySelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let category: ActCategory = s.parse()?;
        if category.is_event() || category.is_version() {
            return Err(format!("Category cannot be selected: {s}"));
        }
        Ok(Self::Single(category))
    }
}

/// The medical history of one patient: which events, which of their items,
/// in what order and to what depth.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientHistoryQuery {
    patient: String,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    selection: CategorySelection,
    include_charges: bool,
    direction: SortDirection,
    max_depth: MaxDepth,
}

impl PatientHistoryQuery {
    pub fn new(patient: impl Into<String>) -> Self {
        Self {
            patient: patient.into(),
            from: None,
            to: None,
            selection: CategorySelection::All,
            include_charges: true,
            direction: SortDirection::Ascending,
            max_depth: MaxDepth::Unbounded,
        }
    }

    /// Query initialised from the configured defaults.
    pub fn from_config(patient: impl Into<String>, config: &Config) -> Result<Self> {
        Ok(Self::new(patient)
            .with_charges(config.include_charges)
            .with_direction(config.direction())
            .with_max_depth(config.depth()?))
    }

    pub fn with_from(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: NaiveDate) -> Self {
        self.to = Some(to);
        self
    }

    /// Set the lower bound from a `YYYY-MM-DD` date or a relative expression
    /// such as `-1y`.
    pub fn with_from_expression(self, expression: &str, reference: NaiveDate) -> Result<Self> {
        let from = parse_bound(expression, reference)?;
        Ok(self.with_from(from))
    }

    /// Set the upper bound from a `YYYY-MM-DD` date or a relative expression
    /// such as `0me`.
    pub fn with_to_expression(self, expression: &str, reference: NaiveDate) -> Result<Self> {
        let to = parse_bound(expression, reference)?;
        Ok(self.with_to(to))
    }

    pub fn with_selection(mut self, selection: CategorySelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_charges(mut self, include_charges: bool) -> Self {
        self.include_charges = include_charges;
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_max_depth(mut self, max_depth: MaxDepth) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn patient(&self) -> &str {
        &self.patient
    }

    pub fn range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.from, self.to)
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn max_depth(&self) -> MaxDepth {
        self.max_depth
    }

    /// Categories followed beneath each event.
    pub fn categories(&self) -> BTreeSet<ActCategory> {
        let mut categories = self.selection.categories();
        if self.include_charges {
            categories.insert(ActCategory::InvoiceItem);
        }
        categories
    }

    /// True if the act started within the date range. Undated acts only
    /// match an open range.
    pub fn in_range(&self, act: &Act) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = act.start_time.as_ref().and_then(|time| time.date()) else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// The patient's events within range, most recent first. Undated events
    /// come last.
    pub fn events<'a, S: ActSource>(&self, source: &'a S) -> Vec<&'a Act> {
        let mut events: Vec<&'a Act> = source
            .acts_for_patient(&self.patient)
            .into_iter()
            .filter(|act| act.category.is_event() && self.in_range(act))
            .collect();
        events.sort_by(|a, b| most_recent_first(a, b));
        debug!(
            patient = %self.patient,
            events = events.len(),
            "Selected patient history events"
        );
        events
    }

    /// Full history traversal.
    pub fn iter<'a, S: ActSource>(&self, source: &'a S) -> PatientHistoryIterator<'a> {
        self.build(source, self.max_depth)
    }

    /// Events and their immediate items only.
    pub fn summary<'a, S: ActSource>(&self, source: &'a S) -> PatientHistoryIterator<'a> {
        let depth = match self.max_depth {
            MaxDepth::Limited(max) if max.get() < SUMMARY_DEPTH.get() => self.max_depth,
            _ => MaxDepth::Limited(SUMMARY_DEPTH),
        };
        self.build(source, depth)
    }

    fn build<'a, S: ActSource>(
        &self,
        source: &'a S,
        max_depth: MaxDepth,
    ) -> PatientHistoryIterator<'a> {
        PatientHistoryIterator::with_max_depth(
            self.events(source),
            self.categories(),
            self.direction,
            max_depth,
            source,
        )
    }
}

fn parse_bound(expression: &str, reference: NaiveDate) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(expression.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    RelativeDateParser::parse(expression, reference).ok_or_else(|| {
        ActHistoryError::Validation(format!("Invalid date or relative date: {expression}"))
    })
}

fn most_recent_first(a: &Act, b: &Act) -> Ordering {
    match (a.activity_start(), b.activity_start()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}
