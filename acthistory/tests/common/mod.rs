#![allow(dead_code)]

use std::path::{Path, PathBuf};

use acthistory::db::ActSnapshot;
use acthistory::hierarchy::HierarchyEntry;
use acthistory::models::{Act, ActCategory, ActivityTime};
use chrono::{TimeZone, Utc};

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Two dated visits and one undated visit of patient `pet-42`. The first
/// visit has a note linked both to the visit and to its problem, a letter
/// with a version, a charge and a link to a deleted note.
pub fn patient_history() -> ActSnapshot {
    ActSnapshot::from_path(fixture_path("patient_history.json"))
        .unwrap_or_else(|e| panic!("Failed to load patient history fixture: {e}"))
}

/// Start time on 2014-08-25 at 09:00 plus `minutes`.
pub fn at(minutes: u32) -> ActivityTime {
    ActivityTime::Instant(Utc.with_ymd_and_hms(2014, 8, 25, 9, minutes, 0).unwrap())
}

/// Event E with weight W, notes N2 and N1 and problem P linked directly, in
/// that chronological order. N2 is also an item of P.
pub fn visit_with_problem() -> ActSnapshot {
    ActSnapshot::builder()
        .act(Act::new("E", ActCategory::Event).with_start_time(at(0)))
        .act(Act::new("W", ActCategory::Weight).with_start_time(at(1)))
        .act(Act::new("N2", ActCategory::Note).with_start_time(at(2)))
        .act(Act::new("P", ActCategory::Problem).with_start_time(at(3)))
        .act(Act::new("N1", ActCategory::Note).with_start_time(at(4)))
        .link("E", "W")
        .link("E", "N2")
        .link("E", "P")
        .link("E", "N1")
        .link("P", "N2")
        .build()
        .expect("valid snapshot")
}

pub fn ids<'a>(acts: impl IntoIterator<Item = &'a Act>) -> Vec<String> {
    acts.into_iter().map(|act| act.id.to_string()).collect()
}

pub fn entry_ids(entries: &[HierarchyEntry<'_>]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| format!("{}@{}", entry.act.id, entry.depth))
        .collect()
}

/// Event E with problems P1 and P2 and note N linked directly. Both problems
/// also claim N.
pub fn visit_with_two_problems() -> ActSnapshot {
    ActSnapshot::builder()
        .act(Act::new("E", ActCategory::Event).with_start_time(at(0)))
        .act(Act::new("P1", ActCategory::Problem).with_start_time(at(1)))
        .act(Act::new("P2", ActCategory::Problem).with_start_time(at(3)))
        .act(Act::new("N", ActCategory::Note).with_start_time(at(5)))
        .link("E", "P1")
        .link("E", "P2")
        .link("E", "N")
        .link("P1", "N")
        .link("P2", "N")
        .build()
        .expect("valid snapshot")
}
