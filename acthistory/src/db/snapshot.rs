use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::{ActResolver, ActSource};
use crate::error::{ActHistoryError, Result};
use crate::models::{
    Act, ActCategory, ActId, ActRef, ActRelationship, ActivityTime, RelationshipType,
};

// ---------------------------------------------------------------------------
// Snapshot file format
// ---------------------------------------------------------------------------

/// On-disk representation of a snapshot: `{ "acts": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub acts: Vec<SnapshotRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: ActId,
    pub category: String,
    #[serde(default)]
    pub start_time: Option<ActivityTime>,
    #[serde(default)]
    pub patient: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildLink>,
}

/// Outgoing link of a record. `category` may be omitted when the target is
/// part of the same snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildLink {
    pub id: ActId,
    #[serde(default)]
    pub category: Option<ActCategory>,
    #[serde(default, rename = "type")]
    pub relationship_type: Option<RelationshipType>,
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Immutable in-memory act store.
#[derive(Debug, Clone, Default)]
pub struct ActSnapshot {
    acts: HashMap<ActId, Act>,
}

impl ActSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Build a snapshot from fully-formed acts. Duplicate ids are rejected.
    pub fn from_acts(acts: impl IntoIterator<Item = Act>) -> Result<Self> {
        let mut map = HashMap::new();
        for act in acts {
            if map.contains_key(&act.id) {
                return Err(ActHistoryError::Validation(format!(
                    "Duplicate act id: {}",
                    act.id
                )));
            }
            map.insert(act.id.clone(), act);
        }
        Ok(Self { acts: map })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: SnapshotDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json_str(&contents)?;
        debug!(
            path = %path.display(),
            acts = snapshot.len(),
            "Loaded act snapshot"
        );
        Ok(snapshot)
    }

    pub fn from_document(document: SnapshotDocument) -> Result<Self> {
        let mut categories: HashMap<ActId, ActCategory> = HashMap::new();
        for record in &document.acts {
            let category = record.category.parse::<ActCategory>().map_err(|e| {
                ActHistoryError::Validation(format!("Act {}: {}", record.id, e))
            })?;
            if categories.insert(record.id.clone(), category).is_some() {
                return Err(ActHistoryError::Validation(format!(
                    "Duplicate act id: {}",
                    record.id
                )));
            }
        }

        let mut acts = HashMap::with_capacity(document.acts.len());
        for record in document.acts {
            let category = categories[&record.id];
            let source = ActRef::new(record.id.clone(), category);
            let mut relationships = Vec::with_capacity(record.children.len());
            for link in record.children {
                let known_category = categories.get(&link.id).copied();
                let target_category = match link.category.or(known_category) {
                    Some(category) => category,
                    None => {
                        warn!(
                            source = %record.id,
                            target = %link.id,
                            "Dropping link to act of unknown category"
                        );
                        continue;
                    }
                };
                relationships.push(ActRelationship {
                    source: source.clone(),
                    target: ActRef::new(link.id, target_category),
                    relationship_type: link.relationship_type,
                });
            }
            acts.insert(
                record.id.clone(),
                Act {
                    id: record.id,
                    category,
                    start_time: record.start_time,
                    patient: record.patient,
                    description: record.description,
                    relationships,
                },
            );
        }
        Ok(Self { acts })
    }

    pub fn len(&self) -> usize {
        self.acts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Act> {
        self.acts.values()
    }

    /// Events recorded against a patient, in no particular order.
    pub fn events_for_patient(&self, patient: &str) -> Vec<&Act> {
        self.acts_for_patient(patient)
            .into_iter()
            .filter(|act| act.category.is_event())
            .collect()
    }
}

impl ActResolver for ActSnapshot {
    fn get_act(&self, id: &ActId) -> Option<&Act> {
        self.acts.get(id)
    }
}

impl ActSource for ActSnapshot {
    fn acts_for_patient(&self, patient: &str) -> Vec<&Act> {
        self.acts
            .values()
            .filter(|act| act.patient.as_deref() == Some(patient))
            .collect()
    }

    fn parents_of(&self, id: &ActId) -> Vec<&Act> {
        let mut parents: Vec<&Act> = self
            .acts
            .values()
            .filter(|act| act.relationships.iter().any(|rel| &rel.target.id == id))
            .collect();
        parents.sort_by(|a, b| a.id.cmp(&b.id));
        parents
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a snapshot from acts and links.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    acts: Vec<Act>,
    links: Vec<(ActId, ActId, Option<RelationshipType>)>,
    dangling: Vec<(ActId, ActRef)>,
}

impl SnapshotBuilder {
    pub fn act(mut self, act: Act) -> Self {
        self.acts.push(act);
        self
    }

    /// Link `parent` to `child`; both must be added to the builder.
    pub fn link(mut self, parent: impl Into<ActId>, child: impl Into<ActId>) -> Self {
        self.links.push((parent.into(), child.into(), None));
        self
    }

    pub fn link_typed(
        mut self,
        parent: impl Into<ActId>,
        child: impl Into<ActId>,
        relationship_type: RelationshipType,
    ) -> Self {
        self.links
            .push((parent.into(), child.into(), Some(relationship_type)));
        self
    }

    /// Link `parent` to an act that is not part of the snapshot, as happens
    /// when the target has been deleted.
    pub fn link_missing(mut self, parent: impl Into<ActId>, target: ActRef) -> Self {
        self.dangling.push((parent.into(), target));
        self
    }

    pub fn build(self) -> Result<ActSnapshot> {
        let mut snapshot = ActSnapshot::from_acts(self.acts)?;
        let known: HashSet<ActId> = snapshot.acts.keys().cloned().collect();

        for (parent, child, relationship_type) in self.links {
            if !known.contains(&child) {
                return Err(ActHistoryError::Validation(format!(
                    "Link target {child} is not part of the snapshot"
                )));
            }
            let target = snapshot.acts[&child].to_ref();
            let parent_act = snapshot.acts.get_mut(&parent).ok_or_else(|| {
                ActHistoryError::Validation(format!(
                    "Link source {parent} is not part of the snapshot"
                ))
            })?;
            let source = parent_act.to_ref();
            parent_act.relationships.push(ActRelationship {
                source,
                target,
                relationship_type,
            });
        }

        for (parent, target) in self.dangling {
            let parent_act = snapshot.acts.get_mut(&parent).ok_or_else(|| {
                ActHistoryError::Validation(format!(
                    "Link source {parent} is not part of the snapshot"
                ))
            })?;
            let source = parent_act.to_ref();
            parent_act
                .relationships
                .push(ActRelationship::new(source, target));
        }

        Ok(snapshot)
    }
}
