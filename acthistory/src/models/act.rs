use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActCategory, ActId, ActivityTime, RelationshipType};

/// Reference to an act: its identifier and the category it was stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActRef {
    pub id: ActId,
    pub category: ActCategory,
}

impl ActRef {
    pub fn new(id: impl Into<ActId>, category: ActCategory) -> Self {
        Self {
            id: id.into(),
            category,
        }
    }
}

/// Directed link from a parent act to a child act
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActRelationship {
    pub source: ActRef,
    pub target: ActRef,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
}

impl ActRelationship {
    pub fn new(source: ActRef, target: ActRef) -> Self {
        Self {
            source,
            target,
            relationship_type: None,
        }
    }

    pub fn with_type(mut self, relationship_type: RelationshipType) -> Self {
        self.relationship_type = Some(relationship_type);
        self
    }
}

/// A clinical or business record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Act {
    pub id: ActId,
    pub category: ActCategory,
    #[serde(default)]
    pub start_time: Option<ActivityTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relationships where this act is the source
    #[serde(default)]
    pub relationships: Vec<ActRelationship>,
}

impl Act {
    pub fn new(id: impl Into<ActId>, category: ActCategory) -> Self {
        Self {
            id: id.into(),
            category,
            start_time: None,
            patient: None,
            description: None,
            relationships: Vec::new(),
        }
    }

    pub fn with_start_time(mut self, start_time: impl Into<ActivityTime>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn with_patient(mut self, patient: impl Into<String>) -> Self {
        self.patient = Some(patient.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn to_ref(&self) -> ActRef {
        ActRef::new(self.id.clone(), self.category)
    }

    /// Add a relationship from this act to `child`.
    pub fn add_child(&mut self, child: &Act, relationship_type: Option<RelationshipType>) {
        self.relationships.push(ActRelationship {
            source: self.to_ref(),
            target: child.to_ref(),
            relationship_type,
        });
    }

    /// Normalised activity start time. `None` when absent or unparsable.
    pub fn activity_start(&self) -> Option<DateTime<Utc>> {
        self.start_time.as_ref().and_then(ActivityTime::normalize)
    }

    pub fn is_a(&self, category: ActCategory) -> bool {
        self.category == category
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_add_child_records_refs() {
        let mut event = Act::new("e1", ActCategory::Event);
        let note = Act::new("n1", ActCategory::Note);
        event.add_child(&note, Some(RelationshipType::EventItem));

        assert_eq!(event.relationships.len(), 1);
        let rel = &event.relationships[0];
        assert_eq!(rel.source, ActRef::new("e1", ActCategory::Event));
        assert_eq!(rel.target, ActRef::new("n1", ActCategory::Note));
        assert_eq!(rel.relationship_type, Some(RelationshipType::EventItem));
    }

    #[test]
    fn test_activity_start_normalizes() {
        let instant = Utc.with_ymd_and_hms(2014, 8, 25, 9, 0, 0).unwrap();
        let act = Act::new("w1", ActCategory::Weight)
            .with_start_time(ActivityTime::EpochMillis(instant.timestamp_millis()));
        assert_eq!(act.activity_start(), Some(instant));

        let undated = Act::new("w2", ActCategory::Weight);
        assert_eq!(undated.activity_start(), None);
    }

    #[test]
    fn test_act_deserializes_with_defaults() {
        let json = r#"{
            "id": "n1",
            "category": "act.patientClinicalNote",
            "start_time": "2014-08-25T10:00:00Z"
        }"#;
        let act: Act = serde_json::from_str(json).unwrap();
        assert_eq!(act.id, ActId::from("n1"));
        assert!(act.is_a(ActCategory::Note));
        assert!(act.relationships.is_empty());
        assert!(act.patient.is_none());
    }

    #[test]
    fn test_relationship_type_field_is_optional() {
        let json = r#"{
            "source": {"id": "e1", "category": "event"},
            "target": {"id": "p1", "category": "problem"}
        }"#;
        let rel: ActRelationship = serde_json::from_str(json).unwrap();
        assert!(rel.relationship_type.is_none());

        let typed = rel.with_type(RelationshipType::EventItem);
        let json = serde_json::to_string(&typed).unwrap();
        assert!(json.contains("\"type\":\"event_item\""));
    }
}
