use serde::{Deserialize, Serialize};

/// Identifier of an act, as assigned by the store that owns it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActId(String);

impl ActId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ActId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The kind of clinical or business record an act represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActCategory {
    #[serde(alias = "act.patientClinicalEvent")]
    Event,
    #[serde(alias = "act.patientClinicalProblem")]
    Problem,
    #[serde(alias = "act.patientClinicalNote")]
    Note,
    #[serde(alias = "act.patientClinicalAddendum")]
    Addendum,
    #[serde(alias = "act.patientWeight")]
    Weight,
    #[serde(alias = "act.patientMedication")]
    Medication,
    #[serde(alias = "act.patientInvestigation")]
    Investigation,
    #[serde(alias = "act.patientInvestigationVersion")]
    InvestigationVersion,
    #[serde(alias = "act.patientDocumentAttachment")]
    DocumentAttachment,
    #[serde(alias = "act.patientDocumentAttachmentVersion")]
    DocumentAttachmentVersion,
    #[serde(alias = "act.patientDocumentImage")]
    DocumentImage,
    #[serde(alias = "act.patientDocumentImageVersion")]
    DocumentImageVersion,
    #[serde(alias = "act.patientDocumentLetter")]
    DocumentLetter,
    #[serde(alias = "act.patientDocumentLetterVersion")]
    DocumentLetterVersion,
    #[serde(alias = "act.patientDocumentForm")]
    DocumentForm,
    #[serde(alias = "act.customerAccountInvoiceItem")]
    InvoiceItem,
}

impl ActCategory {
    pub const ALL: [ActCategory; 16] = [
        Self::Event,
        Self::Problem,
        Self::Note,
        Self::Addendum,
        Self::Weight,
        Self::Medication,
        Self::Investigation,
        Self::InvestigationVersion,
        Self::DocumentAttachment,
        Self::DocumentAttachmentVersion,
        Self::DocumentImage,
        Self::DocumentImageVersion,
        Self::DocumentLetter,
        Self::DocumentLetterVersion,
        Self::DocumentForm,
        Self::InvoiceItem,
    ];

    /// Categories that may be linked directly to a clinical event and selected
    /// individually in a history query. Versions and charges are excluded; they
    /// are brought in by their document or by the include-charges flag.
    pub const EVENT_ITEMS: [ActCategory; 10] = [
        Self::Problem,
        Self::Note,
        Self::Addendum,
        Self::Weight,
        Self::Medication,
        Self::Investigation,
        Self::DocumentAttachment,
        Self::DocumentImage,
        Self::DocumentLetter,
        Self::DocumentForm,
    ];

    /// The archetype short name the category is stored under.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Event => "act.patientClinicalEvent",
            Self::Problem => "act.patientClinicalProblem",
            Self::Note => "act.patientClinicalNote",
            Self::Addendum => "act.patientClinicalAddendum",
            Self::Weight => "act.patientWeight",
            Self::Medication => "act.patientMedication",
            Self::Investigation => "act.patientInvestigation",
            Self::InvestigationVersion => "act.patientInvestigationVersion",
            Self::DocumentAttachment => "act.patientDocumentAttachment",
            Self::DocumentAttachmentVersion => "act.patientDocumentAttachmentVersion",
            Self::DocumentImage => "act.patientDocumentImage",
            Self::DocumentImageVersion => "act.patientDocumentImageVersion",
            Self::DocumentLetter => "act.patientDocumentLetter",
            Self::DocumentLetterVersion => "act.patientDocumentLetterVersion",
            Self::DocumentForm => "act.patientDocumentForm",
            Self::InvoiceItem => "act.customerAccountInvoiceItem",
        }
    }

    /// The version category of a versioned document, if any.
    pub fn version_category(&self) -> Option<ActCategory> {
        match self {
            Self::Investigation => Some(Self::InvestigationVersion),
            Self::DocumentAttachment => Some(Self::DocumentAttachmentVersion),
            Self::DocumentImage => Some(Self::DocumentImageVersion),
            Self::DocumentLetter => Some(Self::DocumentLetterVersion),
            _ => None,
        }
    }

    /// The document category a version belongs to, if this is a version.
    pub fn versioned_document(&self) -> Option<ActCategory> {
        match self {
            Self::InvestigationVersion => Some(Self::Investigation),
            Self::DocumentAttachmentVersion => Some(Self::DocumentAttachment),
            Self::DocumentImageVersion => Some(Self::DocumentImage),
            Self::DocumentLetterVersion => Some(Self::DocumentLetter),
            _ => None,
        }
    }

    pub fn is_version(&self) -> bool {
        self.versioned_document().is_some()
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event)
    }
}

impl std::fmt::Display for ActCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Problem => write!(f, "problem"),
            Self::Note => write!(f, "note"),
            Self::Addendum => write!(f, "addendum"),
            Self::Weight => write!(f, "weight"),
            Self::Medication => write!(f, "medication"),
            Self::Investigation => write!(f, "investigation"),
            Self::InvestigationVersion => write!(f, "investigation_version"),
            Self::DocumentAttachment => write!(f, "document_attachment"),
            Self::DocumentAttachmentVersion => write!(f, "document_attachment_version"),
            Self::DocumentImage => write!(f, "document_image"),
            Self::DocumentImageVersion => write!(f, "document_image_version"),
            Self::DocumentLetter => write!(f, "document_letter"),
            Self::DocumentLetterVersion => write!(f, "document_letter_version"),
            Self::DocumentForm => write!(f, "document_form"),
            Self::InvoiceItem => write!(f, "invoice_item"),
        }
    }
}

impl std::str::FromStr for ActCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(category) = Self::ALL
            .iter()
            .find(|c| c.short_name().eq_ignore_ascii_case(trimmed))
        {
            return Ok(*category);
        }
        match trimmed.to_lowercase().as_str() {
            "event" | "visit" => Ok(Self::Event),
            "problem" => Ok(Self::Problem),
            "note" => Ok(Self::Note),
            "addendum" => Ok(Self::Addendum),
            "weight" => Ok(Self::Weight),
            "medication" => Ok(Self::Medication),
            "investigation" => Ok(Self::Investigation),
            "investigation_version" => Ok(Self::InvestigationVersion),
            "document_attachment" | "attachment" => Ok(Self::DocumentAttachment),
            "document_attachment_version" => Ok(Self::DocumentAttachmentVersion),
            "document_image" | "image" => Ok(Self::DocumentImage),
            "document_image_version" => Ok(Self::DocumentImageVersion),
            "document_letter" | "letter" => Ok(Self::DocumentLetter),
            "document_letter_version" => Ok(Self::DocumentLetterVersion),
            "document_form" | "form" => Ok(Self::DocumentForm),
            "invoice_item" | "charge" => Ok(Self::InvoiceItem),
            _ => Err(format!("Unknown act category: {s}")),
        }
    }
}

/// Kind of relationship linking a parent act to a child act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    #[serde(alias = "actRelationship.patientClinicalEventItem")]
    EventItem,
    #[serde(alias = "actRelationship.patientClinicalProblemItem")]
    ProblemItem,
    #[serde(alias = "actRelationship.patientClinicalEventChargeItem")]
    EventChargeItem,
    #[serde(alias = "actRelationship.patientDocumentVersion")]
    DocumentVersion,
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventItem => write!(f, "event_item"),
            Self::ProblemItem => write!(f, "problem_item"),
            Self::EventChargeItem => write!(f, "event_charge_item"),
            Self::DocumentVersion => write!(f, "document_version"),
        }
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "event_item" | "actrelationship.patientclinicaleventitem" => Ok(Self::EventItem),
            "problem_item" | "actrelationship.patientclinicalproblemitem" => Ok(Self::ProblemItem),
            "event_charge_item" | "actrelationship.patientclinicaleventchargeitem" => {
                Ok(Self::EventChargeItem)
            }
            "document_version" | "actrelationship.patientdocumentversion" => {
                Ok(Self::DocumentVersion)
            }
            _ => Err(format!("Unknown relationship type: {s}")),
        }
    }
}

/// Order in which siblings sharing a parent are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Self::Ascending
        } else {
            Self::Descending
        }
    }

    pub fn is_ascending(&self) -> bool {
        matches!(self, Self::Ascending)
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(format!("Unknown sort direction: {s}")),
        }
    }
}
