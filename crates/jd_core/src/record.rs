use std::fmt;

pub const DERIVED_FIELD_COUNT: usize = 8;

/// Preview labels of the derived columns, in insertion order.
pub const DERIVED_FIELD_LABELS: [&str; DERIVED_FIELD_COUNT] = [
    "Bill Rate",
    "Duration",
    "Experience",
    "GBAMS/RGS ID",
    "Location",
    "Skills",
    "Role Description",
    "MSP Owner",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Success,
    Partial,
    Failed,
}

impl RecordStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => Some(Self::Success),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Success => write!(f, "success"),
            RecordStatus::Partial => write!(f, "partial"),
            RecordStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Which model produced a record, and when.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Provenance {
    pub model_used: Option<String>,
    pub status: Option<RecordStatus>,
    pub timestamp: Option<String>,
}

/// Structured fields extracted from one job description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionRecord {
    pub bill_rate: Option<String>,
    pub duration: Option<String>,
    pub experience: Option<String>,
    pub external_id: Option<String>,
    pub location: Option<String>,
    pub skills: Option<Vec<String>>,
    pub role_description: Option<String>,
    pub owner: Option<String>,
    pub provenance: Provenance,
}

impl ExtractionRecord {
    /// Display strings in [`DERIVED_FIELD_LABELS`] order. Missing fields are
    /// empty, skills are joined with `", "`.
    pub fn derived_values(&self) -> [String; DERIVED_FIELD_COUNT] {
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }

        [
            text(&self.bill_rate),
            text(&self.duration),
            text(&self.experience),
            text(&self.external_id),
            text(&self.location),
            self.skills
                .as_ref()
                .map(|skills| skills.join(", "))
                .unwrap_or_default(),
            text(&self.role_description),
            text(&self.owner),
        ]
    }
}
