use std::collections::BTreeMap;
use std::fmt;

use jd_core::{
    ExtractionJob, ExtractionRecord, JobSummary, ProgressSnapshot, Provenance, RecordStatus,
    SheetGrid, Workbook,
};
use serde::{Deserialize, Serialize};

use crate::persist::PersistError;

/// Response of the upload endpoint: every sheet of the file, parsed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "fileName", alias = "file_name")]
    pub file_name: String,
    pub sheets: Vec<SheetPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetPayload {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(rename = "totalRows", alias = "total_rows", default)]
    pub total_rows: usize,
}

impl UploadResponse {
    /// Converts to the preview model, keeping the first `row_window` rows of
    /// each sheet.
    pub fn into_workbook(self, row_window: usize) -> Workbook {
        Workbook {
            file_name: self.file_name,
            sheets: self
                .sheets
                .into_iter()
                .map(|sheet| {
                    let total_row_count = sheet.total_rows.max(sheet.rows.len());
                    SheetGrid {
                        id: sheet.id,
                        name: sheet.name,
                        headers: sheet.headers,
                        rows: sheet.rows,
                        total_row_count,
                    }
                    .with_row_window(row_window)
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmitResponse {
    pub request_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub results: Vec<ResultRow>,
    #[serde(default)]
    pub total_processed: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
}

impl StatusResponse {
    pub fn is_complete(&self) -> bool {
        self.status.eq_ignore_ascii_case("complete")
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            total_processed: self.total_processed,
            success_count: self.success_count,
            failure_count: self.failure_count,
        }
    }

    pub fn into_results(self) -> BTreeMap<usize, ExtractionRecord> {
        self.results
            .into_iter()
            .map(|row| (row.row_index, row.extracted_data.into()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResultRow {
    pub row_index: usize,
    #[serde(default)]
    pub original_jd: String,
    #[serde(default)]
    pub extracted_data: ExtractedData,
}

/// Wire shape of one extraction record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ExtractedData {
    pub bill_rate: Option<String>,
    pub duration: Option<String>,
    pub experience_required: Option<String>,
    pub gbams_rgs_id: Option<String>,
    pub ai_location: Option<String>,
    pub skills: Option<Vec<String>>,
    pub role_description: Option<String>,
    pub msp_owner: Option<String>,
    pub ai_model_used: Option<String>,
    pub ai_extraction_status: Option<String>,
    pub ai_extraction_timestamp: Option<String>,
}

impl From<ExtractedData> for ExtractionRecord {
    fn from(data: ExtractedData) -> Self {
        ExtractionRecord {
            bill_rate: data.bill_rate,
            duration: data.duration,
            experience: data.experience_required,
            external_id: data.gbams_rgs_id,
            location: data.ai_location,
            skills: data.skills,
            role_description: data.role_description,
            owner: data.msp_owner,
            provenance: Provenance {
                model_used: data.ai_model_used,
                status: data
                    .ai_extraction_status
                    .as_deref()
                    .and_then(RecordStatus::parse),
                timestamp: data.ai_extraction_timestamp,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProgressResponse {
    #[serde(default)]
    pub request_id: String,
    pub total: u64,
    pub processed: u64,
    #[serde(default)]
    pub complete: bool,
}

impl From<ProgressResponse> for ProgressSnapshot {
    fn from(progress: ProgressResponse) -> Self {
        ProgressSnapshot {
            processed: progress.processed,
            total: progress.total,
            complete: progress.complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TextExtractRequest<'a> {
    pub jd_text: &'a str,
}

/// What the orchestrator reports while a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// New progress for a polling job.
    Progress(ExtractionJob),
    /// The job reached `Complete`, `Failed` or `TimedOut`.
    Finished(ExtractionJob),
}

/// One failed call to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: FailureKind,
    pub message: String,
}

impl ServiceError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// How a polling task should read this failure.
    pub fn poll_failure(&self) -> PollFailure {
        match self.kind {
            FailureKind::NotFound => PollFailure::NotReady,
            _ => PollFailure::Transport,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    NotFound,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    TooLarge { max_bytes: u64, actual: Option<u64> },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
        }
    }
}

/// Transient polling failures, split for logging only. Both kinds are
/// retried the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFailure {
    /// The service does not know the job yet (404 / pending).
    NotReady,
    /// Anything else: connection, timeout, 5xx, bad payload.
    Transport,
}

/// Failures surfaced to the user.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("submission failed: {0}")]
    Submit(#[source] ServiceError),
    #[error("job {request_id} timed out after {attempts} status checks")]
    Timeout { request_id: String, attempts: u32 },
    #[error("download failed: {0}")]
    Download(#[source] ServiceError),
    /// The download arrived but could not be written out.
    #[error("saving results failed: {0}")]
    Save(#[from] PersistError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_accepts_both_row_count_spellings() {
        let camel: UploadResponse = serde_json::from_value(json!({
            "fileName": "a.xlsx",
            "sheets": [{"id": "sheet_0_A", "name": "A", "headers": ["H"], "rows": [["x"]], "totalRows": 7}]
        }))
        .unwrap();
        let snake: UploadResponse = serde_json::from_value(json!({
            "fileName": "a.xlsx",
            "sheets": [{"id": "sheet_0_A", "name": "A", "headers": ["H"], "rows": [["x"]], "total_rows": 7}]
        }))
        .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.sheets[0].total_rows, 7);
    }

    #[test]
    fn workbook_conversion_applies_row_window() {
        let upload = UploadResponse {
            file_name: "a.xlsx".into(),
            sheets: vec![SheetPayload {
                id: "sheet_0_A".into(),
                name: "A".into(),
                headers: vec!["H".into()],
                rows: (0..60).map(|i| vec![i.to_string()]).collect(),
                total_rows: 60,
            }],
        };
        let book = upload.into_workbook(50);
        assert_eq!(book.sheets[0].rows.len(), 50);
        assert_eq!(book.sheets[0].total_row_count, 60);
    }

    #[test]
    fn extracted_data_maps_wire_names() {
        let data: ExtractedData = serde_json::from_value(json!({
            "bill_rate": "$80/hr",
            "min_bill_rate": 80.0,
            "experience_required": "5+ years",
            "gbams_rgs_id": "RGS-42",
            "ai_location": "Remote",
            "skills": ["Rust", "SQL"],
            "msp_owner": "Acme",
            "ai_model_used": "mistral:7b",
            "ai_extraction_status": "partial",
            "ai_extraction_timestamp": "2024-05-01T10:00:00"
        }))
        .unwrap();
        let record = ExtractionRecord::from(data);
        assert_eq!(record.experience.as_deref(), Some("5+ years"));
        assert_eq!(record.external_id.as_deref(), Some("RGS-42"));
        assert_eq!(record.location.as_deref(), Some("Remote"));
        assert_eq!(record.owner.as_deref(), Some("Acme"));
        assert_eq!(record.duration, None);
        assert_eq!(record.provenance.status, Some(RecordStatus::Partial));
        assert_eq!(record.provenance.model_used.as_deref(), Some("mistral:7b"));
    }

    #[test]
    fn processing_status_has_no_results() {
        let status: StatusResponse =
            serde_json::from_value(json!({"status": "processing", "request_id": "r"})).unwrap();
        assert!(!status.is_complete());
        assert!(status.into_results().is_empty());
    }

    #[test]
    fn not_found_is_not_ready() {
        let err = ServiceError::new(FailureKind::NotFound, "missing");
        assert_eq!(err.poll_failure(), PollFailure::NotReady);
        let err = ServiceError::new(FailureKind::HttpStatus(500), "boom");
        assert_eq!(err.poll_failure(), PollFailure::Transport);
    }
}
