use crate::{ColumnRole, ColumnSelection, ExtractPhase, JobStatus, JobSummary, ProgressSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A one-line message for the status area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTabView {
    pub id: String,
    pub name: String,
    pub active: bool,
    /// Another sheet holds the column selection.
    pub locked: bool,
    pub total_row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub file_name: Option<String>,
    pub sheets: Vec<SheetTabView>,
    pub selection: Option<ColumnSelection>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub column_roles: Vec<ColumnRole>,
    pub total_row_count: usize,
    pub phase: ExtractPhase,
    pub request_id: Option<String>,
    pub job_status: Option<JobStatus>,
    pub progress: Option<ProgressSnapshot>,
    pub summary: Option<JobSummary>,
    pub can_extract: bool,
    pub can_download: bool,
    pub notice: Option<Notice>,
    pub dirty: bool,
}
