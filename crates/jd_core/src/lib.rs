//! JD preview core: selection locking, job model, preview projection and the
//! pure workspace state machine. No IO lives here.
mod effect;
mod grid;
mod job;
mod msg;
mod projector;
mod record;
mod selection;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use grid::{SheetGrid, Workbook, PREVIEW_ROW_WINDOW};
pub use job::{ExtractionJob, JobStatus, JobSummary, ProgressSnapshot, RequestId};
pub use msg::Msg;
pub use projector::{classify, display_headers, display_row, display_rows, ColumnRole};
pub use record::{
    ExtractionRecord, Provenance, RecordStatus, DERIVED_FIELD_COUNT, DERIVED_FIELD_LABELS,
};
pub use selection::{ColumnSelection, SelectOutcome, SelectionState};
pub use state::{ExtractPhase, WorkspaceState};
pub use update::update;
pub use view_model::{AppViewModel, Notice, NoticeSeverity, SheetTabView};
