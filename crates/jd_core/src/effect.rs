use crate::{ColumnSelection, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Submit the loaded file for extraction of `selection`.
    SubmitJob {
        file_name: String,
        selection: ColumnSelection,
    },
    /// Stop both polling tasks of a job; late results must be dropped.
    StopPolling { request_id: RequestId },
    /// Fetch the result spreadsheet of a complete job.
    Download { request_id: RequestId },
}
