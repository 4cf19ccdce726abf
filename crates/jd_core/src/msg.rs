#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A spreadsheet was uploaded and parsed.
    WorkbookLoaded(crate::Workbook),
    /// User switched to another sheet tab.
    SheetActivated { sheet_id: String },
    /// User clicked a column header in the active sheet.
    ColumnToggled { column_index: usize },
    /// User explicitly dropped the selection.
    SelectionCleared,
    /// User clicked Extract.
    ExtractClicked,
    /// The service accepted the job and polling has started.
    JobSubmitted(crate::ExtractionJob),
    /// Upload or submission failed before polling started.
    SubmitFailed(String),
    /// Fresh snapshot of a polling job.
    JobUpdated(crate::ExtractionJob),
    /// The job reached a terminal state.
    JobFinished(crate::ExtractionJob),
    /// User clicked Download.
    DownloadClicked,
    /// The result spreadsheet was written to disk.
    DownloadSaved(String),
    /// Fetching or saving the result spreadsheet failed.
    DownloadFailed(String),
}
