use crate::projector::{classify, display_headers, display_rows};
use crate::view_model::{AppViewModel, Notice, SheetTabView};
use crate::{ExtractionJob, SelectionState, SheetGrid, Workbook};

/// Where the extraction trigger stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractPhase {
    #[default]
    Idle,
    Submitting,
    Polling,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkspaceState {
    workbook: Option<Workbook>,
    active_sheet: Option<String>,
    selection: SelectionState,
    job: Option<ExtractionJob>,
    phase: ExtractPhase,
    notice: Option<Notice>,
    dirty: bool,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workbook(&self) -> Option<&Workbook> {
        self.workbook.as_ref()
    }

    pub fn active_sheet(&self) -> Option<&SheetGrid> {
        let id = self.active_sheet.as_deref()?;
        self.workbook.as_ref()?.sheet(id)
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn job(&self) -> Option<&ExtractionJob> {
        self.job.as_ref()
    }

    pub fn phase(&self) -> ExtractPhase {
        self.phase
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn view(&self) -> AppViewModel {
        let mut view = AppViewModel {
            file_name: self.workbook.as_ref().map(|book| book.file_name.clone()),
            sheets: self.sheet_tabs(),
            selection: self.selection.current().cloned(),
            phase: self.phase,
            request_id: self.job.as_ref().map(|job| job.request_id().to_string()),
            job_status: self.job.as_ref().map(ExtractionJob::status),
            progress: self.job.as_ref().map(ExtractionJob::progress),
            summary: self.job.as_ref().and_then(ExtractionJob::summary),
            can_extract: self.phase == ExtractPhase::Idle
                && self.workbook.is_some()
                && !self.selection.is_empty(),
            can_download: self.phase == ExtractPhase::Idle
                && self.job.as_ref().is_some_and(ExtractionJob::is_complete),
            notice: self.notice.clone(),
            dirty: self.dirty,
            ..AppViewModel::default()
        };

        if let Some(grid) = self.active_sheet() {
            let selection = self.selection.for_sheet(&grid.id);
            let job = self.job.as_ref();
            let complete = job.is_some_and(ExtractionJob::is_complete) && selection.is_some();
            let headers = display_headers(grid, selection, job).into_owned();
            view.column_roles = (0..headers.len())
                .map(|index| classify(selection, complete, index))
                .collect();
            view.headers = headers;
            view.rows = display_rows(grid, selection, job)
                .into_iter()
                .map(|row| row.into_owned())
                .collect();
            view.total_row_count = grid.total_row_count;
        }

        view
    }

    fn sheet_tabs(&self) -> Vec<SheetTabView> {
        let Some(book) = &self.workbook else {
            return Vec::new();
        };
        book.sheets
            .iter()
            .map(|sheet| SheetTabView {
                id: sheet.id.clone(),
                name: sheet.name.clone(),
                active: self.active_sheet.as_deref() == Some(sheet.id.as_str()),
                locked: self.selection.is_locked(&sheet.id),
                total_row_count: sheet.total_row_count,
            })
            .collect()
    }

    /// Returns whether the view changed since the last call, and resets it.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    pub(crate) fn load_workbook(&mut self, workbook: Workbook) {
        self.active_sheet = workbook.first_sheet().map(|sheet| sheet.id.clone());
        self.workbook = Some(workbook);
        self.selection.clear();
        self.job = None;
        self.phase = ExtractPhase::Idle;
        self.notice = None;
        self.mark_dirty();
    }

    pub(crate) fn set_active_sheet(&mut self, sheet_id: String) {
        self.active_sheet = Some(sheet_id);
        self.mark_dirty();
    }

    pub(crate) fn set_phase(&mut self, phase: ExtractPhase) {
        self.phase = phase;
        self.mark_dirty();
    }

    pub(crate) fn set_job(&mut self, job: Option<ExtractionJob>) {
        self.job = job;
        self.mark_dirty();
    }

    pub(crate) fn set_notice(&mut self, notice: Option<Notice>) {
        self.notice = notice;
        self.mark_dirty();
    }

    /// True if `job` is a snapshot of the job currently tracked.
    pub(crate) fn tracks(&self, job: &ExtractionJob) -> bool {
        self.job
            .as_ref()
            .is_some_and(|current| current.request_id() == job.request_id())
    }
}
