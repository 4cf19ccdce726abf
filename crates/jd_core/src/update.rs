use crate::view_model::Notice;
use crate::{Effect, ExtractPhase, ExtractionJob, JobStatus, Msg, SelectOutcome, WorkspaceState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: WorkspaceState, msg: Msg) -> (WorkspaceState, Vec<Effect>) {
    let effects = match msg {
        Msg::WorkbookLoaded(workbook) => {
            // A new file invalidates whatever job was running for the old one.
            let stale = state
                .job()
                .filter(|job| job.is_polling() || state.phase() == ExtractPhase::Polling)
                .map(|job| job.request_id().to_string());
            state.load_workbook(workbook);
            stale
                .map(|request_id| vec![Effect::StopPolling { request_id }])
                .unwrap_or_default()
        }
        Msg::SheetActivated { sheet_id } => {
            let known = state
                .workbook()
                .is_some_and(|book| book.sheet(&sheet_id).is_some());
            if known && !state.selection().is_locked(&sheet_id) {
                state.set_active_sheet(sheet_id);
            }
            Vec::new()
        }
        Msg::ColumnToggled { column_index } => {
            toggle_column(&mut state, column_index);
            Vec::new()
        }
        Msg::SelectionCleared => {
            if !state.selection().is_empty() {
                state.selection_mut().clear();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::ExtractClicked => start_extraction(&mut state),
        Msg::JobSubmitted(job) => {
            if state.phase() != ExtractPhase::Submitting {
                // Nobody is waiting for this job any more.
                return (
                    state,
                    vec![Effect::StopPolling {
                        request_id: job.request_id().to_string(),
                    }],
                );
            }
            state.set_phase(ExtractPhase::Polling);
            state.set_job(Some(job));
            Vec::new()
        }
        Msg::SubmitFailed(message) => {
            if state.phase() == ExtractPhase::Submitting {
                state.set_phase(ExtractPhase::Idle);
                state.set_job(None);
                state.set_notice(Some(Notice::error(format!(
                    "Extraction could not start: {message}"
                ))));
            }
            Vec::new()
        }
        Msg::JobUpdated(job) => {
            // A snapshot that raced the job's completion must not undo it.
            if state.phase() == ExtractPhase::Polling
                && state.tracks(&job)
                && !job.status().is_terminal()
            {
                state.set_job(Some(job));
            }
            Vec::new()
        }
        Msg::JobFinished(job) => {
            finish_job(&mut state, job);
            Vec::new()
        }
        Msg::DownloadClicked => {
            let ready = state.phase() == ExtractPhase::Idle
                && state.job().is_some_and(ExtractionJob::is_complete);
            match state.job() {
                Some(job) if ready => vec![Effect::Download {
                    request_id: job.request_id().to_string(),
                }],
                _ => Vec::new(),
            }
        }
        Msg::DownloadSaved(path) => {
            state.set_notice(Some(Notice::info(format!("Results saved to {path}"))));
            Vec::new()
        }
        Msg::DownloadFailed(message) => {
            state.set_notice(Some(Notice::error(format!("Download failed: {message}"))));
            Vec::new()
        }
    };

    (state, effects)
}

fn toggle_column(state: &mut WorkspaceState, column_index: usize) {
    let Some(grid) = state.active_sheet() else {
        return;
    };
    let Some(header) = grid.header(column_index) else {
        return;
    };
    let (sheet_id, sheet_name, header) = (grid.id.clone(), grid.name.clone(), header.to_string());

    match state
        .selection_mut()
        .select(&sheet_id, &sheet_name, column_index, &header)
    {
        SelectOutcome::Activated | SelectOutcome::Cleared => state.mark_dirty(),
        SelectOutcome::Rejected => {
            let owner = state
                .selection()
                .current()
                .map(|selection| selection.sheet_name.clone())
                .unwrap_or_default();
            state.set_notice(Some(Notice::warning(format!(
                "Column selection is locked to sheet '{owner}'"
            ))));
        }
    }
}

fn start_extraction(state: &mut WorkspaceState) -> Vec<Effect> {
    if state.phase() != ExtractPhase::Idle {
        return Vec::new();
    }
    let Some(file_name) = state.workbook().map(|book| book.file_name.clone()) else {
        state.set_notice(Some(Notice::error("Load a spreadsheet before extracting")));
        return Vec::new();
    };
    let Some(selection) = state.selection().current().cloned() else {
        state.set_notice(Some(Notice::error(
            "Select a job description column before extracting",
        )));
        return Vec::new();
    };

    state.set_phase(ExtractPhase::Submitting);
    state.set_job(None);
    state.set_notice(None);
    vec![Effect::SubmitJob {
        file_name,
        selection,
    }]
}

fn finish_job(state: &mut WorkspaceState, job: ExtractionJob) {
    if !state.tracks(&job) || !job.status().is_terminal() {
        return;
    }
    let notice = match job.status() {
        JobStatus::Complete => {
            let summary = job.summary().unwrap_or_default();
            Notice::info(format!(
                "Extraction complete: {} succeeded, {} failed",
                summary.success_count, summary.failure_count
            ))
        }
        JobStatus::TimedOut => Notice::warning(
            "Extraction timed out; the service may still be processing the file",
        ),
        JobStatus::Failed => Notice::error("Extraction failed on the service"),
        JobStatus::Submitted | JobStatus::Polling => return,
    };
    state.set_phase(ExtractPhase::Idle);
    state.set_job(Some(job));
    state.set_notice(Some(notice));
}
