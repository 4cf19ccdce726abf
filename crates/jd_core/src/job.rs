use std::collections::BTreeMap;

use crate::{ColumnSelection, ExtractionRecord};

pub type RequestId = String;

/// Lifecycle of one extraction run. Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    Polling,
    Complete,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::TimedOut)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            Self::Submitted => next == Self::Polling,
            Self::Polling => next.is_terminal(),
            Self::Complete | Self::Failed | Self::TimedOut => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Polling => "Polling",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::TimedOut => "Timed out",
        }
    }
}

/// Best-effort estimate of how far the remote side has come.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub total: u64,
    pub complete: bool,
}

impl ProgressSnapshot {
    pub fn finished(total: u64) -> Self {
        Self {
            processed: total,
            total,
            complete: true,
        }
    }

    /// Completion ratio in percent; `None` while the total is unknown.
    pub fn percent(&self) -> Option<f64> {
        (self.total > 0).then(|| self.processed as f64 / self.total as f64 * 100.0)
    }
}

/// Counters reported by the service when a job completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobSummary {
    pub total_processed: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// One extraction run, from submission to a terminal state.
///
/// Results stay empty until the job is `Complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    request_id: RequestId,
    selection: ColumnSelection,
    status: JobStatus,
    progress: ProgressSnapshot,
    results: BTreeMap<usize, ExtractionRecord>,
    summary: Option<JobSummary>,
}

impl ExtractionJob {
    pub fn submitted(request_id: impl Into<RequestId>, selection: ColumnSelection) -> Self {
        Self {
            request_id: request_id.into(),
            selection,
            status: JobStatus::Submitted,
            progress: ProgressSnapshot::default(),
            results: BTreeMap::new(),
            summary: None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The selection the job was submitted with.
    pub fn selection(&self) -> &ColumnSelection {
        &self.selection
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress
    }

    pub fn summary(&self) -> Option<JobSummary> {
        self.summary
    }

    pub fn results(&self) -> &BTreeMap<usize, ExtractionRecord> {
        &self.results
    }

    pub fn result_for_row(&self, row_index: usize) -> Option<&ExtractionRecord> {
        self.results.get(&row_index)
    }

    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }

    pub fn is_polling(&self) -> bool {
        self.status == JobStatus::Polling
    }

    fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    pub fn begin_polling(&mut self) -> bool {
        self.transition(JobStatus::Polling)
    }

    /// Overwrites the progress while polling.
    ///
    /// `processed` is clamped to `total`, and a snapshot for the same total
    /// never moves `processed` backwards.
    pub fn apply_progress(&mut self, snapshot: ProgressSnapshot) -> bool {
        if self.status != JobStatus::Polling {
            return false;
        }
        let mut next = snapshot;
        if next.total > 0 {
            next.processed = next.processed.min(next.total);
        }
        if next.total == self.progress.total {
            next.processed = next.processed.max(self.progress.processed);
        }
        if next == self.progress {
            return false;
        }
        self.progress = next;
        true
    }

    /// Moves to `Complete` with the final results.
    ///
    /// Progress is forced to `processed == total` regardless of what the
    /// last progress tick said. The total is the last known progress total,
    /// or the processed count when progress never arrived.
    pub fn complete(
        &mut self,
        summary: JobSummary,
        results: BTreeMap<usize, ExtractionRecord>,
    ) -> bool {
        if !self.transition(JobStatus::Complete) {
            return false;
        }
        let total = if self.progress.total > 0 {
            self.progress.total
        } else {
            summary.total_processed
        };
        self.progress = ProgressSnapshot::finished(total);
        self.summary = Some(summary);
        self.results = results;
        true
    }

    /// Gives up on the job; the last known progress is kept.
    pub fn time_out(&mut self) -> bool {
        self.transition(JobStatus::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ExtractionJob {
        let selection = ColumnSelection {
            sheet_id: "sheet_0_A".into(),
            sheet_name: "A".into(),
            column_index: 1,
            column_header: "JD".into(),
        };
        ExtractionJob::submitted("req-1", selection)
    }

    fn snapshot(processed: u64, total: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            processed,
            total,
            complete: processed >= total && total > 0,
        }
    }

    #[test]
    fn progress_ignored_before_polling() {
        let mut job = job();
        assert!(!job.apply_progress(snapshot(1, 3)));
        assert_eq!(job.progress(), ProgressSnapshot::default());
    }

    #[test]
    fn progress_is_clamped_and_monotonic() {
        let mut job = job();
        job.begin_polling();
        assert!(job.apply_progress(snapshot(5, 3)));
        assert_eq!(job.progress().processed, 3);

        let mut job = self::job();
        job.begin_polling();
        job.apply_progress(snapshot(2, 4));
        assert!(!job.apply_progress(snapshot(1, 4)));
        assert_eq!(job.progress().processed, 2);
    }

    #[test]
    fn completion_forces_full_progress() {
        let mut job = job();
        job.begin_polling();
        job.apply_progress(snapshot(1, 4));
        let summary = JobSummary {
            total_processed: 3,
            success_count: 3,
            failure_count: 1,
        };
        assert!(job.complete(summary, BTreeMap::new()));
        assert_eq!(job.progress(), ProgressSnapshot::finished(4));
        assert_eq!(job.summary(), Some(summary));
    }

    #[test]
    fn completion_without_progress_uses_processed_count() {
        let mut job = job();
        job.begin_polling();
        let summary = JobSummary {
            total_processed: 2,
            ..Default::default()
        };
        job.complete(summary, BTreeMap::new());
        assert_eq!(job.progress(), ProgressSnapshot::finished(2));
    }

    #[test]
    fn terminal_states_do_not_regress() {
        let mut job = job();
        assert!(!job.complete(JobSummary::default(), BTreeMap::new()));
        job.begin_polling();
        assert!(job.time_out());
        assert!(!job.complete(JobSummary::default(), BTreeMap::new()));
        assert!(!job.begin_polling());
        assert!(!job.apply_progress(snapshot(1, 1)));
        assert_eq!(job.status(), JobStatus::TimedOut);
    }

    #[test]
    fn percent_unknown_without_total() {
        assert_eq!(ProgressSnapshot::default().percent(), None);
        assert_eq!(snapshot(1, 4).percent(), Some(25.0));
    }
}
