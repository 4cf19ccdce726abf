use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use jd_core::{ColumnSelection, ExtractionJob, ExtractionRecord, JobStatus, ProgressSnapshot, Workbook};
use jd_logging::{jd_debug, jd_error, jd_info, jd_trace, jd_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::filename::artifact_filename;
use crate::persist::AtomicFileWriter;
use crate::status_poller::{StatusPoller, StatusStep};
use crate::{
    ExtractError, ExtractionService, HealthResponse, JobEvent, PollFailure, ServiceError,
    SourceFile, SubmitRequest,
};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub progress_interval: Duration,
    pub status_interval: Duration,
    pub max_status_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(500),
            status_interval: Duration::from_millis(1000),
            max_status_attempts: 300,
        }
    }
}

pub trait JobEventSink: Send + Sync {
    fn emit(&self, event: JobEvent);
}

pub struct ChannelEventSink {
    tx: tokio::sync::mpsc::UnboundedSender<JobEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<JobEvent>) -> Self {
        Self { tx }
    }
}

impl JobEventSink for ChannelEventSink {
    fn emit(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}

/// Drives extraction jobs against an [`ExtractionService`].
#[derive(Clone)]
pub struct Orchestrator {
    service: Arc<dyn ExtractionService>,
    settings: PollSettings,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn ExtractionService>, settings: PollSettings) -> Self {
        Self { service, settings }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Uploads `file` and returns its sheets, each cut to `row_window` rows.
    pub async fn load_workbook(
        &self,
        file: &SourceFile,
        row_window: usize,
    ) -> Result<Workbook, ExtractError> {
        file.validate()?;
        let upload = self
            .service
            .upload(file)
            .await
            .map_err(ExtractError::Submit)?;
        let workbook = upload.into_workbook(row_window);
        jd_info!(
            "Loaded {} with {} sheet(s)",
            workbook.file_name,
            workbook.sheets.len()
        );
        Ok(workbook)
    }

    /// Submits a job for `selection`. Nothing is sent without a selection.
    pub async fn submit(
        &self,
        file: &SourceFile,
        selection: Option<&ColumnSelection>,
    ) -> Result<ExtractionJob, ExtractError> {
        let selection = selection.ok_or_else(|| {
            ExtractError::Validation("no job description column is selected".to_string())
        })?;
        file.validate()?;

        let response = self
            .service
            .submit(SubmitRequest {
                file,
                sheet_id: &selection.sheet_id,
                sheet_name: &selection.sheet_name,
                column_index: selection.column_index,
            })
            .await
            .map_err(ExtractError::Submit)?;
        let request_id = response.request_id.trim();
        if request_id.is_empty() {
            return Err(ExtractError::Submit(ServiceError {
                kind: crate::FailureKind::Decode,
                message: "submit response carried no request id".to_string(),
            }));
        }

        jd_info!(
            "Submitted job {} for sheet '{}' column {} ('{}')",
            request_id,
            selection.sheet_name,
            selection.column_index,
            selection.column_header
        );
        Ok(ExtractionJob::submitted(request_id, selection.clone()))
    }

    /// Moves a submitted job to `Polling` and spawns its progress and status
    /// tasks. Must be called from within a Tokio runtime.
    ///
    /// Once `liveness` is cancelled neither task touches the job again, even
    /// if a request that was already in flight resolves later. A job that is
    /// not `Submitted` gets no tasks and comes back as a stopped handle.
    pub fn start_polling(
        &self,
        mut job: ExtractionJob,
        liveness: &CancellationToken,
        sink: Arc<dyn JobEventSink>,
    ) -> JobHandle {
        let request_id = job.request_id().to_string();
        let poller = StatusPoller::new(self.settings.max_status_attempts);
        let max_status_attempts = poller.max_attempts();
        let started = job.begin_polling();
        let ctx = PollContext {
            service: self.service.clone(),
            job: Arc::new(Mutex::new(job)),
            halt: liveness.child_token(),
            sink,
            request_id: request_id.clone(),
        };

        let mut tasks = Vec::new();
        if started {
            tasks.push((
                "progress",
                tokio::spawn(run_progress_task(
                    ctx.clone(),
                    self.settings.progress_interval,
                )),
            ));
            tasks.push((
                "status",
                tokio::spawn(run_status_task(
                    ctx.clone(),
                    self.settings.status_interval,
                    poller,
                )),
            ));
        } else {
            jd_warn!(
                "Job {} is {}, not submitted; not polling it",
                request_id,
                lock(&ctx.job).status().label()
            );
            ctx.halt.cancel();
        }

        JobHandle {
            request_id,
            job: ctx.job,
            halt: ctx.halt,
            max_status_attempts,
            tasks,
        }
    }

    /// [`submit`](Self::submit) followed by [`start_polling`](Self::start_polling).
    pub async fn extract(
        &self,
        file: &SourceFile,
        selection: Option<&ColumnSelection>,
        liveness: &CancellationToken,
        sink: Arc<dyn JobEventSink>,
    ) -> Result<JobHandle, ExtractError> {
        let job = self.submit(file, selection).await?;
        Ok(self.start_polling(job, liveness, sink))
    }

    /// Extracts one record from free text.
    pub async fn extract_text(&self, text: &str) -> Result<ExtractionRecord, ExtractError> {
        if text.trim().is_empty() {
            return Err(ExtractError::Validation(
                "job description text cannot be empty".to_string(),
            ));
        }
        let data = self
            .service
            .extract_text(text)
            .await
            .map_err(ExtractError::Submit)?;
        Ok(data.into())
    }

    pub async fn health(&self) -> Result<HealthResponse, ServiceError> {
        self.service.health().await
    }

    /// Fetches the result spreadsheet of a complete job.
    pub async fn download(&self, job: &ExtractionJob) -> Result<Bytes, ExtractError> {
        if !job.is_complete() {
            return Err(ExtractError::Validation(format!(
                "job {} is {}, not complete",
                job.request_id(),
                job.status().label()
            )));
        }
        self.service
            .download(job.request_id())
            .await
            .map_err(ExtractError::Download)
    }

    /// Downloads the result spreadsheet into `output_dir`.
    pub async fn download_to(
        &self,
        job: &ExtractionJob,
        output_dir: &Path,
    ) -> Result<PathBuf, ExtractError> {
        let bytes = self.download(job).await?;
        let writer = AtomicFileWriter::new(output_dir.to_path_buf());
        let path = writer.write(&artifact_filename(job.request_id()), &bytes)?;
        jd_info!("Saved results of {} to {:?}", job.request_id(), path);
        Ok(path)
    }
}

/// A polling job. Dropping the handle does not stop the tasks; call
/// [`stop`](Self::stop) or cancel the liveness token.
pub struct JobHandle {
    request_id: String,
    job: Arc<Mutex<ExtractionJob>>,
    halt: CancellationToken,
    /// Status checks a job may spend before it times out.
    max_status_attempts: u32,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl JobHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn snapshot(&self) -> ExtractionJob {
        lock(&self.job).clone()
    }

    /// Stops both tasks. Responses still in flight are discarded.
    pub fn stop(&self) {
        self.halt.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.halt.is_cancelled()
    }

    /// Waits for both tasks to end and returns the final job.
    ///
    /// A timed-out job is reported as [`ExtractError::Timeout`]. A stopped
    /// job comes back in whatever state it had reached.
    pub async fn wait(self) -> Result<ExtractionJob, ExtractError> {
        for (name, task) in self.tasks {
            if let Err(err) = task.await {
                jd_error!("{} task of {} ended abnormally: {}", name, self.request_id, err);
            }
        }
        let job = lock(&self.job).clone();
        match job.status() {
            JobStatus::TimedOut => Err(ExtractError::Timeout {
                request_id: self.request_id,
                attempts: self.max_status_attempts,
            }),
            _ => Ok(job),
        }
    }
}

#[derive(Clone)]
struct PollContext {
    service: Arc<dyn ExtractionService>,
    job: Arc<Mutex<ExtractionJob>>,
    /// Child of the caller's liveness token; also cancelled when the job ends.
    halt: CancellationToken,
    sink: Arc<dyn JobEventSink>,
    request_id: String,
}

impl PollContext {
    /// Sleeps one period; false if the job was halted meanwhile.
    async fn pause(&self, period: Duration) -> bool {
        tokio::select! {
            _ = self.halt.cancelled() => false,
            _ = tokio::time::sleep(period) => true,
        }
    }

    /// Locks the job unless the tasks were halted.
    fn live_job(&self) -> Option<MutexGuard<'_, ExtractionJob>> {
        let guard = lock(&self.job);
        if self.halt.is_cancelled() {
            jd_debug!("Discarding late response for {}", self.request_id);
            return None;
        }
        Some(guard)
    }
}

async fn run_progress_task(ctx: PollContext, period: Duration) {
    loop {
        if ctx.halt.is_cancelled() {
            return;
        }
        let outcome = ctx.service.progress(&ctx.request_id).await;
        let keep_going = match outcome {
            Ok(response) => apply_progress(&ctx, response.into()),
            Err(err) => {
                log_poll_failure(&ctx.request_id, "progress", &err);
                true
            }
        };
        if !keep_going || !ctx.pause(period).await {
            return;
        }
    }
}

/// Returns whether the progress task should keep ticking.
fn apply_progress(ctx: &PollContext, snapshot: ProgressSnapshot) -> bool {
    let Some(mut job) = ctx.live_job() else {
        return false;
    };
    if !job.is_polling() {
        return false;
    }
    if job.apply_progress(snapshot) {
        jd_trace!(
            "Progress {}: {}/{}",
            ctx.request_id,
            job.progress().processed,
            job.progress().total
        );
        ctx.sink.emit(JobEvent::Progress(job.clone()));
    }
    if snapshot.complete {
        jd_debug!("Progress for {} reports complete; progress polling ends", ctx.request_id);
        return false;
    }
    true
}

async fn run_status_task(ctx: PollContext, period: Duration, mut poller: StatusPoller) {
    loop {
        if ctx.halt.is_cancelled() {
            return;
        }
        let outcome = ctx.service.status(&ctx.request_id).await;
        if !apply_status(&ctx, &mut poller, outcome) || !ctx.pause(period).await {
            return;
        }
    }
}

/// Feeds one status check through the poller. Returns whether the status
/// task should keep checking.
fn apply_status(
    ctx: &PollContext,
    poller: &mut StatusPoller,
    outcome: Result<crate::StatusResponse, ServiceError>,
) -> bool {
    let Some(mut job) = ctx.live_job() else {
        return false;
    };
    if let Ok(response) = &outcome {
        if !response.is_complete() && response.status.to_ascii_lowercase().contains("fail") {
            jd_warn!("Status {} reports '{}'; still polling", ctx.request_id, response.status);
        }
    }
    let finished = match poller.observe(outcome) {
        StatusStep::Pending { attempt, failure } => {
            match failure {
                Some(PollFailure::NotReady) => {
                    jd_debug!("Status {} not ready (attempt {})", ctx.request_id, attempt)
                }
                Some(PollFailure::Transport) => {
                    jd_warn!("Status check {} failed (attempt {})", ctx.request_id, attempt)
                }
                None => jd_trace!("Status {} still processing (attempt {})", ctx.request_id, attempt),
            }
            return true;
        }
        StatusStep::Complete(response) => {
            let summary = response.summary();
            jd_info!(
                "Job {} complete: {} processed, {} succeeded, {} failed",
                ctx.request_id,
                summary.total_processed,
                summary.success_count,
                summary.failure_count
            );
            job.complete(summary, response.into_results())
        }
        StatusStep::TimedOut { attempts } => {
            jd_warn!(
                "Job {} timed out after {} status checks",
                ctx.request_id,
                attempts
            );
            job.time_out()
        }
    };
    // Terminal: stop the progress task too.
    ctx.halt.cancel();
    if finished {
        ctx.sink.emit(JobEvent::Finished(job.clone()));
    }
    false
}

fn log_poll_failure(request_id: &str, what: &str, err: &ServiceError) {
    match err.poll_failure() {
        PollFailure::NotReady => jd_debug!("{} for {} not ready yet: {}", what, request_id, err),
        PollFailure::Transport => jd_warn!("{} poll for {} failed: {}", what, request_id, err),
    }
}

fn lock(job: &Mutex<ExtractionJob>) -> MutexGuard<'_, ExtractionJob> {
    job.lock().unwrap_or_else(PoisonError::into_inner)
}
