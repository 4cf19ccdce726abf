use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jd_core::{Effect, Msg};
use jd_engine::{ChannelEventSink, JobEvent, JobEventSink, JobHandle, Orchestrator, SourceFile};
use jd_logging::{jd_debug, jd_error, jd_info, jd_warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

/// Jobs the runner knows about. A stop may arrive before the job's polling
/// has started, so stopped ids are remembered.
#[derive(Default)]
struct Tracker {
    active: Option<JobHandle>,
    stopped: HashSet<String>,
}

/// Carries out the effects emitted by `jd_core::update` and feeds the
/// outcome back as messages.
pub struct EffectRunner {
    orchestrator: Orchestrator,
    source: SourceFile,
    output_dir: PathBuf,
    liveness: CancellationToken,
    msg_tx: UnboundedSender<Msg>,
    event_tx: UnboundedSender<JobEvent>,
    tracker: Arc<Mutex<Tracker>>,
}

impl EffectRunner {
    /// Must be called from within a Tokio runtime.
    pub fn new(
        orchestrator: Orchestrator,
        source: SourceFile,
        output_dir: PathBuf,
        liveness: CancellationToken,
        msg_tx: UnboundedSender<Msg>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        spawn_event_loop(event_rx, msg_tx.clone());
        Self {
            orchestrator,
            source,
            output_dir,
            liveness,
            msg_tx,
            event_tx,
            tracker: Arc::new(Mutex::new(Tracker::default())),
        }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitJob {
                    file_name,
                    selection,
                } => {
                    jd_info!(
                        "SubmitJob file={} sheet={} column={}",
                        file_name,
                        selection.sheet_name,
                        selection.column_index
                    );
                    self.spawn_submit(selection);
                }
                Effect::StopPolling { request_id } => self.stop(&request_id),
                Effect::Download { request_id } => self.spawn_download(request_id),
            }
        }
    }

    fn spawn_submit(&self, selection: jd_core::ColumnSelection) {
        let orchestrator = self.orchestrator.clone();
        let source = self.source.clone();
        let liveness = self.liveness.clone();
        let msg_tx = self.msg_tx.clone();
        let tracker = self.tracker.clone();
        let sink: Arc<dyn JobEventSink> = Arc::new(ChannelEventSink::new(self.event_tx.clone()));

        tokio::spawn(async move {
            let job = match orchestrator.submit(&source, Some(&selection)).await {
                Ok(job) => job,
                Err(err) => {
                    jd_warn!("Submit failed: {}", err);
                    let _ = msg_tx.send(Msg::SubmitFailed(err.to_string()));
                    return;
                }
            };
            if liveness.is_cancelled() {
                jd_debug!("Dropping job {} submitted during shutdown", job.request_id());
                return;
            }
            // Announce the job before any of its progress can be forwarded.
            let _ = msg_tx.send(Msg::JobSubmitted(job.clone()));

            let mut tracker = lock(&tracker);
            let handle = orchestrator.start_polling(job, &liveness, sink);
            if tracker.stopped.remove(handle.request_id()) {
                handle.stop();
            }
            if let Some(previous) = tracker.active.replace(handle) {
                previous.stop();
            }
        });
    }

    fn stop(&self, request_id: &str) {
        let mut tracker = lock(&self.tracker);
        match &tracker.active {
            Some(handle) if handle.request_id() == request_id => {
                jd_info!("Stopping job {}", request_id);
                handle.stop();
            }
            _ => {
                tracker.stopped.insert(request_id.to_string());
            }
        }
    }

    fn spawn_download(&self, request_id: String) {
        let job = lock(&self.tracker)
            .active
            .as_ref()
            .filter(|handle| handle.request_id() == request_id)
            .map(JobHandle::snapshot);
        let Some(job) = job else {
            let _ = self
                .msg_tx
                .send(Msg::DownloadFailed(format!("job {request_id} is not known")));
            return;
        };

        let orchestrator = self.orchestrator.clone();
        let output_dir = self.output_dir.clone();
        let msg_tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let msg = match orchestrator.download_to(&job, &output_dir).await {
                Ok(path) => Msg::DownloadSaved(path.display().to_string()),
                Err(err) => {
                    jd_error!("Download of {} failed: {}", request_id, err);
                    Msg::DownloadFailed(err.to_string())
                }
            };
            let _ = msg_tx.send(msg);
        });
    }
}

fn spawn_event_loop(mut event_rx: UnboundedReceiver<JobEvent>, msg_tx: UnboundedSender<Msg>) {
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let msg = match event {
                JobEvent::Progress(job) => Msg::JobUpdated(job),
                JobEvent::Finished(job) => {
                    jd_debug!("Job {} finished as {}", job.request_id(), job.status().label());
                    Msg::JobFinished(job)
                }
            };
            if msg_tx.send(msg).is_err() {
                break;
            }
        }
    });
}

fn lock(tracker: &Mutex<Tracker>) -> MutexGuard<'_, Tracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}
