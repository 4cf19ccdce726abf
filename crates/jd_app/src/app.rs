use anyhow::{anyhow, bail};
use jd_core::{update, AppViewModel, ExtractPhase, Msg, Notice, Workbook, WorkspaceState};
use jd_logging::jd_debug;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::render::{format_notice, ProgressView};
use crate::runner::EffectRunner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Interrupted,
}

/// What the `extract` command asked for.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub sheet: String,
    pub column: String,
    pub download: bool,
}

/// Owns the workspace state and runs the message loop around it.
pub struct App {
    state: WorkspaceState,
    runner: EffectRunner,
    msg_rx: UnboundedReceiver<Msg>,
    liveness: CancellationToken,
    progress: ProgressView,
    last_notice: Option<Notice>,
    download: Option<Result<String, String>>,
}

impl App {
    pub fn new(
        runner: EffectRunner,
        msg_rx: UnboundedReceiver<Msg>,
        liveness: CancellationToken,
        progress: ProgressView,
    ) -> Self {
        Self {
            state: WorkspaceState::new(),
            runner,
            msg_rx,
            liveness,
            progress,
            last_notice: None,
            download: None,
        }
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn dispatch(&mut self, msg: Msg) {
        match &msg {
            Msg::DownloadSaved(path) => self.download = Some(Ok(path.clone())),
            Msg::DownloadFailed(err) => self.download = Some(Err(err.clone())),
            _ => {}
        }

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let view = state.consume_dirty().then(|| state.view());
        self.state = state;
        self.runner.enqueue(effects);

        if let Some(view) = view {
            self.render(&view);
        }
    }

    fn render(&mut self, view: &AppViewModel) {
        self.progress.update(view);
        if view.notice != self.last_notice {
            if let Some(notice) = &view.notice {
                self.progress.println(&format_notice(notice));
            }
            self.last_notice = view.notice.clone();
        }
    }

    /// Dispatches incoming messages until `done` holds. Returns false if the
    /// liveness token was cancelled first.
    async fn pump_until(&mut self, done: impl Fn(&App) -> bool) -> bool {
        while !done(self) {
            let msg = tokio::select! {
                _ = self.liveness.cancelled() => return false,
                msg = self.msg_rx.recv() => msg,
            };
            match msg {
                Some(msg) => self.dispatch(msg),
                None => return false,
            }
        }
        true
    }

    /// Loads `workbook`, selects the requested column and runs one
    /// extraction to its end, then downloads the results if asked to.
    pub async fn extract(
        &mut self,
        workbook: Workbook,
        request: &ExtractRequest,
    ) -> anyhow::Result<Outcome> {
        let sheet = workbook
            .find_sheet(&request.sheet)
            .ok_or_else(|| anyhow!("no sheet '{}' in {}", request.sheet, workbook.file_name))?;
        let sheet_id = sheet.id.clone();
        let column_index = sheet.resolve_column(&request.column).ok_or_else(|| {
            anyhow!(
                "no column '{}' in sheet '{}' (headers: {})",
                request.column,
                sheet.name,
                sheet.headers.join(", ")
            )
        })?;

        self.dispatch(Msg::WorkbookLoaded(workbook));
        self.dispatch(Msg::SheetActivated { sheet_id });
        self.dispatch(Msg::ColumnToggled { column_index });
        self.dispatch(Msg::ExtractClicked);
        if self.state.phase() == ExtractPhase::Idle {
            bail!("{}", self.notice_text("extraction did not start"));
        }

        if !self
            .pump_until(|app| app.state.phase() == ExtractPhase::Idle)
            .await
        {
            return Ok(Outcome::Interrupted);
        }
        if self.state.job().is_none() {
            bail!("{}", self.notice_text("extraction did not start"));
        }

        let complete = self.state.job().is_some_and(|job| job.is_complete());
        if complete && request.download {
            self.download = None;
            self.dispatch(Msg::DownloadClicked);
            if !self.pump_until(|app| app.download.is_some()).await {
                return Ok(Outcome::Interrupted);
            }
        }
        jd_debug!("Extraction flow finished");
        Ok(Outcome::Finished)
    }

    fn notice_text(&self, fallback: &str) -> String {
        self.state
            .notice()
            .map(|notice| notice.text.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}
