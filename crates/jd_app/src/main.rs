//! `jd-preview`: command-line front end for the job description extraction
//! service.
mod app;
mod cli;
mod config;
mod render;
mod runner;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use jd_core::JobStatus;
use jd_engine::{HttpExtractionService, Orchestrator, SourceFile};
use jd_logging::{jd_info, jd_warn, LogDestination};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app::{App, ExtractRequest, Outcome};
use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::render::ProgressView;
use crate::runner::EffectRunner;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let loaded = AppConfig::load(&cli.config);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    config.apply(cli.overrides());

    let destination = match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    jd_logging::initialize(
        destination,
        jd_logging::level_for_verbosity(cli.verbose, cli.quiet),
    );
    if let Err(err) = &loaded {
        jd_warn!("{:#}; using defaults", err);
    }

    if cli.write_config {
        let path = config.save(&cli.config)?;
        println!("Wrote {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        anyhow::bail!("no command given, see --help");
    };

    let service = HttpExtractionService::new(config.service_settings())
        .context("configuring the extraction service client")?;
    let orchestrator = Orchestrator::new(Arc::new(service), config.poll_settings());

    match command {
        Command::Health => {
            let health = orchestrator.health().await?;
            println!("{}", render::format_health(&health));
        }
        Command::Text { jd } => {
            let record = orchestrator.extract_text(&jd).await?;
            print!("{}", render::format_record(&record));
        }
        Command::Sheets { file } => {
            let source = read_source(&file)?;
            let workbook = orchestrator
                .load_workbook(&source, config.preview.row_window)
                .await?;
            print!("{}", render::format_sheet_list(&workbook));
        }
        Command::Extract {
            file,
            sheet,
            column,
            no_download,
            ..
        } => {
            let request = ExtractRequest {
                sheet,
                column,
                download: !no_download,
            };
            return run_extract(&config, orchestrator, &file, request, !cli.quiet).await;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_extract(
    config: &AppConfig,
    orchestrator: Orchestrator,
    file: &Path,
    request: ExtractRequest,
    show_progress: bool,
) -> anyhow::Result<ExitCode> {
    let source = read_source(file)?;
    let workbook = orchestrator
        .load_workbook(&source, config.preview.row_window)
        .await?;

    let liveness = CancellationToken::new();
    let interrupt = liveness.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            jd_info!("Interrupted, stopping");
            interrupt.cancel();
        }
    });

    let (msg_tx, msg_rx) = mpsc::unbounded_channel();
    let runner = EffectRunner::new(
        orchestrator,
        source,
        config.output_dir.clone(),
        liveness.clone(),
        msg_tx,
    );
    let mut app = App::new(runner, msg_rx, liveness.clone(), ProgressView::new(show_progress));

    let outcome = app.extract(workbook, &request).await?;
    liveness.cancel();
    if outcome == Outcome::Interrupted {
        eprintln!("Interrupted");
        return Ok(ExitCode::from(130));
    }

    let view = app.view();
    print!("{}", render::format_grid(&view));
    println!("{}", render::format_summary(&view));
    let status = app.state().job().map(|job| job.status());
    Ok(match status {
        Some(JobStatus::Complete) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn read_source(path: &Path) -> anyhow::Result<SourceFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, bytes))
}
