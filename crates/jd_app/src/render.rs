use std::fmt::Write;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use jd_core::{
    AppViewModel, ColumnRole, ExtractionRecord, JobStatus, Notice, NoticeSeverity, Workbook,
    DERIVED_FIELD_LABELS,
};
use jd_engine::HealthResponse;

const MAX_CELL_WIDTH: usize = 28;

/// Text of the `sheets` command.
pub fn format_sheet_list(workbook: &Workbook) -> String {
    let mut out = format!("{}\n", workbook.file_name);
    for sheet in &workbook.sheets {
        let _ = writeln!(
            out,
            "  {} ({}, {} rows)",
            sheet.name, sheet.id, sheet.total_row_count
        );
        for (index, header) in sheet.headers.iter().enumerate() {
            let _ = writeln!(out, "    [{index}] {header}");
        }
    }
    out
}

/// The preview grid of the active sheet as an aligned text table.
///
/// The selected column is marked with `*`, inserted derived columns with `+`.
pub fn format_grid(view: &AppViewModel) -> String {
    if view.headers.is_empty() {
        return String::from("(empty sheet)\n");
    }
    let headers: Vec<String> = view
        .headers
        .iter()
        .zip(view.column_roles.iter().chain(std::iter::repeat(&ColumnRole::Original)))
        .map(|(header, role)| match role {
            ColumnRole::Original => header.clone(),
            ColumnRole::SelectedColumn => format!("*{header}"),
            ColumnRole::DerivedColumn => format!("+{header}"),
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| cell_width(h)).collect();
    for row in &view.rows {
        for (index, cell) in row.iter().enumerate().take(widths.len()) {
            widths[index] = widths[index].max(cell_width(cell));
        }
    }

    let mut out = String::new();
    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &view.rows {
        push_row(&mut out, row, &widths);
    }
    if view.total_row_count > view.rows.len() {
        let _ = writeln!(
            out,
            "... showing {} of {} rows",
            view.rows.len(),
            view.total_row_count
        );
    }
    out
}

fn cell_width(text: &str) -> usize {
    text.chars().count().min(MAX_CELL_WIDTH)
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(index, width)| {
            let cell = cells.get(index).map(String::as_str).unwrap_or("");
            format!("{:<width$}", clip(cell), width = *width)
        })
        .collect();
    let _ = writeln!(out, "{}", line.join(" | ").trim_end());
}

fn clip(text: &str) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut clipped: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
    clipped.push('~');
    clipped
}

pub fn format_summary(view: &AppViewModel) -> String {
    let status = view.job_status.map(JobStatus::label).unwrap_or("No job");
    let mut line = match &view.request_id {
        Some(id) => format!("Job {id}: {status}"),
        None => status.to_string(),
    };
    if let Some(progress) = view.progress {
        let _ = write!(line, " ({}/{}", progress.processed, progress.total);
        if let Some(percent) = progress.percent() {
            let _ = write!(line, ", {percent:.0}%");
        }
        line.push(')');
    }
    if let Some(summary) = view.summary {
        let _ = write!(
            line,
            ", {} succeeded, {} failed",
            summary.success_count, summary.failure_count
        );
    }
    line
}

pub fn format_notice(notice: &Notice) -> String {
    let prefix = match notice.severity {
        NoticeSeverity::Info => "info",
        NoticeSeverity::Warning => "warning",
        NoticeSeverity::Error => "error",
    };
    format!("{prefix}: {}", notice.text)
}

/// Text of the `text` command: one `label: value` line per derived field.
pub fn format_record(record: &ExtractionRecord) -> String {
    let values = record.derived_values();
    let width = DERIVED_FIELD_LABELS
        .iter()
        .map(|label| label.len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for (label, value) in DERIVED_FIELD_LABELS.iter().zip(values.iter()) {
        let value = if value.is_empty() { "-" } else { value.as_str() };
        let _ = writeln!(out, "{label:<width$}  {value}");
    }
    let provenance = &record.provenance;
    if let Some(status) = provenance.status {
        let model = provenance.model_used.as_deref().unwrap_or("unknown model");
        let _ = writeln!(out, "({status}, {model})");
    }
    out
}

pub fn format_health(health: &HealthResponse) -> String {
    let mut line = health.status.clone();
    if let Some(service) = &health.service {
        let _ = write!(line, " - {service}");
    }
    if let Some(version) = &health.version {
        let _ = write!(line, " {version}");
    }
    line
}

/// Terminal progress bar for a running job.
pub struct ProgressView {
    bar: ProgressBar,
}

impl ProgressView {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        Self { bar }
    }

    pub fn update(&self, view: &AppViewModel) {
        if let Some(progress) = view.progress {
            if progress.total > 0 {
                self.bar.set_length(progress.total);
            }
            self.bar.set_position(progress.processed);
        }
        match view.job_status {
            Some(JobStatus::Submitted) | Some(JobStatus::Polling) => {
                if self.bar.is_finished() {
                    self.bar.reset();
                }
                self.bar.set_message("extracting");
                self.bar.enable_steady_tick(Duration::from_millis(100));
            }
            Some(status) if !self.bar.is_finished() => {
                self.bar.finish_with_message(status.label());
            }
            _ => {}
        }
    }

    /// Prints a line without tearing the bar.
    pub fn println(&self, line: &str) {
        self.bar.suspend(|| eprintln!("{line}"));
    }
}
