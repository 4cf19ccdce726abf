//! Preview projection: what the grid looks like with extraction results
//! spliced in next to the selected column.
//!
//! Nothing here mutates the grid or the job. When no projection applies,
//! the original slices are handed back borrowed.

use std::borrow::Cow;

use crate::{
    ColumnSelection, ExtractionJob, ExtractionRecord, SheetGrid, DERIVED_FIELD_COUNT,
    DERIVED_FIELD_LABELS,
};

/// Presentation role of a displayed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Original,
    SelectedColumn,
    DerivedColumn,
}

/// The insertion point, if `job` is a complete result for the selection on
/// this grid.
fn insertion_point(
    grid: &SheetGrid,
    selection: Option<&ColumnSelection>,
    job: Option<&ExtractionJob>,
) -> Option<usize> {
    let selection = selection?;
    let job = job?;
    if !job.is_complete() || selection.sheet_id != grid.id {
        return None;
    }
    Some(selection.column_index + 1)
}

/// Headers to display, with the derived labels after the selected column.
pub fn display_headers<'a>(
    grid: &'a SheetGrid,
    selection: Option<&ColumnSelection>,
    job: Option<&ExtractionJob>,
) -> Cow<'a, [String]> {
    let Some(at) = insertion_point(grid, selection, job) else {
        return Cow::Borrowed(grid.headers.as_slice());
    };
    let labels = DERIVED_FIELD_LABELS.iter().map(|label| label.to_string());
    Cow::Owned(splice_after(&grid.headers, at, labels))
}

/// Row `row_index` as displayed; `None` past the materialized rows.
///
/// Rows without a result (skipped or failed extraction) stay unchanged.
pub fn display_row<'a>(
    grid: &'a SheetGrid,
    selection: Option<&ColumnSelection>,
    job: Option<&ExtractionJob>,
    row_index: usize,
) -> Option<Cow<'a, [String]>> {
    let row = grid.rows.get(row_index)?;
    let record = insertion_point(grid, selection, job).and_then(|at| {
        job.and_then(|job| job.result_for_row(row_index))
            .map(|record| (at, record))
    });
    Some(match record {
        Some((at, record)) => Cow::Owned(splice_record(row, at, record)),
        None => Cow::Borrowed(row.as_slice()),
    })
}

/// Every materialized row, projected.
pub fn display_rows<'a>(
    grid: &'a SheetGrid,
    selection: Option<&ColumnSelection>,
    job: Option<&ExtractionJob>,
) -> Vec<Cow<'a, [String]>> {
    (0..grid.rows.len())
        .filter_map(|row_index| display_row(grid, selection, job, row_index))
        .collect()
}

/// Role of display column `column_index`.
///
/// `selection` must already be narrowed to the sheet being displayed
/// (see `SelectionState::for_sheet`).
pub fn classify(
    selection: Option<&ColumnSelection>,
    results_complete: bool,
    column_index: usize,
) -> ColumnRole {
    let Some(selection) = selection else {
        return ColumnRole::Original;
    };
    let selected = selection.column_index;
    if column_index == selected {
        ColumnRole::SelectedColumn
    } else if results_complete
        && column_index > selected
        && column_index <= selected + DERIVED_FIELD_COUNT
    {
        ColumnRole::DerivedColumn
    } else {
        ColumnRole::Original
    }
}

fn splice_record(row: &[String], at: usize, record: &ExtractionRecord) -> Vec<String> {
    splice_after(row, at, record.derived_values())
}

/// Copies `cells` with `inserted` placed at `at`. Short (ragged) rows are
/// padded with empty cells so the inserted values line up with the headers.
fn splice_after(
    cells: &[String],
    at: usize,
    inserted: impl IntoIterator<Item = String>,
) -> Vec<String> {
    let mut out = Vec::with_capacity(cells.len().max(at) + DERIVED_FIELD_COUNT);
    out.extend(cells.iter().take(at).cloned());
    out.resize(at, String::new());
    out.extend(inserted);
    out.extend(cells.iter().skip(at).cloned());
    out
}
