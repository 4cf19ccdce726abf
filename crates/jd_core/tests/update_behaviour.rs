use std::sync::Once;

use jd_core::{
    update, ColumnRole, Effect, ExtractPhase, Msg, NoticeSeverity, SheetGrid, Workbook,
    WorkspaceState,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(jd_logging::initialize_for_tests);
}

fn sheet(index: usize, name: &str) -> SheetGrid {
    SheetGrid {
        id: format!("sheet_{index}_{name}"),
        name: name.to_string(),
        headers: vec!["Name".into(), "JD".into(), "Loc".into()],
        rows: vec![vec!["Bob".into(), "Some JD text".into(), "NY".into()]],
        total_row_count: 1,
    }
}

fn loaded() -> WorkspaceState {
    let workbook = Workbook {
        file_name: "jobs.xlsx".to_string(),
        sheets: vec![sheet(0, "Open"), sheet(1, "Closed")],
    };
    let (mut state, effects) = update(WorkspaceState::new(), Msg::WorkbookLoaded(workbook));
    assert!(effects.is_empty());
    assert!(state.consume_dirty());
    state
}

#[test]
fn workbook_load_activates_first_sheet() {
    init_logging();
    let state = loaded();
    let view = state.view();

    assert_eq!(view.file_name.as_deref(), Some("jobs.xlsx"));
    assert_eq!(view.sheets.len(), 2);
    assert!(view.sheets[0].active);
    assert!(!view.sheets[1].active);
    assert_eq!(view.headers, vec!["Name", "JD", "Loc"]);
    assert_eq!(view.rows.len(), 1);
    assert!(!view.can_extract);
}

#[test]
fn toggling_a_column_selects_and_marks_roles() {
    init_logging();
    let (mut state, effects) = update(loaded(), Msg::ColumnToggled { column_index: 1 });
    assert!(effects.is_empty());
    assert!(state.consume_dirty());

    let view = state.view();
    let selection = view.selection.clone().expect("selection");
    assert_eq!(selection.sheet_id, "sheet_0_Open");
    assert_eq!(selection.column_header, "JD");
    assert_eq!(
        view.column_roles,
        vec![ColumnRole::Original, ColumnRole::SelectedColumn, ColumnRole::Original]
    );
    assert!(view.can_extract);
    assert!(view.sheets[1].locked);

    let (state, _) = update(state, Msg::ColumnToggled { column_index: 1 });
    assert!(state.view().selection.is_none());
}

#[test]
fn out_of_range_column_is_ignored() {
    init_logging();
    let (mut state, _) = update(loaded(), Msg::ColumnToggled { column_index: 9 });
    assert!(state.view().selection.is_none());
    assert!(!state.consume_dirty());
}

#[test]
fn locked_sheet_cannot_be_activated() {
    init_logging();
    let (state, _) = update(loaded(), Msg::ColumnToggled { column_index: 1 });
    let (state, _) = update(
        state,
        Msg::SheetActivated {
            sheet_id: "sheet_1_Closed".to_string(),
        },
    );
    assert!(state.view().sheets[0].active);

    let (state, _) = update(state, Msg::SelectionCleared);
    let (state, _) = update(
        state,
        Msg::SheetActivated {
            sheet_id: "sheet_1_Closed".to_string(),
        },
    );
    assert!(state.view().sheets[1].active);
}

#[test]
fn unknown_sheet_is_ignored() {
    init_logging();
    let (state, _) = update(
        loaded(),
        Msg::SheetActivated {
            sheet_id: "sheet_9_Nope".to_string(),
        },
    );
    assert!(state.view().sheets[0].active);
}

#[test]
fn extract_without_selection_is_a_validation_notice() {
    init_logging();
    let (state, effects) = update(loaded(), Msg::ExtractClicked);

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.phase, ExtractPhase::Idle);
    let notice = view.notice.expect("notice");
    assert_eq!(notice.severity, NoticeSeverity::Error);
}

#[test]
fn extract_without_workbook_does_nothing_but_warn() {
    init_logging();
    let (state, effects) = update(WorkspaceState::new(), Msg::ExtractClicked);
    assert!(effects.is_empty());
    assert!(state.view().notice.is_some());
}

#[test]
fn extract_emits_submit_effect_once() {
    init_logging();
    let (state, _) = update(loaded(), Msg::ColumnToggled { column_index: 1 });
    let (state, effects) = update(state, Msg::ExtractClicked);

    let selection = state.selection().current().cloned().unwrap();
    assert_eq!(
        effects,
        vec![Effect::SubmitJob {
            file_name: "jobs.xlsx".to_string(),
            selection,
        }]
    );
    assert_eq!(state.phase(), ExtractPhase::Submitting);
    assert!(!state.view().can_extract);

    let (_state, effects) = update(state, Msg::ExtractClicked);
    assert!(effects.is_empty());
}

#[test]
fn submit_failure_reenables_the_trigger() {
    init_logging();
    let (state, _) = update(loaded(), Msg::ColumnToggled { column_index: 1 });
    let (state, _) = update(state, Msg::ExtractClicked);
    let (state, effects) = update(state, Msg::SubmitFailed("connection refused".to_string()));

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.phase, ExtractPhase::Idle);
    assert!(view.can_extract);
    assert!(view.job_status.is_none());
    let notice = view.notice.expect("notice");
    assert!(notice.text.contains("connection refused"));
}

#[test]
fn clearing_an_empty_selection_changes_nothing() {
    let state = loaded();
    let (mut next, effects) = update(state.clone(), Msg::SelectionCleared);

    assert_eq!(state, next);
    assert!(effects.is_empty());
    assert!(!next.consume_dirty());
}
