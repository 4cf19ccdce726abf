/// The single (sheet, column) pair designated as the job description source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub sheet_id: String,
    pub sheet_name: String,
    pub column_index: usize,
    pub column_header: String,
}

impl ColumnSelection {
    pub fn is_column(&self, sheet_id: &str, column_index: usize) -> bool {
        self.sheet_id == sheet_id && self.column_index == column_index
    }
}

/// What a call to [`SelectionState::select`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The requested column is now the active selection.
    Activated,
    /// The requested column was already active and has been toggled off.
    Cleared,
    /// A column in another sheet holds the lock; nothing changed.
    Rejected,
}

/// Owner of the one process-wide column selection.
///
/// Either every field of the selection is present or none is; the empty
/// state is `None`. All mutation goes through the methods below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    current: Option<ColumnSelection>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ColumnSelection> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Toggles `(sheet_id, column_index)`.
    ///
    /// Re-selecting the active column clears it. Selecting inside the sheet
    /// that holds the selection (or when nothing is selected) moves the
    /// selection. Selecting in any other sheet is rejected.
    pub fn select(
        &mut self,
        sheet_id: &str,
        sheet_name: &str,
        column_index: usize,
        column_header: &str,
    ) -> SelectOutcome {
        if let Some(current) = &self.current {
            if current.is_column(sheet_id, column_index) {
                self.current = None;
                return SelectOutcome::Cleared;
            }
        }
        if !self.can_select(sheet_id) {
            return SelectOutcome::Rejected;
        }
        self.current = Some(ColumnSelection {
            sheet_id: sheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            column_index,
            column_header: column_header.to_string(),
        });
        SelectOutcome::Activated
    }

    pub fn can_select(&self, sheet_id: &str) -> bool {
        self.current
            .as_ref()
            .is_none_or(|current| current.sheet_id == sheet_id)
    }

    /// True while a selection is pinned to a sheet other than `sheet_id`.
    pub fn is_locked(&self, sheet_id: &str) -> bool {
        !self.can_select(sheet_id)
    }

    /// The active selection if it belongs to `sheet_id`.
    pub fn for_sheet(&self, sheet_id: &str) -> Option<&ColumnSelection> {
        self.current
            .as_ref()
            .filter(|current| current.sheet_id == sheet_id)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
