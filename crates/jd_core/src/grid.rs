/// Number of data rows materialized per sheet for previewing.
pub const PREVIEW_ROW_WINDOW: usize = 50;

/// One parsed sheet. `rows` may be a prefix of the sheet; `total_row_count`
/// is the full data row count as reported by the upload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetGrid {
    pub id: String,
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_row_count: usize,
}

impl SheetGrid {
    /// Keeps only the first `window` rows; the total count is untouched.
    pub fn with_row_window(mut self, window: usize) -> Self {
        self.rows.truncate(window);
        self
    }

    /// Resolves a column by zero-based index or by exact header text.
    pub fn resolve_column(&self, key: &str) -> Option<usize> {
        if let Ok(index) = key.trim().parse::<usize>() {
            return (index < self.headers.len()).then_some(index);
        }
        self.headers.iter().position(|header| header == key)
    }

    pub fn header(&self, column_index: usize) -> Option<&str> {
        self.headers.get(column_index).map(String::as_str)
    }
}

/// The result of an upload: every sheet of one spreadsheet file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Workbook {
    pub file_name: String,
    pub sheets: Vec<SheetGrid>,
}

impl Workbook {
    pub fn sheet(&self, sheet_id: &str) -> Option<&SheetGrid> {
        self.sheets.iter().find(|sheet| sheet.id == sheet_id)
    }

    /// Looks a sheet up by id first, then by display name.
    pub fn find_sheet(&self, key: &str) -> Option<&SheetGrid> {
        self.sheet(key)
            .or_else(|| self.sheets.iter().find(|sheet| sheet.name == key))
    }

    pub fn first_sheet(&self) -> Option<&SheetGrid> {
        self.sheets.first()
    }
}
