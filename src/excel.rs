//! Excel access for statement workbooks.
//!
//! Reads named sheets into a [`Sheet`] grid and exports extracted KPIs
//! back to XLSX.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{KpiError, Result};
use crate::layout::PeriodLabels;
use crate::render::format_ratio;
use crate::types::{RatioValue, ReportOutcome};

/// Cell value from an Excel file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Error(String),
}

impl CellValue {
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{n:.0}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) | Self::Error(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&Data> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(dt: &Data) -> Self {
        match dt {
            Data::Empty => Self::Empty,
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Bool(b) => Self::Bool(*b),
            Data::Error(e) => Self::Error(format!("{e:?}")),
            Data::DateTime(dt) => Self::Number(dt.as_f64()),
        }
    }
}

/// One worksheet as a grid anchored at A1.
///
/// The first worksheet row is the header and is dropped; `rows` holds
/// everything below it, so data row `r` is worksheet row `r + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    /// Builds a sheet from a full grid whose first row is the header.
    #[must_use]
    pub fn from_grid(name: impl Into<String>, grid: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows: grid.into_iter().skip(1).collect(),
        }
    }

    /// Builds a sheet from a calamine range, padding so that cell positions
    /// stay absolute even when the used range does not start at A1.
    #[must_use]
    pub fn from_range(name: impl Into<String>, range: &Range<Data>) -> Self {
        let (first_row, first_col) = range.start().unwrap_or((0, 0));

        let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); first_row as usize];
        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; first_col as usize];
            cells.extend(row.iter().map(CellValue::from));
            grid.push(cells);
        }

        Self::from_grid(name, grid)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at a data-row index, `None` when out of bounds.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

/// A read-only statement workbook.
pub struct SourceWorkbook {
    inner: Xlsx<BufReader<File>>,
}

impl SourceWorkbook {
    /// Opens an `.xlsx` workbook.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not a readable XLSX.
    pub fn open(path: &Path) -> Result<Self> {
        let inner: Xlsx<_> = open_workbook(path).map_err(|source| KpiError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { inner })
    }

    #[must_use]
    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    /// Loads one named sheet.
    ///
    /// # Errors
    ///
    /// Returns [`KpiError::MissingSheet`] if no sheet has this name, or
    /// [`KpiError::Sheet`] if its contents cannot be read.
    pub fn sheet(&mut self, name: &str) -> Result<Sheet> {
        if !self.inner.sheet_names().iter().any(|n| n == name) {
            return Err(KpiError::MissingSheet(name.to_string()));
        }

        let range = self
            .inner
            .worksheet_range(name)
            .map_err(|source| KpiError::Sheet {
                name: name.to_string(),
                source,
            })?;

        Ok(Sheet::from_range(name, &range))
    }
}

/// Maximum worksheet name length accepted by Excel.
const MAX_SHEET_NAME: usize = 31;

fn worksheet_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME)
        .collect()
}

/// Writes every outcome to its own worksheet: a KPI table followed by the
/// derived ratios. The file is written to a temp file next to `path` and
/// then moved into place.
///
/// # Errors
///
/// Returns an error if the workbook cannot be built or written.
#[allow(clippy::cast_precision_loss)]
pub fn export_xlsx(outcomes: &[ReportOutcome], labels: &PeriodLabels, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let amount = Format::new().set_num_format("#,##0");
    let percent = Format::new().set_num_format("+0.00;-0.00;0.00");

    for outcome in outcomes {
        let sheet = workbook.add_worksheet();
        sheet.set_name(worksheet_name(&outcome.sheet_name))?;
        sheet.set_column_width(0, 40)?;
        sheet.set_column_width(1, 18)?;
        sheet.set_column_width(2, 18)?;
        sheet.set_column_width(3, 12)?;

        sheet.write_string_with_format(0, 0, "Metric", &bold)?;
        sheet.write_string_with_format(0, 1, &labels.current, &bold)?;
        sheet.write_string_with_format(0, 2, &labels.prior, &bold)?;
        sheet.write_string_with_format(0, 3, "% Change", &bold)?;

        let mut row: u32 = 1;
        for (metric, entry) in outcome.result.iter() {
            sheet.write_string(row, 0, metric)?;
            if let Some(entry) = entry {
                sheet.write_number_with_format(row, 1, entry.current as f64, &amount)?;
                sheet.write_number_with_format(row, 2, entry.prior as f64, &amount)?;
                sheet.write_number_with_format(row, 3, entry.change_pct, &percent)?;
            }
            row += 1;
        }

        if outcome.ratios.is_empty() {
            continue;
        }

        row += 1;
        sheet.write_string_with_format(row, 0, "Ratio", &bold)?;
        sheet.write_string_with_format(row, 1, "Value", &bold)?;
        sheet.write_string_with_format(row, 2, "Display", &bold)?;
        row += 1;
        for ratio in &outcome.ratios {
            sheet.write_string(row, 0, ratio.name)?;
            if let RatioValue::Value(v) = ratio.value {
                sheet.write_number(row, 1, v)?;
            }
            sheet.write_string(row, 2, format_ratio(ratio))?;
            row += 1;
        }
    }

    let buffer = workbook.save_to_buffer()?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&buffer)?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_value_as_number() {
        let num = CellValue::Number(42.0);
        assert_eq!(num.as_number(), Some(42.0));
    }

    #[test]
    fn cell_value_as_text() {
        let text = CellValue::Text("hello".to_string());
        assert_eq!(text.as_text(), Some("hello"));
    }

    #[test]
    fn cell_value_display_drops_integral_fraction() {
        assert_eq!(CellValue::Number(1234.0).to_string(), "1234");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn sheet_from_grid_splits_header() {
        let grid = vec![
            vec![CellValue::Text("HEADER".to_string())],
            vec![CellValue::Number(1.0)],
            vec![CellValue::Number(2.0)],
        ];
        let sheet = Sheet::from_grid("S", grid);

        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.cell(0, 0), Some(&CellValue::Number(1.0)));
        assert_eq!(sheet.cell(1, 0), Some(&CellValue::Number(2.0)));
        assert_eq!(sheet.cell(5, 0), None);
        assert_eq!(sheet.cell(0, 9), None);
    }

    #[test]
    fn sheet_from_offset_range_keeps_absolute_positions() {
        // Used range starts at C3 (row 2, col 2).
        let mut range: Range<Data> = Range::new((2, 2), (3, 3));
        range.set_value((2, 2), Data::String("HEADER".to_string()));
        range.set_value((3, 3), Data::Float(7.0));

        let sheet = Sheet::from_range("Offset", &range);

        // Worksheet row 3 is data row 2.
        assert_eq!(sheet.cell(2, 3), Some(&CellValue::Number(7.0)));
        assert_eq!(sheet.cell(1, 2), Some(&CellValue::Text("HEADER".to_string())));
        assert_eq!(sheet.cell(2, 0), Some(&CellValue::Empty));
    }

    #[test]
    fn worksheet_name_is_sanitized_and_truncated() {
        assert_eq!(worksheet_name("A/B:C"), "A_B_C");
        assert_eq!(worksheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME);
    }

    #[test]
    fn open_missing_workbook_is_error() {
        let result = SourceWorkbook::open(Path::new("/nonexistent/book.xlsx"));
        assert!(matches!(result, Err(KpiError::Workbook { .. })));
    }

    #[test]
    fn unknown_sheet_is_missing_sheet_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("book.xlsx");
        fixtures::write_statement_workbook(&path).unwrap();

        let mut workbook = SourceWorkbook::open(&path).unwrap();
        assert_eq!(workbook.sheet_names().len(), 4);

        let result = workbook.sheet("No Such Sheet");
        assert!(matches!(result, Err(KpiError::MissingSheet(name)) if name == "No Such Sheet"));
    }

    #[test]
    fn fixture_sheet_reads_back_with_header_offset() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("book.xlsx");
        fixtures::write_statement_workbook(&path).unwrap();

        let mut workbook = SourceWorkbook::open(&path).unwrap();
        let sheet = workbook
            .sheet(crate::layout::FINANCIAL_POSITION_SHEET)
            .unwrap();

        assert_eq!(sheet.cell(4, 0), Some(&CellValue::Empty));
        assert_eq!(
            sheet.cell(5, 0),
            Some(&CellValue::Text("Share capital".to_string()))
        );
        assert_eq!(sheet.cell(5, 4), Some(&CellValue::Number(300_000_000.0)));
    }
}
