//! Extraction engine for statement sheets.
//!
//! One engine serves all four reports: each [`SheetLayout`] declares, per
//! metric, whether values come from a label match, a summed row range or
//! two fixed cells.

use std::ops::Range;

use tracing::debug;

use crate::excel::{CellValue, Sheet};
use crate::layout::{CapexBlock, Lookup, SheetLayout};
use crate::types::{KpiEntry, ReportResult};

/// Coerces a cell to an integer, yielding 0 for anything unparseable.
///
/// Numbers are truncated toward zero. Text must hold a plain integer
/// (surrounding whitespace allowed). Blank, error and out-of-bounds cells
/// are 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn safe_int(cell: Option<&CellValue>) -> i64 {
    match cell {
        Some(CellValue::Number(n)) if n.is_finite() => *n as i64,
        Some(CellValue::Text(s)) => s.trim().parse().unwrap_or(0),
        Some(CellValue::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Rounds half away from zero to 2 decimals.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pairs current and prior values with their percentage change.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn build_entry(current: i64, prior: i64) -> KpiEntry {
    let change_pct = if prior == 0 {
        0.0
    } else {
        round2((current as f64 - prior as f64) / prior as f64 * 100.0)
    };
    KpiEntry {
        current,
        prior,
        change_pct,
    }
}

/// Searchable label of a row: non-blank label cells joined by spaces.
#[must_use]
pub fn label_text(sheet: &Sheet, row: usize, label_columns: &[usize]) -> String {
    label_columns
        .iter()
        .filter_map(|&col| sheet.cell(row, col))
        .filter(|cell| !cell.is_empty())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds the first data row whose label contains `pattern`, ignoring case.
///
/// Later matches are ignored; an ambiguous pattern is reported at debug
/// level only.
#[must_use]
pub fn locate_row(sheet: &Sheet, label_columns: &[usize], pattern: &str) -> Option<usize> {
    let needle = pattern.to_lowercase();
    let mut matches = (0..sheet.row_count())
        .filter(|&row| label_text(sheet, row, label_columns).to_lowercase().contains(&needle));

    let first = matches.next()?;
    let others = matches.count();
    if others > 0 {
        debug!(
            sheet = sheet.name(),
            pattern,
            row = first,
            others,
            "label matched several rows, using the first"
        );
    }
    Some(first)
}

/// Label lookup: the matched row's current and prior columns, or `None`
/// when no row matches.
#[must_use]
pub fn locate(
    sheet: &Sheet,
    label_columns: &[usize],
    pattern: &str,
    current_col: usize,
    prior_col: usize,
) -> Option<KpiEntry> {
    let row = locate_row(sheet, label_columns, pattern)?;
    Some(build_entry(
        safe_int(sheet.cell(row, current_col)),
        safe_int(sheet.cell(row, prior_col)),
    ))
}

/// Sums the coerced cells of `rows` in one column. Rows past the end of the
/// sheet count as blank; the sum saturates at the `i64` bounds.
#[must_use]
pub fn sum_range(sheet: &Sheet, rows: Range<usize>, column: usize) -> i64 {
    rows.map(|row| safe_int(sheet.cell(row, column)))
        .fold(0, i64::saturating_add)
}

/// Capital expenditure for free cash flow: the signed sum of the line items,
/// so outflows recorded as negatives raise free cash flow.
#[must_use]
pub fn capex(sheet: &Sheet, block: &CapexBlock) -> i64 {
    sum_range(sheet, block.start..block.end, block.column)
}

/// Builds a report result set from a sheet and its layout.
#[must_use]
pub fn extract_report(sheet: &Sheet, layout: &SheetLayout) -> ReportResult {
    let mut result = ReportResult::new();

    for metric in &layout.metrics {
        let entry = match &metric.lookup {
            Lookup::Label { pattern } => locate(
                sheet,
                &layout.label_columns,
                pattern,
                layout.current_column,
                layout.prior_column,
            ),
            Lookup::Range { start, end } => Some(build_entry(
                sum_range(sheet, *start..*end, layout.current_column),
                sum_range(sheet, *start..*end, layout.prior_column),
            )),
            Lookup::Cells { current, prior } => Some(build_entry(
                safe_int(sheet.cell(current.row, current.col)),
                safe_int(sheet.cell(prior.row, prior.col)),
            )),
        };

        if entry.is_none() {
            debug!(sheet = sheet.name(), metric = %metric.key, "metric not found");
        }
        result.insert(metric.key.clone(), entry);
    }

    result
}
