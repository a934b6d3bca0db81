//! Positional layout of the statement workbook.
//!
//! Every row, column and label the extractors depend on is declared here.
//! Row indices are data-row indices (0 is the first row below the header);
//! ranges are half-open. A restated workbook is handled by editing these
//! constants or by loading a YAML layout with [`WorkbookLayout::from_yaml`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{KpiError, Result};
use crate::ratios::ratio_inputs;
use crate::types::ReportKind;

pub const FINANCIAL_POSITION_SHEET: &str = "Statement of Financial Position";
pub const COMPREHENSIVE_INCOME_SHEET: &str = "Statement of Com. Income";
pub const CHANGES_IN_EQUITY_SHEET: &str = "Statement of Changes in Equity";
pub const CASH_FLOWS_SHEET: &str = "Statement of Cash Flows";

pub const CURRENT_PERIOD_LABEL: &str = "FY2023/24";
pub const PRIOR_PERIOD_LABEL: &str = "FY2022/23";
pub const DEFAULT_PERIOD_MONTHS: u32 = 12;

// Columns
pub const LABEL_COLUMN: usize = 0;
pub const CASH_FLOW_LABEL_COLUMNS: [usize; 3] = [0, 1, 2];
pub const CURRENT_COLUMN: usize = 4;
pub const PRIOR_COLUMN: usize = 6;
pub const CASH_FLOW_CURRENT_COLUMN: usize = 5;
pub const CASH_FLOW_PRIOR_COLUMN: usize = 7;
pub const EQUITY_VALUE_COLUMN: usize = 7;

// Financial position rows
pub const TOTAL_EQUITY_ROWS: (usize, usize) = (5, 7);
pub const NON_CURRENT_ASSETS_ROWS: (usize, usize) = (11, 16);
pub const CURRENT_ASSETS_ROWS: (usize, usize) = (19, 23);
pub const CURRENT_LIABILITIES_ROWS: (usize, usize) = (28, 36);
pub const NON_CURRENT_LIABILITIES_ROWS: (usize, usize) = (43, 46);

// Comprehensive income rows
pub const OPERATING_INCOME_ROWS: (usize, usize) = (6, 8);
pub const OPERATING_EXPENDITURE_ROWS: (usize, usize) = (12, 23);
pub const NET_INVESTMENT_INCOME_ROW: usize = 27;
/// The contribution label is also a substring of the surplus-before-contribution
/// label one row above it, so it is read by position.
pub const CONTRIBUTION_TO_GOV_FUND_ROW: usize = 30;

// Changes in equity rows (current, prior)
pub const TOTAL_COMPREHENSIVE_INCOME_ROWS: (usize, usize) = (15, 8);
pub const DIVIDENDS_PAID_ROWS: (usize, usize) = (18, 11);

// Cash flow rows
pub const BEGINNING_CASH_ROW: usize = 27;
pub const ENDING_CASH_ROW: usize = 29;
pub const CAPEX_ROWS: (usize, usize) = (15, 17);

// Metric keys read by ratio computation.
pub const SHARE_CAPITAL: &str = "Share Capital";
pub const ACCUMULATED_SURPLUS: &str = "Accumulated Surplus";
pub const TOTAL_EQUITY: &str = "Total Equity";
pub const NON_CURRENT_ASSETS: &str = "Non-Current Assets";
pub const TOTAL_CURRENT_ASSETS: &str = "Total Current Assets";
pub const TOTAL_CURRENT_LIABILITIES: &str = "Total Current Liabilities";
pub const NET_CURRENT_ASSETS: &str = "Net Current Assets";
pub const NON_CURRENT_LIABILITIES: &str = "Non-Current Liabilities";

pub const OPERATING_INCOME: &str = "Operating Income";
pub const TOTAL_OPERATING_EXPENDITURE: &str = "Total Operating Expenditure";
pub const OPERATING_SURPLUS: &str = "Operating Surplus";
pub const NET_INVESTMENT_INCOME: &str = "Net Investment Income/(Loss)";
pub const SURPLUS_BEFORE_GOV_FUND: &str = "Surplus Before Gov Fund";
pub const CONTRIBUTION_TO_GOV_FUND: &str = "Contribution to Gov Fund";
pub const NET_SURPLUS: &str = "Net Surplus for the Year";

pub const TOTAL_COMPREHENSIVE_INCOME: &str = "Total Comprehensive Income";
pub const DIVIDENDS_PAID: &str = "Dividends Paid";

pub const OPERATING_CASH_FLOW: &str = "Net Cash from Operating Activities";
pub const INVESTING_CASH_FLOW: &str = "Net Cash from Investing Activities";
pub const FINANCING_CASH_FLOW: &str = "Net Cash from Financing Activities";
pub const NET_CASH_MOVEMENT: &str = "Net Cash Movement";
pub const BEGINNING_CASH: &str = "Beginning Cash";
pub const ENDING_CASH: &str = "Ending Cash";

/// A single cell by data-row and column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// How a metric's values are located in its sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "lookup", rename_all = "snake_case")]
pub enum Lookup {
    /// First row whose label text contains `pattern` (case-insensitive).
    Label { pattern: String },
    /// Sum of rows `[start, end)` in the sheet's current and prior columns.
    Range { start: usize, end: usize },
    /// Two fixed cells.
    Cells { current: CellRef, prior: CellRef },
}

impl Lookup {
    #[must_use]
    pub fn label(pattern: &str) -> Self {
        Self::Label {
            pattern: pattern.to_string(),
        }
    }

    #[must_use]
    pub const fn range(rows: (usize, usize)) -> Self {
        Self::Range {
            start: rows.0,
            end: rows.1,
        }
    }

    #[must_use]
    pub const fn row(row: usize) -> Self {
        Self::Range {
            start: row,
            end: row + 1,
        }
    }
}

/// One metric of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub key: String,
    #[serde(flatten)]
    pub lookup: Lookup,
}

impl MetricSpec {
    #[must_use]
    pub fn new(key: &str, lookup: Lookup) -> Self {
        Self {
            key: key.to_string(),
            lookup,
        }
    }
}

/// Layout of one statement sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub sheet_name: String,
    /// Columns joined (space-separated) into the searchable label of a row.
    pub label_columns: Vec<usize>,
    pub current_column: usize,
    pub prior_column: usize,
    /// Metrics in display order.
    pub metrics: Vec<MetricSpec>,
}

/// Capital expenditure line items, summed as signed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapexBlock {
    pub start: usize,
    pub end: usize,
    pub column: usize,
}

/// Display labels of the two compared periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLabels {
    pub current: String,
    pub prior: String,
}

impl Default for PeriodLabels {
    fn default() -> Self {
        Self {
            current: CURRENT_PERIOD_LABEL.to_string(),
            prior: PRIOR_PERIOD_LABEL.to_string(),
        }
    }
}

/// Complete workbook layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookLayout {
    pub periods: PeriodLabels,
    /// Length of the reporting period, used for monthly burn and runway.
    pub period_months: u32,
    pub financial_position: SheetLayout,
    pub comprehensive_income: SheetLayout,
    pub changes_in_equity: SheetLayout,
    pub cash_flows: SheetLayout,
    pub capex: CapexBlock,
}

impl Default for WorkbookLayout {
    fn default() -> Self {
        Self {
            periods: PeriodLabels::default(),
            period_months: DEFAULT_PERIOD_MONTHS,
            financial_position: financial_position(),
            comprehensive_income: comprehensive_income(),
            changes_in_equity: changes_in_equity(),
            cash_flows: cash_flows(),
            capex: CapexBlock {
                start: CAPEX_ROWS.0,
                end: CAPEX_ROWS.1,
                column: CASH_FLOW_CURRENT_COLUMN,
            },
        }
    }
}

fn financial_position() -> SheetLayout {
    SheetLayout {
        sheet_name: FINANCIAL_POSITION_SHEET.to_string(),
        label_columns: vec![LABEL_COLUMN],
        current_column: CURRENT_COLUMN,
        prior_column: PRIOR_COLUMN,
        metrics: vec![
            MetricSpec::new(SHARE_CAPITAL, Lookup::label("Share capital")),
            MetricSpec::new(ACCUMULATED_SURPLUS, Lookup::label("Accumulated surplus")),
            MetricSpec::new(TOTAL_EQUITY, Lookup::range(TOTAL_EQUITY_ROWS)),
            MetricSpec::new(NON_CURRENT_ASSETS, Lookup::range(NON_CURRENT_ASSETS_ROWS)),
            MetricSpec::new(TOTAL_CURRENT_ASSETS, Lookup::range(CURRENT_ASSETS_ROWS)),
            MetricSpec::new(
                TOTAL_CURRENT_LIABILITIES,
                Lookup::range(CURRENT_LIABILITIES_ROWS),
            ),
            MetricSpec::new(NET_CURRENT_ASSETS, Lookup::label("Net current assets")),
            MetricSpec::new(
                NON_CURRENT_LIABILITIES,
                Lookup::range(NON_CURRENT_LIABILITIES_ROWS),
            ),
        ],
    }
}

fn comprehensive_income() -> SheetLayout {
    SheetLayout {
        sheet_name: COMPREHENSIVE_INCOME_SHEET.to_string(),
        label_columns: vec![LABEL_COLUMN],
        current_column: CURRENT_COLUMN,
        prior_column: PRIOR_COLUMN,
        metrics: vec![
            MetricSpec::new(OPERATING_INCOME, Lookup::range(OPERATING_INCOME_ROWS)),
            MetricSpec::new(
                TOTAL_OPERATING_EXPENDITURE,
                Lookup::range(OPERATING_EXPENDITURE_ROWS),
            ),
            MetricSpec::new(OPERATING_SURPLUS, Lookup::label("Operating surplus")),
            MetricSpec::new(NET_INVESTMENT_INCOME, Lookup::row(NET_INVESTMENT_INCOME_ROW)),
            MetricSpec::new(
                SURPLUS_BEFORE_GOV_FUND,
                Lookup::label("Government Consolidated Fund"),
            ),
            MetricSpec::new(
                CONTRIBUTION_TO_GOV_FUND,
                Lookup::row(CONTRIBUTION_TO_GOV_FUND_ROW),
            ),
            MetricSpec::new(
                NET_SURPLUS,
                Lookup::label("comprehensive income for the financial year"),
            ),
        ],
    }
}

fn changes_in_equity() -> SheetLayout {
    let cells = |(current, prior): (usize, usize)| Lookup::Cells {
        current: CellRef::new(current, EQUITY_VALUE_COLUMN),
        prior: CellRef::new(prior, EQUITY_VALUE_COLUMN),
    };

    SheetLayout {
        sheet_name: CHANGES_IN_EQUITY_SHEET.to_string(),
        label_columns: vec![LABEL_COLUMN],
        current_column: EQUITY_VALUE_COLUMN,
        prior_column: EQUITY_VALUE_COLUMN,
        metrics: vec![
            MetricSpec::new(
                TOTAL_COMPREHENSIVE_INCOME,
                cells(TOTAL_COMPREHENSIVE_INCOME_ROWS),
            ),
            MetricSpec::new(DIVIDENDS_PAID, cells(DIVIDENDS_PAID_ROWS)),
        ],
    }
}

fn cash_flows() -> SheetLayout {
    SheetLayout {
        sheet_name: CASH_FLOWS_SHEET.to_string(),
        label_columns: CASH_FLOW_LABEL_COLUMNS.to_vec(),
        current_column: CASH_FLOW_CURRENT_COLUMN,
        prior_column: CASH_FLOW_PRIOR_COLUMN,
        metrics: vec![
            MetricSpec::new(
                OPERATING_CASH_FLOW,
                Lookup::label("Net cash from operating activities"),
            ),
            MetricSpec::new(
                INVESTING_CASH_FLOW,
                Lookup::label("Net cash used in investing activities"),
            ),
            MetricSpec::new(
                FINANCING_CASH_FLOW,
                Lookup::label("Net cash used in financing activities"),
            ),
            MetricSpec::new(
                NET_CASH_MOVEMENT,
                Lookup::label("Net (decrease)/increase in cash and cash equivalents"),
            ),
            MetricSpec::new(BEGINNING_CASH, Lookup::row(BEGINNING_CASH_ROW)),
            MetricSpec::new(ENDING_CASH, Lookup::row(ENDING_CASH_ROW)),
        ],
    }
}

impl WorkbookLayout {
    /// Layout of one report.
    #[must_use]
    pub const fn sheet(&self, kind: ReportKind) -> &SheetLayout {
        match kind {
            ReportKind::FinancialPosition => &self.financial_position,
            ReportKind::ComprehensiveIncome => &self.comprehensive_income,
            ReportKind::ChangesInEquity => &self.changes_in_equity,
            ReportKind::CashFlows => &self.cash_flows,
        }
    }

    /// Parses a layout from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not describe a complete layout.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Loads and validates a layout file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let layout = Self::from_yaml(&content)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Serializes the layout to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Ratio input keys that no metric of their report declares.
    #[must_use]
    pub fn missing_ratio_inputs(&self) -> Vec<(ReportKind, &'static str)> {
        ReportKind::ALL
            .into_iter()
            .flat_map(|kind| {
                let metrics = &self.sheet(kind).metrics;
                ratio_inputs(kind)
                    .iter()
                    .filter(move |key| !metrics.iter().any(|m| m.key == **key))
                    .map(move |&key| (kind, key))
            })
            .collect()
    }

    /// Checks structural consistency.
    ///
    /// Ratio inputs missing from the layout are logged as warnings; the
    /// affected ratios come out as missing rather than failing the layout.
    ///
    /// # Errors
    ///
    /// Returns [`KpiError::InvalidLayout`] on duplicate metric keys, reversed
    /// ranges, label lookups without label columns, or a zero-month period.
    pub fn validate(&self) -> Result<()> {
        if self.period_months == 0 {
            return Err(KpiError::InvalidLayout(
                "period_months must be greater than zero".to_string(),
            ));
        }
        if self.capex.start > self.capex.end {
            return Err(KpiError::InvalidLayout(format!(
                "capex rows {}..{} are reversed",
                self.capex.start, self.capex.end
            )));
        }

        for kind in ReportKind::ALL {
            let sheet = self.sheet(kind);
            let mut seen = HashSet::new();
            for metric in &sheet.metrics {
                if !seen.insert(metric.key.as_str()) {
                    return Err(KpiError::InvalidLayout(format!(
                        "duplicate metric '{}' in {}",
                        metric.key, sheet.sheet_name
                    )));
                }
                match &metric.lookup {
                    Lookup::Range { start, end } if start > end => {
                        return Err(KpiError::InvalidLayout(format!(
                            "metric '{}' in {} has reversed rows {start}..{end}",
                            metric.key, sheet.sheet_name
                        )));
                    }
                    Lookup::Label { .. } if sheet.label_columns.is_empty() => {
                        return Err(KpiError::InvalidLayout(format!(
                            "metric '{}' uses a label lookup but {} has no label columns",
                            metric.key, sheet.sheet_name
                        )));
                    }
                    _ => {}
                }
            }
        }

        for (kind, key) in self.missing_ratio_inputs() {
            warn!(report = %kind, metric = key, "layout does not declare a ratio input");
        }

        Ok(())
    }
}
