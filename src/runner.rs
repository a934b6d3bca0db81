//! Report runner: reads statement sheets and extracts KPIs.
//!
//! Pipeline:
//! 1. Open the workbook (again on every call, nothing is cached)
//! 2. Load the statement's sheet
//! 3. Extract the result set through the shared engine
//! 4. Attach derived ratios

use std::path::{Path, PathBuf};

use tracing::info;

use crate::engine::{capex, extract_report};
use crate::error::Result;
use crate::excel::SourceWorkbook;
use crate::layout::WorkbookLayout;
use crate::ratios::{self, RatioContext};
use crate::types::{ReportKind, ReportOutcome, ReportResult};

/// Extracts KPI reports from one statement workbook.
pub struct ReportRunner {
    /// Path to the source workbook.
    workbook: PathBuf,
    /// Positional layout of the statements.
    layout: WorkbookLayout,
}

impl ReportRunner {
    /// Creates a new runner.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout fails validation.
    pub fn new(workbook: PathBuf, layout: WorkbookLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self { workbook, layout })
    }

    #[must_use]
    pub fn workbook(&self) -> &Path {
        &self.workbook
    }

    #[must_use]
    pub const fn layout(&self) -> &WorkbookLayout {
        &self.layout
    }

    fn extract(&self, book: &mut SourceWorkbook, kind: ReportKind) -> Result<ReportResult> {
        let sheet_layout = self.layout.sheet(kind);
        let sheet = book.sheet(&sheet_layout.sheet_name)?;
        let result = extract_report(&sheet, sheet_layout);
        info!(
            report = %kind,
            sheet = sheet.name(),
            metrics = result.len(),
            missing = result.iter().filter(|(_, e)| e.is_none()).count(),
            "extracted report"
        );
        Ok(result)
    }

    /// Extracts one report and its ratios.
    ///
    /// Changes in equity also reads the financial position report for its
    /// growth ratios; cash flows also reads the capex line items.
    ///
    /// # Errors
    ///
    /// Returns an error if the workbook or a required sheet cannot be read.
    pub fn run(&self, kind: ReportKind) -> Result<ReportOutcome> {
        let mut book = SourceWorkbook::open(&self.workbook)?;
        let result = self.extract(&mut book, kind)?;

        let position = match kind {
            ReportKind::ChangesInEquity => {
                Some(self.extract(&mut book, ReportKind::FinancialPosition)?)
            }
            _ => None,
        };
        let capex = match kind {
            ReportKind::CashFlows => {
                let sheet = book.sheet(&self.layout.cash_flows.sheet_name)?;
                capex(&sheet, &self.layout.capex)
            }
            _ => 0,
        };

        let ctx = RatioContext {
            position: position.as_ref(),
            capex,
            months: self.layout.period_months,
        };
        let ratios = ratios::compute(kind, &result, ctx);

        Ok(ReportOutcome {
            kind,
            sheet_name: self.layout.sheet(kind).sheet_name.clone(),
            result,
            ratios,
        })
    }

    /// Extracts all four reports in statement order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered; there are no partial results.
    pub fn run_all(&self) -> Result<Vec<ReportOutcome>> {
        ReportKind::ALL.iter().map(|&kind| self.run(kind)).collect()
    }
}
