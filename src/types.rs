//! Common types for statement-kpis.
//!
//! Defines KPI entries, ordered per-report result sets, derived ratios and
//! the outcome handed to renderers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four statements of an annual financial report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    FinancialPosition,
    ComprehensiveIncome,
    ChangesInEquity,
    CashFlows,
}

impl ReportKind {
    /// All reports in statement order.
    pub const ALL: [Self; 4] = [
        Self::FinancialPosition,
        Self::ComprehensiveIncome,
        Self::ChangesInEquity,
        Self::CashFlows,
    ];

    /// Human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::FinancialPosition => "Statement of Financial Position",
            Self::ComprehensiveIncome => "Statement of Comprehensive Income",
            Self::ChangesInEquity => "Statement of Changes in Equity",
            Self::CashFlows => "Statement of Cash Flows",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Current and prior period values with their percentage change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiEntry {
    pub current: i64,
    pub prior: i64,
    /// Rounded to 2 decimals; 0 when `prior` is 0.
    pub change_pct: f64,
}

/// Insertion-ordered mapping of metric key to entry.
///
/// `None` marks a metric whose lookup found nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportResult {
    entries: Vec<(String, Option<KpiEntry>)>,
}

impl ReportResult {
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Appends a metric. Keys are unique per layout, so a repeated key
    /// replaces the earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, entry: Option<KpiEntry>) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = entry;
        } else {
            self.entries.push((key, entry));
        }
    }

    /// Returns the entry for `key`. The outer `Option` is `None` when the key
    /// is unknown, the inner one when the metric is missing.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<KpiEntry>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, entry)| *entry)
    }

    /// Returns the entry for `key`, flattening unknown and missing.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<KpiEntry> {
        self.get(key).flatten()
    }

    /// Current-period value for `key`.
    #[must_use]
    pub fn current(&self, key: &str) -> Option<i64> {
        self.entry(key).map(|e| e.current)
    }

    /// Prior-period value for `key`.
    #[must_use]
    pub fn prior(&self, key: &str) -> Option<i64> {
        self.entry(key).map(|e| e.prior)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&KpiEntry>)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e.as_ref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattens into serializable rows.
    #[must_use]
    pub fn rows(&self) -> Vec<MetricRow> {
        self.entries
            .iter()
            .map(|(metric, entry)| MetricRow {
                metric: metric.clone(),
                current: entry.map(|e| e.current),
                prior: entry.map(|e| e.prior),
                change_pct: entry.map(|e| e.change_pct),
            })
            .collect()
    }
}

/// One metric row for YAML/CSV output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub metric: String,
    pub current: Option<i64>,
    pub prior: Option<i64>,
    pub change_pct: Option<f64>,
}

/// Value of a derived ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RatioValue {
    /// Computed value. Zero denominators yield 0.
    Value(f64),
    /// A required input metric was absent.
    Missing,
    /// The ratio has no meaning for these inputs (e.g. runway with positive OCF).
    NotApplicable,
}

impl RatioValue {
    /// Returns `true` if the ratio carries a number.
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Option<f64>> for RatioValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Value)
    }
}

/// How a ratio is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioFormat {
    /// Fraction shown as a percentage (0.1234 -> 12.34%).
    Percent,
    /// Already-scaled percentage with sign (7.42 -> +7.42%).
    SignedPercent,
    Decimal,
    Currency,
    CurrencyPerMonth,
    Months,
}

/// A named derived KPI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ratio {
    pub name: &'static str,
    pub value: RatioValue,
    pub format: RatioFormat,
}

impl Ratio {
    #[must_use]
    pub const fn new(name: &'static str, value: RatioValue, format: RatioFormat) -> Self {
        Self { name, value, format }
    }
}

/// Extraction result for one statement plus its derived ratios.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub kind: ReportKind,
    pub sheet_name: String,
    #[serde(serialize_with = "serialize_result")]
    pub result: ReportResult,
    pub ratios: Vec<Ratio>,
}

fn serialize_result<S>(result: &ReportResult, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    result.rows().serialize(serializer)
}
