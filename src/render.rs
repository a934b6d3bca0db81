//! Terminal and text rendering of extracted KPIs.

use std::fmt::Write as _;
use std::io;

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::error::Result;
use crate::layout::PeriodLabels;
use crate::types::{Ratio, RatioFormat, RatioValue, ReportKind, ReportOutcome, ReportResult};

/// Formats an integer with comma thousands separators.
#[must_use]
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed percent change, e.g. `+7.42%`.
#[must_use]
pub fn format_change(pct: f64) -> String {
    format!("{pct:+.2}%")
}

#[allow(clippy::cast_possible_truncation)]
fn format_currency(value: f64) -> String {
    format!("S${}", format_thousands(value.round() as i64))
}

/// Direction of a percent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTone {
    Up,
    Down,
    Flat,
}

impl ChangeTone {
    #[must_use]
    pub fn of(pct: f64) -> Self {
        if pct > 0.0 {
            Self::Up
        } else if pct < 0.0 {
            Self::Down
        } else {
            Self::Flat
        }
    }

    #[must_use]
    pub const fn arrow(self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Down => "↓",
            Self::Flat => "–",
        }
    }

    /// Green, red or gray.
    #[must_use]
    pub fn paint(self, text: &str) -> ColoredString {
        match self {
            Self::Up => text.green(),
            Self::Down => text.red(),
            Self::Flat => text.bright_black(),
        }
    }
}

fn metric_width(result: &ReportResult) -> usize {
    result
        .keys()
        .map(|k| k.chars().count())
        .max()
        .unwrap_or(0)
        .max("Metric".len())
}

/// KPI summary table: metric, current, prior and colored percent change.
/// Missing metrics show `-`.
#[must_use]
pub fn render_table(result: &ReportResult, labels: &PeriodLabels) -> String {
    let width = metric_width(result);
    let mut out = String::new();

    let header = format!(
        "{:<width$}  {:>18}  {:>18}  {:>10}",
        "Metric", labels.current, labels.prior, "% Change"
    );
    let _ = writeln!(out, "{}", header.bold());
    let _ = writeln!(out, "{}", "─".repeat(width + 52));

    for (metric, entry) in result.iter() {
        match entry {
            Some(e) => {
                let change = format!("{:>10}", format_change(e.change_pct));
                let _ = writeln!(
                    out,
                    "{metric:<width$}  {:>18}  {:>18}  {}",
                    format_thousands(e.current),
                    format_thousands(e.prior),
                    ChangeTone::of(e.change_pct).paint(&change)
                );
            }
            None => {
                let _ = writeln!(out, "{metric:<width$}  {:>18}  {:>18}  {:>10}", "-", "-", "-");
            }
        }
    }

    out
}

/// Quick-view cards: current value with direction arrow and absolute change.
#[must_use]
pub fn render_cards(result: &ReportResult) -> String {
    let width = metric_width(result);
    let mut out = String::new();

    for (metric, entry) in result.iter() {
        let Some(e) = entry else {
            let _ = writeln!(out, "  {metric:<width$}  {}", format!("{:>18}", "n/a").dimmed());
            continue;
        };
        let tone = ChangeTone::of(e.change_pct);
        let delta = format!("{} {:.2}%", tone.arrow(), e.change_pct.abs());
        let label = format!("{metric:<width$}");
        let _ = writeln!(
            out,
            "  {}  {:>18}  {}",
            label.bold(),
            format_thousands(e.current),
            tone.paint(&delta)
        );
    }

    out
}

/// Display text of a ratio.
#[must_use]
pub fn format_ratio(ratio: &Ratio) -> String {
    let v = match ratio.value {
        RatioValue::Value(v) => v,
        RatioValue::Missing => return "n/a".to_string(),
        RatioValue::NotApplicable => {
            return match ratio.format {
                RatioFormat::Months | RatioFormat::CurrencyPerMonth => {
                    "Not applicable (positive OCF)".to_string()
                }
                _ => "Not applicable".to_string(),
            };
        }
    };

    match ratio.format {
        RatioFormat::Percent => format!("{:.2}%", v * 100.0),
        RatioFormat::SignedPercent => format!("{v:+.2}%"),
        RatioFormat::Decimal => format!("{v:.2}"),
        RatioFormat::Currency => format_currency(v),
        RatioFormat::CurrencyPerMonth => format!("{} / month", format_currency(v)),
        RatioFormat::Months => format!("{v:.1} months"),
    }
}

/// Ratio cards, one per line. Signed growth figures are colored by direction.
#[must_use]
pub fn render_ratios(ratios: &[Ratio]) -> String {
    let width = ratios
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();

    for ratio in ratios {
        let text = format_ratio(ratio);
        let painted = match (ratio.format, ratio.value) {
            (RatioFormat::SignedPercent, RatioValue::Value(v)) => ChangeTone::of(v).paint(&text),
            (_, RatioValue::Value(_)) => text.cyan(),
            _ => text.dimmed(),
        };
        let label = format!("{:<width$}", ratio.name);
        let _ = writeln!(out, "  {}  {painted}", label.bold());
    }

    out
}

/// Plain-text KPI summary, one line per present metric.
#[must_use]
pub fn format_summary(result: &ReportResult, labels: &PeriodLabels) -> String {
    result
        .iter()
        .filter_map(|(metric, entry)| {
            entry.map(|e| {
                format!(
                    "{metric}: {} = {}, {} = {}, Change = {}%",
                    labels.current,
                    format_thousands(e.current),
                    labels.prior,
                    format_thousands(e.prior),
                    e.change_pct
                )
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct CsvRow<'a> {
    report: ReportKind,
    metric: &'a str,
    current: Option<i64>,
    prior: Option<i64>,
    change_pct: Option<f64>,
}

/// Writes all outcomes as flat CSV rows.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn write_csv<W: io::Write>(outcomes: &[ReportOutcome], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for outcome in outcomes {
        for (metric, entry) in outcome.result.iter() {
            wtr.serialize(CsvRow {
                report: outcome.kind,
                metric,
                current: entry.map(|e| e.current),
                prior: entry.map(|e| e.prior),
                change_pct: entry.map(|e| e.change_pct),
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_entry;
    use pretty_assertions::assert_eq;

    fn sample() -> ReportResult {
        let mut result = ReportResult::new();
        result.insert("Total Equity", Some(build_entry(3_587_340_000, 3_339_546_000)));
        result.insert("Share Capital", None);
        result.insert("Flat", Some(build_entry(5, 5)));
        result
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(3_587_340_000), "3,587,340,000");
        assert_eq!(format_thousands(-1_234_567), "-1,234,567");
        assert_eq!(format_thousands(i64::MIN), "-9,223,372,036,854,775,808");
    }

    #[test]
    fn change_is_signed() {
        assert_eq!(format_change(7.42), "+7.42%");
        assert_eq!(format_change(-30.19), "-30.19%");
        assert_eq!(format_change(0.0), "+0.00%");
    }

    #[test]
    fn tone_by_sign() {
        assert_eq!(ChangeTone::of(0.01), ChangeTone::Up);
        assert_eq!(ChangeTone::of(-0.01), ChangeTone::Down);
        assert_eq!(ChangeTone::of(0.0), ChangeTone::Flat);
    }

    #[test]
    fn table_shows_values_and_missing() {
        let table = render_table(&sample(), &PeriodLabels::default());

        assert!(table.contains("FY2023/24"));
        assert!(table.contains("3,587,340,000"));
        assert!(table.contains("3,339,546,000"));
        assert!(table.contains("+7.42%"));
        let missing = table.lines().find(|l| l.starts_with("Share Capital")).unwrap();
        assert!(missing.trim_end().ends_with('-'));
    }

    #[test]
    fn cards_show_arrow_and_absolute_change() {
        let mut result = ReportResult::new();
        result.insert("Down", Some(build_entry(70, 100)));
        let cards = render_cards(&result);

        assert!(cards.contains("↓ 30.00%"));
        assert!(cards.contains("70"));
    }

    #[test]
    fn ratio_formats() {
        let r = |value, format| format_ratio(&Ratio::new("r", value, format));

        assert_eq!(r(RatioValue::Value(0.7799), RatioFormat::Percent), "77.99%");
        assert_eq!(r(RatioValue::Value(6.98), RatioFormat::SignedPercent), "+6.98%");
        assert_eq!(r(RatioValue::Value(5.0), RatioFormat::Decimal), "5.00");
        assert_eq!(
            r(RatioValue::Value(2_400_000_000.0), RatioFormat::Currency),
            "S$2,400,000,000"
        );
        assert_eq!(
            r(RatioValue::Value(100.4), RatioFormat::CurrencyPerMonth),
            "S$100 / month"
        );
        assert_eq!(r(RatioValue::Value(12.04), RatioFormat::Months), "12.0 months");
        assert_eq!(r(RatioValue::Missing, RatioFormat::Decimal), "n/a");
        assert_eq!(
            r(RatioValue::NotApplicable, RatioFormat::Months),
            "Not applicable (positive OCF)"
        );
    }

    #[test]
    fn summary_lines_skip_missing() {
        let summary = format_summary(&sample(), &PeriodLabels::default());
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Total Equity: FY2023/24 = 3,587,340,000, FY2022/23 = 3,339,546,000, Change = 7.42%",
                "Flat: FY2023/24 = 5, FY2022/23 = 5, Change = 0%",
            ]
        );
    }

    #[test]
    fn csv_has_header_and_blank_missing_fields() {
        let outcome = ReportOutcome {
            kind: ReportKind::FinancialPosition,
            sheet_name: "Statement of Financial Position".to_string(),
            result: sample(),
            ratios: Vec::new(),
        };
        let mut buf = Vec::new();
        write_csv(&[outcome], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "report,metric,current,prior,change_pct");
        assert_eq!(
            lines[1],
            "financial_position,Total Equity,3587340000,3339546000,7.42"
        );
        assert_eq!(lines[2], "financial_position,Share Capital,,,");
    }
}
