//! Derived ratios per statement.
//!
//! Ratios read current-period values from an extracted [`ReportResult`].
//! A zero denominator yields 0 and a missing input yields
//! [`RatioValue::Missing`]; nothing here fails.

use crate::layout::{
    ACCUMULATED_SURPLUS, BEGINNING_CASH, CONTRIBUTION_TO_GOV_FUND, DIVIDENDS_PAID, ENDING_CASH,
    FINANCING_CASH_FLOW, NET_CASH_MOVEMENT, NET_INVESTMENT_INCOME, NET_SURPLUS,
    NON_CURRENT_ASSETS, NON_CURRENT_LIABILITIES, OPERATING_CASH_FLOW, OPERATING_INCOME,
    OPERATING_SURPLUS, SURPLUS_BEFORE_GOV_FUND, TOTAL_COMPREHENSIVE_INCOME,
    TOTAL_CURRENT_ASSETS, TOTAL_CURRENT_LIABILITIES, TOTAL_EQUITY,
};
use crate::types::{Ratio, RatioFormat, RatioValue, ReportKind, ReportResult};

#[allow(clippy::cast_precision_loss)]
fn div(num: i64, den: i64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn fdiv(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Growth in percent from `prior` to `current`, 0 when `prior` is 0.
#[allow(clippy::cast_precision_loss)]
fn growth(current: i64, prior: i64) -> f64 {
    fdiv(current as f64 - prior as f64, prior as f64) * 100.0
}

/// Ratios of the statement of financial position.
#[must_use]
pub fn financial_position(position: &ReportResult) -> Vec<Ratio> {
    let equity = position.current(TOTAL_EQUITY);
    let current_assets = position.current(TOTAL_CURRENT_ASSETS);
    let non_current_assets = position.current(NON_CURRENT_ASSETS);
    let current_liabilities = position.current(TOTAL_CURRENT_LIABILITIES);
    let non_current_liabilities = position.current(NON_CURRENT_LIABILITIES);

    let assets = current_assets
        .zip(non_current_assets)
        .map(|(ca, nca)| ca.saturating_add(nca));
    let prior_assets = position
        .prior(TOTAL_CURRENT_ASSETS)
        .zip(position.prior(NON_CURRENT_ASSETS))
        .map(|(ca, nca)| ca.saturating_add(nca));
    let liabilities = current_liabilities
        .zip(non_current_liabilities)
        .map(|(cl, ncl)| cl.saturating_add(ncl));

    #[allow(clippy::cast_precision_loss)]
    let working_capital = current_assets
        .zip(current_liabilities)
        .map(|(ca, cl)| ca as f64 - cl as f64);

    vec![
        Ratio::new(
            "Equity/Assets Ratio",
            equity.zip(assets).map(|(e, a)| div(e, a)).into(),
            RatioFormat::Percent,
        ),
        Ratio::new(
            "Current Ratio",
            current_assets
                .zip(current_liabilities)
                .map(|(ca, cl)| div(ca, cl))
                .into(),
            RatioFormat::Decimal,
        ),
        Ratio::new(
            "Working Capital",
            working_capital.into(),
            RatioFormat::Currency,
        ),
        Ratio::new(
            "Debt-to-Equity Ratio",
            liabilities.zip(equity).map(|(l, e)| div(l, e)).into(),
            RatioFormat::Decimal,
        ),
        Ratio::new(
            "YoY Asset Growth",
            assets
                .zip(prior_assets)
                .map(|(cur, prior)| growth(cur, prior))
                .into(),
            RatioFormat::SignedPercent,
        ),
    ]
}

/// Ratios of the statement of comprehensive income.
#[must_use]
pub fn comprehensive_income(income: &ReportResult) -> Vec<Ratio> {
    let operating_income = income.current(OPERATING_INCOME);
    let share_of_income = |key: &str| -> RatioValue {
        income
            .current(key)
            .zip(operating_income)
            .map(|(v, oi)| div(v, oi))
            .into()
    };

    vec![
        Ratio::new(
            "Operating Surplus Margin",
            share_of_income(OPERATING_SURPLUS),
            RatioFormat::Percent,
        ),
        Ratio::new(
            "Investment Return Contribution",
            share_of_income(NET_INVESTMENT_INCOME),
            RatioFormat::Decimal,
        ),
        Ratio::new(
            "Gov Fund Contribution Ratio",
            income
                .current(CONTRIBUTION_TO_GOV_FUND)
                .zip(income.current(SURPLUS_BEFORE_GOV_FUND))
                .map(|(c, s)| div(c, s))
                .into(),
            RatioFormat::Decimal,
        ),
        Ratio::new(
            "Net Surplus Margin",
            share_of_income(NET_SURPLUS),
            RatioFormat::Decimal,
        ),
        Ratio::new(
            "YoY Income Growth",
            income
                .entry(OPERATING_INCOME)
                .map(|e| growth(e.current, e.prior))
                .into(),
            RatioFormat::SignedPercent,
        ),
    ]
}

/// Ratios of the statement of changes in equity.
///
/// Retained-earnings and internal equity growth come from the financial
/// position report and are missing when it is not supplied.
#[must_use]
pub fn changes_in_equity(equity: &ReportResult, position: Option<&ReportResult>) -> Vec<Ratio> {
    let position_change = |key: &str| -> RatioValue {
        position
            .and_then(|p| p.entry(key))
            .map(|e| e.change_pct)
            .into()
    };

    vec![
        Ratio::new(
            "Dividend Payout Ratio",
            equity
                .current(DIVIDENDS_PAID)
                .zip(equity.current(TOTAL_COMPREHENSIVE_INCOME))
                .map(|(d, tci)| div(d.saturating_abs(), tci))
                .into(),
            RatioFormat::Percent,
        ),
        Ratio::new(
            "Dividends Growth",
            equity
                .entry(DIVIDENDS_PAID)
                .map(|e| growth(e.current.saturating_abs(), e.prior.saturating_abs()))
                .into(),
            RatioFormat::SignedPercent,
        ),
        Ratio::new(
            "Retained Earnings Growth",
            position_change(ACCUMULATED_SURPLUS),
            RatioFormat::SignedPercent,
        ),
        Ratio::new(
            "Equity Growth from Internal Sources",
            position_change(TOTAL_EQUITY),
            RatioFormat::SignedPercent,
        ),
    ]
}

/// Ratios of the statement of cash flows.
///
/// `capex` is the signed sum of the capital expenditure line items; `months`
/// is the reporting period length used for the monthly burn estimate.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cash_flows(cash: &ReportResult, capex: i64, months: u32) -> Vec<Ratio> {
    let operating = cash.current(OPERATING_CASH_FLOW);
    let financing = cash.current(FINANCING_CASH_FLOW);
    let ending = cash.current(ENDING_CASH);

    let monthly_burn = match operating {
        Some(ocf) if ocf < 0 => Some(ocf.unsigned_abs() as f64 / f64::from(months.max(1))),
        _ => None,
    };

    let burn_rate = match (operating, monthly_burn) {
        (None, _) => RatioValue::Missing,
        (Some(_), None) => RatioValue::NotApplicable,
        (Some(_), Some(burn)) => RatioValue::Value(burn),
    };

    let runway = match (operating, ending, monthly_burn) {
        (None, _, _) | (_, None, _) => RatioValue::Missing,
        (Some(_), Some(_), None) => RatioValue::NotApplicable,
        (Some(_), Some(end), Some(burn)) => RatioValue::Value(fdiv(end as f64, burn)),
    };

    vec![
        Ratio::new(
            "Free Cash Flow",
            operating.map(|ocf| ocf as f64 - capex as f64).into(),
            RatioFormat::Currency,
        ),
        Ratio::new(
            "Cash Flow Coverage Ratio",
            operating
                .zip(financing)
                .map(|(ocf, fin)| div(ocf, fin.saturating_abs()))
                .into(),
            RatioFormat::Decimal,
        ),
        Ratio::new(
            "Net Cash Margin",
            cash.current(NET_CASH_MOVEMENT)
                .zip(cash.current(BEGINNING_CASH))
                .map(|(movement, beginning)| div(movement, beginning))
                .into(),
            RatioFormat::Percent,
        ),
        Ratio::new("Cash Burn Rate", burn_rate, RatioFormat::CurrencyPerMonth),
        Ratio::new("Cash Runway", runway, RatioFormat::Months),
    ]
}

/// Metric keys each report's ratios read from its own result.
#[must_use]
pub const fn ratio_inputs(kind: ReportKind) -> &'static [&'static str] {
    match kind {
        ReportKind::FinancialPosition => &[
            TOTAL_EQUITY,
            NON_CURRENT_ASSETS,
            TOTAL_CURRENT_ASSETS,
            TOTAL_CURRENT_LIABILITIES,
            NON_CURRENT_LIABILITIES,
        ],
        ReportKind::ComprehensiveIncome => &[
            OPERATING_INCOME,
            OPERATING_SURPLUS,
            NET_INVESTMENT_INCOME,
            SURPLUS_BEFORE_GOV_FUND,
            CONTRIBUTION_TO_GOV_FUND,
            NET_SURPLUS,
        ],
        ReportKind::ChangesInEquity => &[TOTAL_COMPREHENSIVE_INCOME, DIVIDENDS_PAID],
        ReportKind::CashFlows => &[
            OPERATING_CASH_FLOW,
            FINANCING_CASH_FLOW,
            NET_CASH_MOVEMENT,
            BEGINNING_CASH,
            ENDING_CASH,
        ],
    }
}

/// Inputs for [`compute`] beyond the report's own result.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioContext<'a> {
    pub position: Option<&'a ReportResult>,
    pub capex: i64,
    pub months: u32,
}

/// Ratios for any report kind.
#[must_use]
pub fn compute(kind: ReportKind, result: &ReportResult, ctx: RatioContext<'_>) -> Vec<Ratio> {
    match kind {
        ReportKind::FinancialPosition => financial_position(result),
        ReportKind::ComprehensiveIncome => comprehensive_income(result),
        ReportKind::ChangesInEquity => changes_in_equity(result, ctx.position),
        ReportKind::CashFlows => cash_flows(result, ctx.capex, ctx.months),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_entry;
    use pretty_assertions::assert_eq;

    fn result(pairs: &[(&str, i64, i64)]) -> ReportResult {
        let mut result = ReportResult::new();
        for &(key, current, prior) in pairs {
            result.insert(key, Some(build_entry(current, prior)));
        }
        result
    }

    fn value(ratios: &[Ratio], name: &str) -> RatioValue {
        ratios
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value)
            .unwrap()
    }

    fn approx(ratios: &[Ratio], name: &str) -> f64 {
        value(ratios, name).as_f64().unwrap()
    }

    fn position() -> ReportResult {
        result(&[
            (TOTAL_EQUITY, 3_000, 2_500),
            (NON_CURRENT_ASSETS, 1_500, 1_500),
            (TOTAL_CURRENT_ASSETS, 2_500, 2_000),
            (TOTAL_CURRENT_LIABILITIES, 500, 400),
            (NON_CURRENT_LIABILITIES, 500, 600),
            (ACCUMULATED_SURPLUS, 2_000, 1_600),
        ])
    }

    #[test]
    fn position_ratios() {
        let ratios = financial_position(&position());

        assert!((approx(&ratios, "Equity/Assets Ratio") - 0.75).abs() < 1e-12);
        assert!((approx(&ratios, "Current Ratio") - 5.0).abs() < 1e-12);
        assert!((approx(&ratios, "Working Capital") - 2_000.0).abs() < 1e-12);
        assert!((approx(&ratios, "Debt-to-Equity Ratio") - 1_000.0 / 3_000.0).abs() < 1e-12);
        assert!((approx(&ratios, "YoY Asset Growth") - 14.285_714_285_714_286).abs() < 1e-9);
    }

    #[test]
    fn current_ratio_with_zero_liabilities_is_zero() {
        let mut pos = position();
        pos.insert(TOTAL_CURRENT_LIABILITIES, Some(build_entry(0, 0)));

        let ratios = financial_position(&pos);
        assert_eq!(value(&ratios, "Current Ratio"), RatioValue::Value(0.0));
    }

    #[test]
    fn zero_equity_and_zero_prior_assets_are_zero() {
        let pos = result(&[
            (TOTAL_EQUITY, 0, 0),
            (NON_CURRENT_ASSETS, 10, 0),
            (TOTAL_CURRENT_ASSETS, 10, 0),
            (TOTAL_CURRENT_LIABILITIES, 5, 5),
            (NON_CURRENT_LIABILITIES, 5, 5),
        ]);
        let ratios = financial_position(&pos);
        assert_eq!(value(&ratios, "Debt-to-Equity Ratio"), RatioValue::Value(0.0));
        assert_eq!(value(&ratios, "YoY Asset Growth"), RatioValue::Value(0.0));
    }

    #[test]
    fn missing_input_propagates() {
        let mut pos = position();
        pos.insert(TOTAL_EQUITY, None);

        let ratios = financial_position(&pos);
        assert_eq!(value(&ratios, "Equity/Assets Ratio"), RatioValue::Missing);
        assert_eq!(value(&ratios, "Debt-to-Equity Ratio"), RatioValue::Missing);
        assert!(value(&ratios, "Current Ratio").is_value());
    }

    #[test]
    fn income_ratios() {
        let income = result(&[
            (OPERATING_INCOME, 1_200, 1_000),
            (OPERATING_SURPLUS, 600, 500),
            (NET_INVESTMENT_INCOME, 60, -20),
            (SURPLUS_BEFORE_GOV_FUND, 660, 480),
            (CONTRIBUTION_TO_GOV_FUND, -132, -96),
            (NET_SURPLUS, 528, 384),
        ]);
        let ratios = comprehensive_income(&income);

        assert!((approx(&ratios, "Operating Surplus Margin") - 0.5).abs() < 1e-12);
        assert!((approx(&ratios, "Investment Return Contribution") - 0.05).abs() < 1e-12);
        assert!((approx(&ratios, "Gov Fund Contribution Ratio") - -0.2).abs() < 1e-12);
        assert!((approx(&ratios, "Net Surplus Margin") - 0.44).abs() < 1e-12);
        assert!((approx(&ratios, "YoY Income Growth") - 20.0).abs() < 1e-12);
    }

    #[test]
    fn zero_operating_income_zeroes_margins() {
        let income = result(&[
            (OPERATING_INCOME, 0, 0),
            (OPERATING_SURPLUS, 600, 500),
            (NET_INVESTMENT_INCOME, 60, -20),
            (SURPLUS_BEFORE_GOV_FUND, 660, 480),
            (CONTRIBUTION_TO_GOV_FUND, -132, -96),
            (NET_SURPLUS, 528, 384),
        ]);
        let ratios = comprehensive_income(&income);

        for name in [
            "Operating Surplus Margin",
            "Net Surplus Margin",
            "Investment Return Contribution",
        ] {
            assert_eq!(value(&ratios, name), RatioValue::Value(0.0), "{name}");
        }
    }

    #[test]
    fn equity_ratios_read_position_report() {
        let equity = result(&[
            (TOTAL_COMPREHENSIVE_INCOME, 500, 400),
            (DIVIDENDS_PAID, -200, -150),
        ]);
        let pos = position();

        let ratios = changes_in_equity(&equity, Some(&pos));
        assert!((approx(&ratios, "Dividend Payout Ratio") - 0.4).abs() < 1e-12);
        assert!((approx(&ratios, "Dividends Growth") - 100.0 / 3.0).abs() < 1e-9);
        assert!((approx(&ratios, "Retained Earnings Growth") - 25.0).abs() < 1e-12);
        assert!((approx(&ratios, "Equity Growth from Internal Sources") - 20.0).abs() < 1e-12);

        let alone = changes_in_equity(&equity, None);
        assert_eq!(value(&alone, "Retained Earnings Growth"), RatioValue::Missing);
        assert!(value(&alone, "Dividend Payout Ratio").is_value());
    }

    fn cash(operating: i64, financing: i64) -> ReportResult {
        result(&[
            (OPERATING_CASH_FLOW, operating, 0),
            (FINANCING_CASH_FLOW, financing, 0),
            (NET_CASH_MOVEMENT, 220, 240),
            (BEGINNING_CASH, 1_000, 760),
            (ENDING_CASH, 1_200, 1_000),
        ])
    }

    #[test]
    fn cash_flow_ratios_with_positive_ocf() {
        let ratios = cash_flows(&cash(500, -200), -80, 12);

        assert!((approx(&ratios, "Free Cash Flow") - 580.0).abs() < 1e-12);
        assert!((approx(&ratios, "Cash Flow Coverage Ratio") - 2.5).abs() < 1e-12);
        assert!((approx(&ratios, "Net Cash Margin") - 0.22).abs() < 1e-12);
        assert_eq!(value(&ratios, "Cash Burn Rate"), RatioValue::NotApplicable);
        assert_eq!(value(&ratios, "Cash Runway"), RatioValue::NotApplicable);
    }

    #[test]
    fn free_cash_flow_subtracts_signed_capex() {
        let ratios = cash_flows(&cash(500, -200), 30, 12);
        assert_eq!(value(&ratios, "Free Cash Flow"), RatioValue::Value(470.0));
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        let pos = result(&[
            (TOTAL_EQUITY, i64::MIN, i64::MAX),
            (NON_CURRENT_ASSETS, i64::MAX, i64::MAX),
            (TOTAL_CURRENT_ASSETS, i64::MAX, -1),
            (TOTAL_CURRENT_LIABILITIES, i64::MIN, 0),
            (NON_CURRENT_LIABILITIES, i64::MAX, 0),
        ]);
        let ratios = financial_position(&pos);
        assert!(ratios.iter().all(|r| r.value.as_f64().is_some_and(f64::is_finite)));

        let equity = result(&[
            (TOTAL_COMPREHENSIVE_INCOME, 1, 1),
            (DIVIDENDS_PAID, i64::MIN, i64::MIN),
        ]);
        let ratios = changes_in_equity(&equity, None);
        assert!(value(&ratios, "Dividend Payout Ratio").is_value());

        let ratios = cash_flows(&cash(i64::MIN, i64::MIN), i64::MAX, 12);
        assert!(approx(&ratios, "Free Cash Flow") < 0.0);
        assert!(approx(&ratios, "Cash Burn Rate") > 0.0);
    }

    #[test]
    fn zero_financing_gives_zero_coverage() {
        let ratios = cash_flows(&cash(500, 0), 0, 12);
        assert_eq!(value(&ratios, "Cash Flow Coverage Ratio"), RatioValue::Value(0.0));
    }

    #[test]
    fn zero_beginning_cash_gives_zero_margin() {
        let mut flows = cash(500, -200);
        flows.insert(BEGINNING_CASH, Some(build_entry(0, 0)));
        let ratios = cash_flows(&flows, 0, 12);
        assert_eq!(value(&ratios, "Net Cash Margin"), RatioValue::Value(0.0));
    }

    #[test]
    fn negative_ocf_gives_burn_and_runway() {
        let ratios = cash_flows(&cash(-1_200, -200), 0, 12);

        assert!((approx(&ratios, "Cash Burn Rate") - 100.0).abs() < 1e-12);
        assert!((approx(&ratios, "Cash Runway") - 12.0).abs() < 1e-12);
    }

    #[test]
    fn runway_uses_period_months() {
        let ratios = cash_flows(&cash(-1_200, -200), 0, 6);

        assert!((approx(&ratios, "Cash Burn Rate") - 200.0).abs() < 1e-12);
        assert!((approx(&ratios, "Cash Runway") - 6.0).abs() < 1e-12);
    }

    #[test]
    fn missing_ocf_makes_cash_ratios_missing() {
        let mut flows = cash(500, -200);
        flows.insert(OPERATING_CASH_FLOW, None);
        let ratios = cash_flows(&flows, 80, 12);

        assert_eq!(value(&ratios, "Free Cash Flow"), RatioValue::Missing);
        assert_eq!(value(&ratios, "Cash Burn Rate"), RatioValue::Missing);
        assert_eq!(value(&ratios, "Cash Runway"), RatioValue::Missing);
        assert!(value(&ratios, "Net Cash Margin").is_value());
    }

    #[test]
    fn compute_dispatches_by_kind() {
        let ctx = RatioContext {
            months: 12,
            ..RatioContext::default()
        };
        assert_eq!(
            compute(ReportKind::FinancialPosition, &position(), ctx).len(),
            5
        );
        assert_eq!(
            compute(ReportKind::CashFlows, &cash(1, 1), ctx).len(),
            5
        );
    }
}
