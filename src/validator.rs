//! Rule-based validation of classified statements: accounting identities
//! within a statement, subtotal sanity on the balance sheet, and
//! plausibility trends across historical periods. Pure functions over their
//! inputs; findings are recomputed on every call and never persisted, so an
//! edit to the underlying data immediately changes the results.

use crate::schema::{ClassifiedStatement, FinancialPeriod, LineItem, PeriodType, StatementType};
use serde::{Deserialize, Serialize};

/// Relative tolerance for the arithmetic identities.
pub const RELATIVE_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckSeverity {
    Error,
    Warning,
    Info,
}

/// One validator finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementCheck {
    pub check: String,
    pub passed: bool,
    pub severity: CheckSeverity,
    pub message: String,
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementsValidation {
    pub checks: Vec<StatementCheck>,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    /// True iff no failed check has error severity. Warnings and info never
    /// block.
    pub overall_passed: bool,
}

/// `|a-b| / |b| <= tolerance`, with both-zero passing and a zero reference
/// against a nonzero value failing.
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    if a == 0.0 && b == 0.0 {
        return true;
    }
    if b == 0.0 {
        return false;
    }
    ((a - b) / b).abs() <= tolerance
}

fn check(
    key: &str,
    passed: bool,
    severity: CheckSeverity,
    message: String,
    period: Option<&str>,
) -> StatementCheck {
    StatementCheck {
        check: key.to_string(),
        passed,
        severity,
        message,
        period: period.map(str::to_string),
    }
}

pub fn validate_statements(statements: &[ClassifiedStatement]) -> StatementsValidation {
    let mut checks = Vec::new();

    for statement in statements {
        for period in &statement.periods {
            match statement.statement_type {
                StatementType::IncomeStatement => check_income_period(period, &mut checks),
                StatementType::BalanceSheet => check_balance_period(period, &mut checks),
                StatementType::CashFlow => check_cash_flow_period(period, &mut checks),
            }
        }

        if statement.statement_type == StatementType::IncomeStatement {
            check_income_trends(statement, &mut checks);
        }
    }

    let error_count = count_failed(&checks, CheckSeverity::Error);
    let warning_count = count_failed(&checks, CheckSeverity::Warning);
    let info_count = count_failed(&checks, CheckSeverity::Info);

    StatementsValidation {
        overall_passed: error_count == 0,
        error_count,
        warning_count,
        info_count,
        checks,
    }
}

fn count_failed(checks: &[StatementCheck], severity: CheckSeverity) -> usize {
    checks
        .iter()
        .filter(|c| !c.passed && c.severity == severity)
        .count()
}

fn check_income_period(period: &FinancialPeriod, checks: &mut Vec<StatementCheck>) {
    let label = period.period.as_str();
    let revenue = period.value(LineItem::Revenue);
    let ebitda = period.value(LineItem::Ebitda);

    if let (Some(revenue), Some(cogs), Some(gross_profit)) = (
        revenue,
        period.value(LineItem::Cogs),
        period.value(LineItem::GrossProfit),
    ) {
        let expected = revenue - cogs;
        let passed = within_tolerance(gross_profit, expected, RELATIVE_TOLERANCE);
        checks.push(check(
            "is_gross_profit_math",
            passed,
            CheckSeverity::Error,
            format!(
                "revenue - cogs = {:.1} vs reported gross profit {:.1}",
                expected, gross_profit
            ),
            Some(label),
        ));
    }

    if let (Some(revenue), Some(ebitda)) = (revenue, ebitda) {
        let passed = ebitda <= revenue;
        checks.push(check(
            "is_ebitda_lt_revenue",
            passed,
            CheckSeverity::Error,
            if passed {
                format!("EBITDA {:.1} within revenue {:.1}", ebitda, revenue)
            } else {
                format!(
                    "EBITDA {:.1} exceeds revenue {:.1}, likely an extraction mistake",
                    ebitda, revenue
                )
            },
            Some(label),
        ));
    }

    if let (Some(revenue), Some(ebitda), Some(reported_margin)) =
        (revenue, ebitda, period.value(LineItem::EbitdaMarginPct))
    {
        if revenue != 0.0 {
            let computed = ebitda / revenue * 100.0;
            let passed = within_tolerance(reported_margin, computed, RELATIVE_TOLERANCE);
            checks.push(check(
                "is_ebitda_margin_consistent",
                passed,
                CheckSeverity::Warning,
                format!(
                    "reported EBITDA margin {:.1}% vs computed {:.1}%",
                    reported_margin, computed
                ),
                Some(label),
            ));
        }
    }

    if let (Some(revenue), Some(ebitda)) = (revenue, ebitda) {
        if revenue != 0.0 {
            let margin = ebitda / revenue * 100.0;
            let (passed, severity, message) = if margin > 60.0 {
                (
                    false,
                    CheckSeverity::Warning,
                    format!("EBITDA margin {:.1}% is implausibly high", margin),
                )
            } else if margin < 0.0 {
                (
                    true,
                    CheckSeverity::Info,
                    format!("EBITDA margin {:.1}% (losses)", margin),
                )
            } else {
                (
                    true,
                    CheckSeverity::Info,
                    format!("EBITDA margin {:.1}% is in a normal range", margin),
                )
            };
            checks.push(check("is_ebitda_margin_band", passed, severity, message, Some(label)));
        }
    }

    if let (Some(ebitda), Some(da), Some(ebit)) =
        (ebitda, period.value(LineItem::Da), period.value(LineItem::Ebit))
    {
        let expected = ebitda - da;
        let passed = within_tolerance(ebit, expected, RELATIVE_TOLERANCE);
        checks.push(check(
            "is_ebit_math",
            passed,
            CheckSeverity::Warning,
            format!(
                "ebitda - da = {:.1} vs reported EBIT {:.1}",
                expected, ebit
            ),
            Some(label),
        ));
    }
}

fn check_balance_period(period: &FinancialPeriod, checks: &mut Vec<StatementCheck>) {
    let label = period.period.as_str();
    let total_assets = period.value(LineItem::TotalAssets);

    if let (Some(assets), Some(liabilities), Some(equity)) = (
        total_assets,
        period.value(LineItem::TotalLiabilities),
        period.value(LineItem::TotalEquity),
    ) {
        let passed = within_tolerance(liabilities + equity, assets, RELATIVE_TOLERANCE);
        checks.push(check(
            "bs_balances",
            passed,
            CheckSeverity::Error,
            format!(
                "liabilities {:.1} + equity {:.1} vs assets {:.1}",
                liabilities, equity, assets
            ),
            Some(label),
        ));
    }

    if let (Some(current), Some(total)) =
        (period.value(LineItem::TotalCurrentAssets), total_assets)
    {
        let passed = current <= total;
        checks.push(check(
            "bs_current_assets_lte_total",
            passed,
            CheckSeverity::Error,
            format!("current assets {:.1} vs total assets {:.1}", current, total),
            Some(label),
        ));
    }

    if let (Some(current), Some(total)) = (
        period.value(LineItem::TotalCurrentLiabilities),
        period.value(LineItem::TotalLiabilities),
    ) {
        let passed = current <= total;
        checks.push(check(
            "bs_current_liabilities_lte_total",
            passed,
            CheckSeverity::Error,
            format!(
                "current liabilities {:.1} vs total liabilities {:.1}",
                current, total
            ),
            Some(label),
        ));
    }
}

fn check_cash_flow_period(period: &FinancialPeriod, checks: &mut Vec<StatementCheck>) {
    if let (Some(operating_cf), Some(capex), Some(fcf)) = (
        period.value(LineItem::OperatingCf),
        period.value(LineItem::Capex),
        period.value(LineItem::Fcf),
    ) {
        // Sources report capex with inconsistent sign; normalize before
        // subtracting.
        let expected = operating_cf - capex.abs();
        let passed = within_tolerance(fcf, expected, RELATIVE_TOLERANCE);
        checks.push(check(
            "cf_fcf_math",
            passed,
            CheckSeverity::Warning,
            format!(
                "operating CF {:.1} - |capex| {:.1} = {:.1} vs reported FCF {:.1}",
                operating_cf,
                capex.abs(),
                expected,
                fcf
            ),
            Some(period.period.as_str()),
        ));
    }
}

/// First 4-digit run in the label, used to order historical periods
/// chronologically. Labels without a year sort last.
fn year_in_label(label: &str) -> Option<u32> {
    let bytes = label.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return label[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

fn check_income_trends(statement: &ClassifiedStatement, checks: &mut Vec<StatementCheck>) {
    let mut historical: Vec<&FinancialPeriod> = statement
        .periods
        .iter()
        .filter(|p| p.period_type == PeriodType::Historical)
        .collect();
    historical.sort_by(|a, b| match (year_in_label(&a.period), year_in_label(&b.period)) {
        (Some(ya), Some(yb)) => ya.cmp(&yb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.period.cmp(&b.period),
    });

    for pair in historical.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);

        if let (Some(prev_rev), Some(cur_rev)) =
            (prev.value(LineItem::Revenue), cur.value(LineItem::Revenue))
        {
            if prev_rev != 0.0 {
                let growth = (cur_rev - prev_rev) / prev_rev.abs();
                let passed = growth.abs() <= 1.0;
                checks.push(check(
                    "trend_revenue_growth",
                    passed,
                    CheckSeverity::Warning,
                    format!(
                        "revenue {} -> {}: {:+.0}% year over year",
                        prev.period,
                        cur.period,
                        growth * 100.0
                    ),
                    Some(cur.period.as_str()),
                ));
            }
        }

        let margin = |p: &FinancialPeriod| -> Option<f64> {
            let revenue = p.value(LineItem::Revenue)?;
            let ebitda = p.value(LineItem::Ebitda)?;
            if revenue == 0.0 {
                None
            } else {
                Some(ebitda / revenue * 100.0)
            }
        };
        if let (Some(prev_margin), Some(cur_margin)) = (margin(prev), margin(cur)) {
            let swing = (cur_margin - prev_margin).abs();
            let passed = swing <= 20.0;
            checks.push(check(
                "trend_margin_swing",
                passed,
                CheckSeverity::Warning,
                format!(
                    "EBITDA margin {} -> {}: {:.1}pp swing",
                    prev.period, cur.period, swing
                ),
                Some(cur.period.as_str()),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UnitScale;
    use std::collections::BTreeMap;

    fn period(label: &str, items: &[(LineItem, f64)]) -> FinancialPeriod {
        let mut line_items = BTreeMap::new();
        for (item, value) in items {
            line_items.insert(*item, *value);
        }
        FinancialPeriod {
            period: label.to_string(),
            period_type: PeriodType::Historical,
            line_items,
            confidence: 90,
        }
    }

    fn statement(
        statement_type: StatementType,
        periods: Vec<FinancialPeriod>,
    ) -> ClassifiedStatement {
        ClassifiedStatement {
            statement_type,
            unit_scale: UnitScale::Millions,
            currency: "USD".to_string(),
            periods,
        }
    }

    fn find<'a>(validation: &'a StatementsValidation, key: &str) -> &'a StatementCheck {
        validation
            .checks
            .iter()
            .find(|c| c.check == key)
            .unwrap_or_else(|| panic!("check '{}' not produced", key))
    }

    #[test]
    fn test_tolerance_definition() {
        assert!(within_tolerance(0.0, 0.0, 0.05));
        assert!(within_tolerance(100.0, 100.0, 0.05));
        assert!(within_tolerance(104.9, 100.0, 0.05));
        assert!(!within_tolerance(106.0, 100.0, 0.05));
        assert!(!within_tolerance(5.0, 0.0, 0.05));
    }

    #[test]
    fn test_balance_sheet_identity_pass_and_fail() {
        let ok = statement(
            StatementType::BalanceSheet,
            vec![period(
                "2023",
                &[
                    (LineItem::TotalAssets, 100.0),
                    (LineItem::TotalLiabilities, 60.0),
                    (LineItem::TotalEquity, 40.0),
                ],
            )],
        );
        let validation = validate_statements(&[ok]);
        assert!(find(&validation, "bs_balances").passed);
        assert!(validation.overall_passed);

        let broken = statement(
            StatementType::BalanceSheet,
            vec![period(
                "2023",
                &[
                    (LineItem::TotalAssets, 100.0),
                    (LineItem::TotalLiabilities, 60.0),
                    (LineItem::TotalEquity, 30.0),
                ],
            )],
        );
        let validation = validate_statements(&[broken]);
        let check = find(&validation, "bs_balances");
        assert!(!check.passed);
        assert_eq!(check.severity, CheckSeverity::Error);
        assert!(!validation.overall_passed);
        assert_eq!(validation.error_count, 1);
    }

    #[test]
    fn test_subtotal_may_never_exceed_total() {
        let broken = statement(
            StatementType::BalanceSheet,
            vec![period(
                "2023",
                &[
                    (LineItem::TotalCurrentAssets, 120.0),
                    (LineItem::TotalAssets, 100.0),
                ],
            )],
        );
        let validation = validate_statements(&[broken]);
        let check = find(&validation, "bs_current_assets_lte_total");
        assert!(!check.passed);
        assert_eq!(check.severity, CheckSeverity::Error);
    }

    #[test]
    fn test_ebitda_exceeding_revenue_is_error() {
        let broken = statement(
            StatementType::IncomeStatement,
            vec![period(
                "2023",
                &[(LineItem::Revenue, 10.0), (LineItem::Ebitda, 15.0)],
            )],
        );
        let validation = validate_statements(&[broken]);
        let check = find(&validation, "is_ebitda_lt_revenue");
        assert!(!check.passed);
        assert_eq!(check.severity, CheckSeverity::Error);
        assert!(!validation.overall_passed);
    }

    #[test]
    fn test_gross_profit_math_tolerance() {
        let ok = statement(
            StatementType::IncomeStatement,
            vec![period(
                "2023",
                &[
                    (LineItem::Revenue, 100.0),
                    (LineItem::Cogs, 60.0),
                    (LineItem::GrossProfit, 40.0),
                ],
            )],
        );
        assert!(find(&validate_statements(&[ok]), "is_gross_profit_math").passed);

        // 55 vs expected 40 is a 37% deviation
        let broken = statement(
            StatementType::IncomeStatement,
            vec![period(
                "2023",
                &[
                    (LineItem::Revenue, 100.0),
                    (LineItem::Cogs, 60.0),
                    (LineItem::GrossProfit, 55.0),
                ],
            )],
        );
        let validation = validate_statements(&[broken]);
        assert!(!find(&validation, "is_gross_profit_math").passed);
    }

    #[test]
    fn test_margin_banding() {
        let high = statement(
            StatementType::IncomeStatement,
            vec![period(
                "2023",
                &[(LineItem::Revenue, 100.0), (LineItem::Ebitda, 70.0)],
            )],
        );
        let validation = validate_statements(&[high]);
        let band = find(&validation, "is_ebitda_margin_band");
        assert!(!band.passed);
        assert_eq!(band.severity, CheckSeverity::Warning);
        // warnings never block
        assert!(validation.overall_passed);

        let losses = statement(
            StatementType::IncomeStatement,
            vec![period(
                "2023",
                &[(LineItem::Revenue, 100.0), (LineItem::Ebitda, -10.0)],
            )],
        );
        let validation = validate_statements(&[losses]);
        let band = find(&validation, "is_ebitda_margin_band");
        assert!(band.passed);
        assert_eq!(band.severity, CheckSeverity::Info);
        assert!(band.message.contains("losses"));
    }

    #[test]
    fn test_fcf_math_normalizes_capex_sign() {
        for capex in [-20.0, 20.0] {
            let ok = statement(
                StatementType::CashFlow,
                vec![period(
                    "2023",
                    &[
                        (LineItem::OperatingCf, 50.0),
                        (LineItem::Capex, capex),
                        (LineItem::Fcf, 30.0),
                    ],
                )],
            );
            assert!(
                find(&validate_statements(&[ok]), "cf_fcf_math").passed,
                "capex sign {} should validate identically",
                capex
            );
        }
    }

    #[test]
    fn test_cross_period_trends() {
        let mut projected = period("2025E", &[(LineItem::Revenue, 900.0)]);
        projected.period_type = PeriodType::Projected;

        let stmt = statement(
            StatementType::IncomeStatement,
            vec![
                // deliberately out of order; sorting is by year in label
                period(
                    "2023",
                    &[(LineItem::Revenue, 250.0), (LineItem::Ebitda, 100.0)],
                ),
                period(
                    "2022",
                    &[(LineItem::Revenue, 100.0), (LineItem::Ebitda, 10.0)],
                ),
                projected,
            ],
        );
        let validation = validate_statements(&[stmt]);

        // 100 -> 250 is +150% growth
        let growth = find(&validation, "trend_revenue_growth");
        assert!(!growth.passed);
        assert_eq!(growth.period.as_deref(), Some("2023"));

        // margin 10% -> 40% is a 30pp swing
        let swing = find(&validation, "trend_margin_swing");
        assert!(!swing.passed);

        // projected periods play no part in trend checks: only one pair
        assert_eq!(
            validation
                .checks
                .iter()
                .filter(|c| c.check == "trend_revenue_growth")
                .count(),
            1
        );
    }

    #[test]
    fn test_missing_inputs_emit_no_checks() {
        let sparse = statement(
            StatementType::IncomeStatement,
            vec![period("2023", &[(LineItem::Revenue, 100.0)])],
        );
        let validation = validate_statements(&[sparse]);
        assert!(validation.checks.is_empty());
        assert!(validation.overall_passed);
    }
}
