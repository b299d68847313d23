//! Defensive normalization of raw LLM output into the strict internal schema.
//!
//! The instruction set constrains the model's output format, but the format
//! is not contractually guaranteed. This layer coerces what it can and drops
//! what it can't, collecting a warning for every drop, so a partially
//! malformed response still yields a usable result instead of failing whole.

use crate::schema::{
    ClassificationResult, ClassifiedStatement, FinancialPeriod, LineItem, PeriodType,
    StatementType, UnitScale,
};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Deserialize)]
pub struct RawClassification {
    #[serde(default)]
    pub statements: Vec<RawStatement>,
    #[serde(default)]
    pub overall_confidence: Value,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawStatement {
    #[serde(default)]
    pub statement_type: Option<String>,
    #[serde(default)]
    pub unit_scale: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub periods: Vec<RawPeriod>,
}

#[derive(Debug, Deserialize)]
pub struct RawPeriod {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub period_type: Option<String>,
    #[serde(default)]
    pub line_items: serde_json::Map<String, Value>,
    #[serde(default)]
    pub confidence: Value,
}

/// Strips markdown fences / prose around the JSON object a model sometimes
/// wraps its answer in.
pub fn clean_json_output(raw: &str) -> String {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            return raw[start..=end].to_string();
        }
    }
    raw.trim().to_string()
}

/// Maps the many statement-type spellings models produce onto the enum.
/// Unknown spellings return None and the statement is dropped with a warning.
pub fn statement_type_from_alias(raw: &str) -> Option<StatementType> {
    let canon: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();

    match canon.as_str() {
        "INCOMESTATEMENT" | "INCOME" | "IS" | "PL" | "PNL" | "PANDL" | "PROFITANDLOSS"
        | "PROFITLOSS" | "STATEMENTOFOPERATIONS" => Some(StatementType::IncomeStatement),
        "BALANCESHEET" | "BS" | "STATEMENTOFFINANCIALPOSITION" => Some(StatementType::BalanceSheet),
        "CASHFLOW" | "CF" | "CASHFLOWSTATEMENT" | "STATEMENTOFCASHFLOWS" | "CASHFLOWS" => {
            Some(StatementType::CashFlow)
        }
        _ => None,
    }
}

/// Unrecognized scale strings default to MILLIONS: values are normalized to
/// millions by instruction, so the declared-scale audit field defaulting is
/// harmless.
pub fn unit_scale_from_alias(raw: Option<&str>) -> UnitScale {
    let canon: String = raw
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();

    match canon.as_str() {
        "THOUSANDS" | "THOUSAND" | "K" | "000S" | "USDK" => UnitScale::Thousands,
        "ACTUALS" | "ACTUAL" | "UNITS" | "ONES" => UnitScale::Actuals,
        _ => UnitScale::Millions,
    }
}

/// Unknown period-type strings default to HISTORICAL. This is a deliberate,
/// tested default: a misspelled "PROJECTED" becomes a historical period, so
/// the caller gets a warning whenever the branch fires.
pub fn period_type_from_alias(raw: Option<&str>, warnings: &mut Vec<String>) -> PeriodType {
    let Some(raw) = raw else {
        return PeriodType::Historical;
    };

    let canon: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();

    match canon.as_str() {
        "HISTORICAL" | "ACTUAL" | "ACTUALS" => PeriodType::Historical,
        "PROJECTED" | "PROJECTION" | "FORECAST" | "ESTIMATE" | "ESTIMATED" | "BUDGET" => {
            PeriodType::Projected
        }
        "LTM" | "TTM" | "LASTTWELVEMONTHS" | "TRAILINGTWELVEMONTHS" => PeriodType::Ltm,
        _ => {
            warnings.push(format!(
                "unrecognized period type '{}' defaulted to HISTORICAL",
                raw
            ));
            PeriodType::Historical
        }
    }
}

/// Coerces a JSON value to a finite number. Accepts numbers and numeric
/// strings (plain or exponent notation, with $ , % and accounting-style
/// parentheses); everything else is None, never an error. Strings carrying
/// other letters are rejected outright rather than stripped, so "1e3" stays
/// 1000 and "FY23" does not turn into 23.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(parsed) = trimmed.parse::<f64>() {
                return Some(parsed).filter(|f| f.is_finite());
            }
            if trimmed.chars().any(|c| c.is_ascii_alphabetic()) {
                return None;
            }
            let negative = trimmed.starts_with('(') && trimmed.ends_with(')');
            let cleaned: String = trimmed
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            let parsed: f64 = cleaned.parse().ok()?;
            if !parsed.is_finite() {
                return None;
            }
            Some(if negative { -parsed.abs() } else { parsed })
        }
        _ => None,
    }
}

pub fn clamp_confidence(value: &Value) -> u8 {
    coerce_number(value)
        .map(|n| n.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(0)
}

/// Core coercion step shared by the text and vision classifiers.
pub fn normalize_classification(raw: RawClassification) -> ClassificationResult {
    let mut warnings = raw.warnings;
    let mut statements = Vec::new();

    for raw_stmt in raw.statements {
        let type_label = raw_stmt.statement_type.unwrap_or_default();
        let Some(statement_type) = statement_type_from_alias(&type_label) else {
            warnings.push(format!(
                "dropped statement with unrecognized type '{}'",
                type_label
            ));
            continue;
        };

        let unit_scale = unit_scale_from_alias(raw_stmt.unit_scale.as_deref());
        let currency = raw_stmt
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "USD".to_string());

        let mut seen_labels: HashSet<String> = HashSet::new();
        let mut periods = Vec::new();

        for raw_period in raw_stmt.periods {
            let Some(label) = raw_period
                .period
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
            else {
                warnings.push(format!(
                    "dropped unlabeled period in {:?} statement",
                    statement_type
                ));
                continue;
            };

            if !seen_labels.insert(label.to_string()) {
                warnings.push(format!(
                    "dropped duplicate period '{}' in {:?} statement",
                    label, statement_type
                ));
                continue;
            }

            let period_type =
                period_type_from_alias(raw_period.period_type.as_deref(), &mut warnings);

            let mut line_items: BTreeMap<LineItem, f64> = BTreeMap::new();
            for (key, value) in &raw_period.line_items {
                let Some(item) = LineItem::parse(key) else {
                    warnings.push(format!("dropped unknown line item key '{}'", key));
                    continue;
                };
                if !item.is_valid_for(statement_type) {
                    warnings.push(format!(
                        "dropped line item '{}' not valid for {:?}",
                        key, statement_type
                    ));
                    continue;
                }
                match coerce_number(value) {
                    Some(n) => {
                        line_items.insert(item, n);
                    }
                    None => {
                        if !value.is_null() {
                            debug!(
                                "non-numeric value for '{}' in period '{}' treated as not found",
                                key, label
                            );
                        }
                        // absent: "not found", never inferred as zero
                    }
                }
            }

            periods.push(FinancialPeriod {
                period: label.to_string(),
                period_type,
                line_items,
                confidence: clamp_confidence(&raw_period.confidence),
            });
        }

        if periods.is_empty() {
            warnings.push(format!(
                "dropped {:?} statement with no valid periods",
                statement_type
            ));
            continue;
        }

        statements.push(ClassifiedStatement {
            statement_type,
            unit_scale,
            currency,
            periods,
        });
    }

    ClassificationResult {
        statements,
        overall_confidence: clamp_confidence(&raw.overall_confidence),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawClassification {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_statement_type_aliases() {
        assert_eq!(
            statement_type_from_alias("PNL"),
            Some(StatementType::IncomeStatement)
        );
        assert_eq!(
            statement_type_from_alias("P&L"),
            Some(StatementType::IncomeStatement)
        );
        assert_eq!(
            statement_type_from_alias("P_AND_L"),
            Some(StatementType::IncomeStatement)
        );
        assert_eq!(
            statement_type_from_alias("balance sheet"),
            Some(StatementType::BalanceSheet)
        );
        assert_eq!(
            statement_type_from_alias("Statement of Cash Flows"),
            Some(StatementType::CashFlow)
        );
        assert_eq!(statement_type_from_alias("equity rollforward"), None);
    }

    #[test]
    fn test_unknown_period_type_defaults_to_historical_with_warning() {
        let mut warnings = Vec::new();
        assert_eq!(
            period_type_from_alias(Some("speculative"), &mut warnings),
            PeriodType::Historical
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("speculative"));

        // Absent is the documented default, no warning
        let mut warnings = Vec::new();
        assert_eq!(
            period_type_from_alias(None, &mut warnings),
            PeriodType::Historical
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_unit_scale_defaults_to_millions() {
        assert_eq!(unit_scale_from_alias(Some("bajillions")), UnitScale::Millions);
        assert_eq!(unit_scale_from_alias(None), UnitScale::Millions);
        assert_eq!(unit_scale_from_alias(Some("000s")), UnitScale::Thousands);
        assert_eq!(unit_scale_from_alias(Some("Actual")), UnitScale::Actuals);
    }

    #[test]
    fn test_coerce_number_variants() {
        assert_eq!(coerce_number(&json!(12.5)), Some(12.5));
        assert_eq!(coerce_number(&json!("1,234.5")), Some(1234.5));
        assert_eq!(coerce_number(&json!("$120")), Some(120.0));
        assert_eq!(coerce_number(&json!("(45)")), Some(-45.0));
        assert_eq!(coerce_number(&json!("n/a")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_coerce_number_exponent_strings() {
        assert_eq!(coerce_number(&json!("1e3")), Some(1000.0));
        assert_eq!(coerce_number(&json!("-2.5E2")), Some(-250.0));
        // letters other than an exponent marker mean the string is not a
        // number, not a number with noise to strip
        assert_eq!(coerce_number(&json!("FY23")), None);
        assert_eq!(coerce_number(&json!("1.2M")), None);
    }

    #[test]
    fn test_confidence_clamping() {
        assert_eq!(clamp_confidence(&json!(150)), 100);
        assert_eq!(clamp_confidence(&json!(-20)), 0);
        assert_eq!(clamp_confidence(&json!("85")), 85);
        assert_eq!(clamp_confidence(&json!("high")), 0);
        assert_eq!(clamp_confidence(&json!(null)), 0);
    }

    #[test]
    fn test_statement_with_zero_valid_periods_is_dropped() {
        let result = normalize_classification(raw(json!({
            "statements": [{
                "statement_type": "INCOME_STATEMENT",
                "periods": [{"period": "", "line_items": {}}]
            }],
            "overall_confidence": 50
        })));

        assert!(result.statements.is_empty());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("no valid periods")));
    }

    #[test]
    fn test_invalid_keys_and_values_dropped_not_fatal() {
        let result = normalize_classification(raw(json!({
            "statements": [{
                "statement_type": "INCOME_STATEMENT",
                "unit_scale": "MM",
                "periods": [{
                    "period": "2023",
                    "period_type": "HISTORICAL",
                    "line_items": {
                        "revenue": "1,200",
                        "ebitda": null,
                        "total_assets": 500,
                        "made_up_key": 1,
                        "cogs": "not disclosed"
                    },
                    "confidence": 90
                }]
            }],
            "overall_confidence": 88
        })));

        assert_eq!(result.statements.len(), 1);
        let period = &result.statements[0].periods[0];
        assert_eq!(period.value(LineItem::Revenue), Some(1200.0));
        assert_eq!(period.value(LineItem::Ebitda), None);
        assert_eq!(period.value(LineItem::Cogs), None);
        // total_assets belongs to the balance sheet, not the income statement
        assert_eq!(period.value(LineItem::TotalAssets), None);
        assert!(result.warnings.iter().any(|w| w.contains("made_up_key")));
        assert!(result.warnings.iter().any(|w| w.contains("total_assets")));
    }

    #[test]
    fn test_duplicate_period_labels_deduped() {
        let result = normalize_classification(raw(json!({
            "statements": [{
                "statement_type": "BS",
                "periods": [
                    {"period": "2023", "line_items": {"total_assets": 100}, "confidence": 90},
                    {"period": "2023", "line_items": {"total_assets": 900}, "confidence": 10}
                ]
            }],
            "overall_confidence": 60
        })));

        let periods = &result.statements[0].periods;
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].value(LineItem::TotalAssets), Some(100.0));
        assert!(result.warnings.iter().any(|w| w.contains("duplicate")));
    }

    #[test]
    fn test_clean_json_output_strips_fences() {
        let wrapped = "```json\n{\"statements\": []}\n```";
        assert_eq!(clean_json_output(wrapped), "{\"statements\": []}");
        assert_eq!(clean_json_output("  plain  "), "plain");
    }
}
