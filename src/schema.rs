use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    #[schemars(description = "Profit and loss: revenue through net income for a period")]
    IncomeStatement,

    #[schemars(description = "Point-in-time snapshot of assets, liabilities and equity")]
    BalanceSheet,

    #[schemars(description = "Cash movements: operating, investing and financing activity")]
    CashFlow,
}

impl StatementType {
    pub const ALL: [StatementType; 3] = [
        StatementType::IncomeStatement,
        StatementType::BalanceSheet,
        StatementType::CashFlow,
    ];
}

/// The scale the source document declared for its numbers. Recorded for
/// audit only: classifier output is always already converted to millions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitScale {
    Millions,
    Thousands,
    Actuals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    #[schemars(description = "A completed reporting period (past fiscal year or quarter)")]
    Historical,

    #[schemars(description = "A forecast period: labels like 2025E, 2026F, 'Forecast', or future years")]
    Projected,

    #[schemars(description = "Last twelve months, a trailing aggregation distinct from a fiscal year")]
    Ltm,
}

/// Closed vocabulary of line-item keys across the three statement types.
/// The classifier prompt enumerates exactly these keys; anything else coming
/// back from the model is dropped at normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LineItem {
    // Income statement
    Revenue,
    Cogs,
    GrossProfit,
    Opex,
    Sga,
    RdExpense,
    Ebitda,
    EbitdaMarginPct,
    Da,
    Ebit,
    InterestExpense,
    Taxes,
    NetIncome,
    // Balance sheet
    Cash,
    AccountsReceivable,
    Inventory,
    TotalCurrentAssets,
    PpeNet,
    Goodwill,
    Intangibles,
    TotalAssets,
    AccountsPayable,
    TotalCurrentLiabilities,
    TotalDebt,
    TotalLiabilities,
    TotalEquity,
    // Cash flow
    OperatingCf,
    Capex,
    Fcf,
    InvestingCf,
    FinancingCf,
    Dividends,
    DebtIssued,
    DebtRepaid,
    ChangeInCash,
}

impl LineItem {
    pub const INCOME_STATEMENT: [LineItem; 13] = [
        LineItem::Revenue,
        LineItem::Cogs,
        LineItem::GrossProfit,
        LineItem::Opex,
        LineItem::Sga,
        LineItem::RdExpense,
        LineItem::Ebitda,
        LineItem::EbitdaMarginPct,
        LineItem::Da,
        LineItem::Ebit,
        LineItem::InterestExpense,
        LineItem::Taxes,
        LineItem::NetIncome,
    ];

    pub const BALANCE_SHEET: [LineItem; 13] = [
        LineItem::Cash,
        LineItem::AccountsReceivable,
        LineItem::Inventory,
        LineItem::TotalCurrentAssets,
        LineItem::PpeNet,
        LineItem::Goodwill,
        LineItem::Intangibles,
        LineItem::TotalAssets,
        LineItem::AccountsPayable,
        LineItem::TotalCurrentLiabilities,
        LineItem::TotalDebt,
        LineItem::TotalLiabilities,
        LineItem::TotalEquity,
    ];

    pub const CASH_FLOW: [LineItem; 9] = [
        LineItem::OperatingCf,
        LineItem::Capex,
        LineItem::Fcf,
        LineItem::InvestingCf,
        LineItem::FinancingCf,
        LineItem::Dividends,
        LineItem::DebtIssued,
        LineItem::DebtRepaid,
        LineItem::ChangeInCash,
    ];

    pub fn vocabulary(statement_type: StatementType) -> &'static [LineItem] {
        match statement_type {
            StatementType::IncomeStatement => &Self::INCOME_STATEMENT,
            StatementType::BalanceSheet => &Self::BALANCE_SHEET,
            StatementType::CashFlow => &Self::CASH_FLOW,
        }
    }

    pub fn statement_type(self) -> StatementType {
        if Self::INCOME_STATEMENT.contains(&self) {
            StatementType::IncomeStatement
        } else if Self::BALANCE_SHEET.contains(&self) {
            StatementType::BalanceSheet
        } else {
            StatementType::CashFlow
        }
    }

    pub fn is_valid_for(self, statement_type: StatementType) -> bool {
        self.statement_type() == statement_type
    }

    pub fn key(self) -> &'static str {
        match self {
            LineItem::Revenue => "revenue",
            LineItem::Cogs => "cogs",
            LineItem::GrossProfit => "gross_profit",
            LineItem::Opex => "opex",
            LineItem::Sga => "sga",
            LineItem::RdExpense => "rd_expense",
            LineItem::Ebitda => "ebitda",
            LineItem::EbitdaMarginPct => "ebitda_margin_pct",
            LineItem::Da => "da",
            LineItem::Ebit => "ebit",
            LineItem::InterestExpense => "interest_expense",
            LineItem::Taxes => "taxes",
            LineItem::NetIncome => "net_income",
            LineItem::Cash => "cash",
            LineItem::AccountsReceivable => "accounts_receivable",
            LineItem::Inventory => "inventory",
            LineItem::TotalCurrentAssets => "total_current_assets",
            LineItem::PpeNet => "ppe_net",
            LineItem::Goodwill => "goodwill",
            LineItem::Intangibles => "intangibles",
            LineItem::TotalAssets => "total_assets",
            LineItem::AccountsPayable => "accounts_payable",
            LineItem::TotalCurrentLiabilities => "total_current_liabilities",
            LineItem::TotalDebt => "total_debt",
            LineItem::TotalLiabilities => "total_liabilities",
            LineItem::TotalEquity => "total_equity",
            LineItem::OperatingCf => "operating_cf",
            LineItem::Capex => "capex",
            LineItem::Fcf => "fcf",
            LineItem::InvestingCf => "investing_cf",
            LineItem::FinancingCf => "financing_cf",
            LineItem::Dividends => "dividends",
            LineItem::DebtIssued => "debt_issued",
            LineItem::DebtRepaid => "debt_repaid",
            LineItem::ChangeInCash => "change_in_cash",
        }
    }

    pub fn parse(key: &str) -> Option<LineItem> {
        let all = Self::INCOME_STATEMENT
            .iter()
            .chain(Self::BALANCE_SHEET.iter())
            .chain(Self::CASH_FLOW.iter());
        for item in all {
            if item.key() == key {
                return Some(*item);
            }
        }
        None
    }
}

/// One reporting period within a classified statement. Values are in
/// millions USD; an absent key means "not found in the document", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialPeriod {
    #[schemars(
        description = "Period label exactly as the source uses it (e.g. '2022', '2025E', 'LTM'). Free text because source documents label periods inconsistently."
    )]
    pub period: String,

    pub period_type: PeriodType,

    #[schemars(description = "Line-item values in millions USD, keyed by the closed vocabulary")]
    pub line_items: BTreeMap<LineItem, f64>,

    #[schemars(description = "Classifier's self-reported certainty for this period, 0-100")]
    pub confidence: u8,
}

impl FinancialPeriod {
    pub fn value(&self, item: LineItem) -> Option<f64> {
        self.line_items.get(&item).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifiedStatement {
    pub statement_type: StatementType,

    #[schemars(
        description = "Scale declared by the source document. Values in periods are already converted to millions regardless of this field."
    )]
    pub unit_scale: UnitScale,

    #[schemars(description = "ISO-like currency code, default USD")]
    pub currency: String,

    #[schemars(description = "Periods found for this statement, unique by period label")]
    pub periods: Vec<FinancialPeriod>,
}

/// Classifier output for one document. Transient: the orchestrator decomposes
/// it into persisted period rows and this struct is never stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub statements: Vec<ClassifiedStatement>,
    pub overall_confidence: u8,
    pub warnings: Vec<String>,
}

impl ClassificationResult {
    pub fn empty_with_warning(warning: impl Into<String>) -> Self {
        Self {
            statements: Vec::new(),
            overall_confidence: 0,
            warnings: vec![warning.into()],
        }
    }
}

/// Which path of the routing ladder produced a result. Observability only;
/// has no effect on downstream logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Excel,
    Azure,
    Text,
    Vision,
}

/// Persisted shape of one (deal, statement type, period) row, exposed
/// verbatim to the route layer for client serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPeriodRow {
    pub id: String,
    pub deal_id: String,
    pub document_id: String,
    pub statement_type: StatementType,
    pub period: String,
    pub period_type: PeriodType,
    pub line_items: BTreeMap<LineItem, f64>,
    pub currency: String,
    pub unit_scale: UnitScale,
    pub confidence: u8,
    pub method: ExtractionMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One candidate value from the lighter fast-pass extraction, with the
/// model's per-field confidence and an optional source snippet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedField<T> {
    #[schemars(description = "The extracted value, or null if not explicitly found")]
    pub value: Option<T>,

    #[schemars(description = "Confidence 0-100 for this specific field")]
    pub confidence: u8,

    #[schemars(description = "Snippet of source text the value came from, if available")]
    pub source: Option<String>,
}

impl<T> ExtractedField<T> {
    pub fn absent() -> Self {
        Self {
            value: None,
            confidence: 0,
            source: None,
        }
    }
}

/// Top-line deal fields from the fast pass, consumed by the merge logic.
/// The Deal entity itself is owned by a collaborator; this pipeline only
/// computes candidate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedDealData {
    pub company_name: ExtractedField<String>,
    pub industry: ExtractedField<String>,
    pub description: ExtractedField<String>,
    #[schemars(description = "Revenue in millions USD")]
    pub revenue: ExtractedField<f64>,
    #[schemars(description = "EBITDA in millions USD")]
    pub ebitda: ExtractedField<f64>,
    pub ebitda_margin_pct: ExtractedField<f64>,
    pub revenue_growth_pct: ExtractedField<f64>,
    pub employee_count: ExtractedField<u32>,
    pub founded_year: ExtractedField<u32>,
    pub headquarters: ExtractedField<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub summary: Option<String>,
    pub overall_confidence: u8,
    pub needs_review: bool,
    #[serde(default)]
    pub review_reasons: Vec<String>,
}

/// The slice of the Deal entity the merge logic reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRecord {
    pub id: String,
    pub name: String,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub thesis: Option<String>,
    pub revenue: Option<f64>,
    pub ebitda: Option<f64>,
    pub risks: Vec<String>,
    pub highlights: Vec<String>,
    pub extraction_confidence: u8,
    pub needs_review: bool,
}
