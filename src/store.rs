//! Datastore seams. The relational store itself is an external collaborator;
//! these traits capture the slice of its contract this pipeline relies on,
//! chiefly `upsert` keyed by (deal, statement type, period) with
//! at-most-one-row-per-key semantics. `MemoryStore` is the reference
//! implementation of those semantics, used by the test suite.

use crate::error::{ExtractError, Result};
use crate::schema::{
    ClassifiedStatement, DealRecord, ExtractionMethod, FinancialPeriod, LineItem, PeriodType,
    StatementType, StoredPeriodRow, UnitScale,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Everything the orchestrator knows about a period row; ids and timestamps
/// are the store's business.
#[derive(Debug, Clone)]
pub struct NewPeriodRow {
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
}

#[async_trait]
pub trait StatementStore: Send + Sync {
    /// Insert-or-update keyed by (deal_id, statement_type, period); returns
    /// the row id. Re-extraction overwrites the matching row, never
    /// duplicates it.
    async fn upsert_period(&self, row: NewPeriodRow) -> Result<String>;

    async fn periods_for_deal(&self, deal_id: &str) -> Result<Vec<StoredPeriodRow>>;
}

#[async_trait]
pub trait DealStore: Send + Sync {
    async fn fetch_deal(&self, deal_id: &str) -> Result<Option<DealRecord>>;

    async fn update_deal(&self, deal: &DealRecord) -> Result<()>;

    async fn append_activity(&self, deal_id: &str, entry: &str) -> Result<()>;
}

/// Regroups persisted rows into classified statements so the validator can
/// run against current data. One statement per type per deal; currency and
/// scale come from the first row seen for that type.
pub fn statements_from_rows(rows: &[StoredPeriodRow]) -> Vec<ClassifiedStatement> {
    let mut by_type: BTreeMap<StatementType, ClassifiedStatement> = BTreeMap::new();

    for row in rows {
        let statement = by_type
            .entry(row.statement_type)
            .or_insert_with(|| ClassifiedStatement {
                statement_type: row.statement_type,
                unit_scale: row.unit_scale,
                currency: row.currency.clone(),
                periods: Vec::new(),
            });
        statement.periods.push(FinancialPeriod {
            period: row.period.clone(),
            period_type: row.period_type,
            line_items: row.line_items.clone(),
            confidence: row.confidence,
        });
    }

    by_type.into_values().collect()
}

#[derive(Default)]
pub struct MemoryStore {
    periods: Mutex<HashMap<(String, StatementType, String), StoredPeriodRow>>,
    deals: Mutex<HashMap<String, DealRecord>>,
    activity: Mutex<Vec<(String, String)>>,
    /// Period labels whose upserts should fail, for partial-failure tests.
    failing_periods: Mutex<HashSet<String>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_deal(&self, deal: DealRecord) {
        self.deals.lock().await.insert(deal.id.clone(), deal);
    }

    pub async fn fail_upserts_for_period(&self, period: &str) {
        self.failing_periods.lock().await.insert(period.to_string());
    }

    pub async fn activity_for_deal(&self, deal_id: &str) -> Vec<String> {
        self.activity
            .lock()
            .await
            .iter()
            .filter(|(id, _)| id == deal_id)
            .map(|(_, entry)| entry.clone())
            .collect()
    }
}

#[async_trait]
impl StatementStore for MemoryStore {
    async fn upsert_period(&self, row: NewPeriodRow) -> Result<String> {
        if self.failing_periods.lock().await.contains(&row.period) {
            return Err(ExtractError::Store(format!(
                "injected failure for period '{}'",
                row.period
            )));
        }

        let key = (
            row.deal_id.clone(),
            row.statement_type,
            row.period.clone(),
        );
        let now = Utc::now();
        let mut periods = self.periods.lock().await;

        let (id, created_at) = match periods.get(&key) {
            Some(existing) => (existing.id.clone(), existing.created_at),
            None => {
                let n = self.next_id.fetch_add(1, Ordering::Relaxed);
                (format!("fp-{}", n + 1), now)
            }
        };

        periods.insert(
            key,
            StoredPeriodRow {
                id: id.clone(),
                deal_id: row.deal_id,
                document_id: row.document_id,
                statement_type: row.statement_type,
                period: row.period,
                period_type: row.period_type,
                line_items: row.line_items,
                currency: row.currency,
                unit_scale: row.unit_scale,
                confidence: row.confidence,
                method: row.method,
                created_at,
                updated_at: now,
            },
        );

        Ok(id)
    }

    async fn periods_for_deal(&self, deal_id: &str) -> Result<Vec<StoredPeriodRow>> {
        let periods = self.periods.lock().await;
        let mut rows: Vec<StoredPeriodRow> = periods
            .values()
            .filter(|row| row.deal_id == deal_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.statement_type, &a.period).cmp(&(b.statement_type, &b.period))
        });
        Ok(rows)
    }
}

#[async_trait]
impl DealStore for MemoryStore {
    async fn fetch_deal(&self, deal_id: &str) -> Result<Option<DealRecord>> {
        Ok(self.deals.lock().await.get(deal_id).cloned())
    }

    async fn update_deal(&self, deal: &DealRecord) -> Result<()> {
        self.deals
            .lock()
            .await
            .insert(deal.id.clone(), deal.clone());
        Ok(())
    }

    async fn append_activity(&self, deal_id: &str, entry: &str) -> Result<()> {
        self.activity
            .lock()
            .await
            .push((deal_id.to_string(), entry.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(deal: &str, statement_type: StatementType, period: &str, revenue: f64) -> NewPeriodRow {
        let mut line_items = BTreeMap::new();
        line_items.insert(LineItem::Revenue, revenue);
        NewPeriodRow {
            deal_id: deal.to_string(),
            document_id: "doc-1".to_string(),
            statement_type,
            period: period.to_string(),
            period_type: PeriodType::Historical,
            line_items,
            currency: "USD".to_string(),
            unit_scale: UnitScale::Millions,
            confidence: 90,
            method: ExtractionMethod::Text,
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_key() {
        let store = MemoryStore::new();

        let id1 = store
            .upsert_period(row("deal-1", StatementType::IncomeStatement, "2023", 100.0))
            .await
            .unwrap();
        let id2 = store
            .upsert_period(row("deal-1", StatementType::IncomeStatement, "2023", 110.0))
            .await
            .unwrap();

        assert_eq!(id1, id2);
        let rows = store.periods_for_deal("deal-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line_items.get(&LineItem::Revenue), Some(&110.0));
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_collide() {
        let store = MemoryStore::new();
        store
            .upsert_period(row("deal-1", StatementType::IncomeStatement, "2023", 100.0))
            .await
            .unwrap();
        store
            .upsert_period(row("deal-1", StatementType::BalanceSheet, "2023", 1.0))
            .await
            .unwrap();
        store
            .upsert_period(row("deal-1", StatementType::IncomeStatement, "2022", 90.0))
            .await
            .unwrap();
        store
            .upsert_period(row("deal-2", StatementType::IncomeStatement, "2023", 50.0))
            .await
            .unwrap();

        assert_eq!(store.periods_for_deal("deal-1").await.unwrap().len(), 3);
        assert_eq!(store.periods_for_deal("deal-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_statements_from_rows_groups_by_type() {
        let store = MemoryStore::new();
        store
            .upsert_period(row("deal-1", StatementType::IncomeStatement, "2022", 90.0))
            .await
            .unwrap();
        store
            .upsert_period(row("deal-1", StatementType::IncomeStatement, "2023", 100.0))
            .await
            .unwrap();
        store
            .upsert_period(row("deal-1", StatementType::CashFlow, "2023", 1.0))
            .await
            .unwrap();

        let rows = store.periods_for_deal("deal-1").await.unwrap();
        let statements = statements_from_rows(&rows);
        assert_eq!(statements.len(), 2);
        let income = statements
            .iter()
            .find(|s| s.statement_type == StatementType::IncomeStatement)
            .unwrap();
        assert_eq!(income.periods.len(), 2);
    }
}
