//! The deep-pass orchestrator: picks a reader + classifier path per document
//! via a strictly sequential fallback ladder, then persists classified
//! periods as upserts keyed by (deal, statement type, period) so
//! re-extraction is idempotent.

use crate::error::{ExtractError, Result};
use crate::llm::{FinancialClassifier, VisionClassifier};
use crate::readers::{read_pdf_text, read_structured_tables, read_workbook, TableExtraction};
use crate::schema::{ClassificationResult, ExtractionMethod};
use crate::store::{NewPeriodRow, StatementStore};
use log::{debug, info, warn};
use std::sync::Arc;

/// Table text shorter than this is not worth a classification call; fall
/// through to plain text extraction instead.
pub const MIN_TABLE_TEXT_CHARS: usize = 50;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb"];

#[derive(Debug, Clone)]
pub struct DocumentPayload {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Declared MIME type from the upload, if any. Extension is the fallback.
    pub mime_type: Option<String>,
}

impl DocumentPayload {
    pub fn is_spreadsheet(&self) -> bool {
        if let Some(mime) = &self.mime_type {
            let mime = mime.to_lowercase();
            if mime.contains("spreadsheet") || mime.contains("ms-excel") {
                return true;
            }
        }
        let ext = self
            .filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        SPREADSHEET_EXTENSIONS.contains(&ext.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DeepPassResult {
    pub method: ExtractionMethod,
    pub statements_stored: usize,
    pub periods_stored: usize,
    pub statement_ids: Vec<String>,
    pub warnings: Vec<String>,
    pub overall_confidence: u8,
}

pub struct ExtractionOrchestrator {
    classifier: FinancialClassifier,
    vision: VisionClassifier,
    tables: Option<Arc<dyn TableExtraction>>,
    store: Arc<dyn StatementStore>,
}

impl ExtractionOrchestrator {
    pub fn new(
        classifier: FinancialClassifier,
        vision: VisionClassifier,
        tables: Option<Arc<dyn TableExtraction>>,
        store: Arc<dyn StatementStore>,
    ) -> Self {
        Self {
            classifier,
            vision,
            tables,
            store,
        }
    }

    /// Runs the routing ladder for one document and persists the outcome.
    ///
    /// A classifier that finds no statements is a valid zero-extraction
    /// result, surfaced with a warning. Only a document no ladder step could
    /// read at all is an error.
    pub async fn run_deep_pass(
        &self,
        payload: &DocumentPayload,
        deal_id: &str,
        document_id: &str,
    ) -> Result<DeepPassResult> {
        info!(
            "deep pass for document '{}' (deal {}, document {})",
            payload.filename, deal_id, document_id
        );

        // Spreadsheets get no further fallback: an unreadable workbook is a
        // user-facing error, not a reason to try vision on raw xlsx bytes.
        if payload.is_spreadsheet() {
            let Some(text) = read_workbook(&payload.bytes) else {
                return Err(ExtractError::EmptyWorkbook(payload.filename.clone()));
            };
            debug!("spreadsheet rendered to {} chars of tabular text", text.len());
            let Some(result) = self.classifier.classify(&text).await else {
                return Err(ExtractError::ClassificationFailed(format!(
                    "classifier produced no result for spreadsheet '{}'",
                    payload.filename
                )));
            };
            return self
                .persist(result, ExtractionMethod::Excel, deal_id, document_id)
                .await;
        }

        let mut had_content = false;

        // Structured table extraction, when configured, beats plain text on
        // complex layouts.
        if let Some(tables) = &self.tables {
            if let Some(table_text) = read_structured_tables(tables.as_ref(), &payload.bytes).await
            {
                if table_text.chars().count() >= MIN_TABLE_TEXT_CHARS {
                    had_content = true;
                    if let Some(result) = self.classifier.classify(&table_text).await {
                        return self
                            .persist(result, ExtractionMethod::Azure, deal_id, document_id)
                            .await;
                    }
                } else {
                    debug!(
                        "table text too short ({} chars), falling through",
                        table_text.chars().count()
                    );
                }
            }
        }

        // Embedded text layer.
        if let Some(text) = read_pdf_text(&payload.bytes) {
            had_content = true;
            if let Some(result) = self.classifier.classify(&text).await {
                return self
                    .persist(result, ExtractionMethod::Text, deal_id, document_id)
                    .await;
            }
        }

        // Last rung: multimodal classification on the raw bytes.
        if let Some(result) = self.vision.classify(&payload.bytes, &payload.filename).await {
            return self
                .persist(result, ExtractionMethod::Vision, deal_id, document_id)
                .await;
        }

        if had_content {
            Err(ExtractError::ClassificationFailed(format!(
                "document '{}' was readable but no classifier produced a result",
                payload.filename
            )))
        } else {
            Err(ExtractError::Unprocessable(payload.filename.clone()))
        }
    }

    async fn persist(
        &self,
        result: ClassificationResult,
        method: ExtractionMethod,
        deal_id: &str,
        document_id: &str,
    ) -> Result<DeepPassResult> {
        let mut warnings = result.warnings;
        if result.statements.is_empty() {
            warnings.push("no financial data found in this document".to_string());
        }

        let mut statement_ids = Vec::new();
        let mut periods_stored = 0usize;

        for statement in &result.statements {
            for period in &statement.periods {
                let row = NewPeriodRow {
                    deal_id: deal_id.to_string(),
                    document_id: document_id.to_string(),
                    statement_type: statement.statement_type,
                    period: period.period.clone(),
                    period_type: period.period_type,
                    line_items: period.line_items.clone(),
                    currency: statement.currency.clone(),
                    unit_scale: statement.unit_scale,
                    confidence: period.confidence,
                    method,
                };

                // One bad row never aborts its siblings.
                match self.store.upsert_period(row).await {
                    Ok(id) => {
                        statement_ids.push(id);
                        periods_stored += 1;
                    }
                    Err(e) => {
                        warn!(
                            "skipping period '{}' of {:?} for deal {}: {}",
                            period.period, statement.statement_type, deal_id, e
                        );
                        warnings.push(format!(
                            "failed to store period '{}' of {:?}",
                            period.period, statement.statement_type
                        ));
                    }
                }
            }
        }

        info!(
            "deep pass stored {} period(s) across {} statement(s) via {:?}",
            periods_stored,
            result.statements.len(),
            method
        );

        Ok(DeepPassResult {
            method,
            statements_stored: result.statements.len(),
            periods_stored,
            statement_ids,
            warnings,
            overall_confidence: result.overall_confidence,
        })
    }
}
