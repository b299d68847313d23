//! # Deal Extract
//!
//! Financial-statement extraction and validation pipeline for private-equity
//! deal documents (CIMs, teasers, financial statements, spreadsheets).
//!
//! ## Core Concepts
//!
//! - **Source Readers**: turn raw document bytes into classifier-ready text
//!   (embedded PDF text, workbook-to-tabular rendering, structured table
//!   extraction for complex or scanned layouts)
//! - **Classifiers**: one LLM call against a fixed instruction set, then
//!   defensive normalization into a strict schema (closed line-item
//!   vocabulary, values in millions USD, clamped confidences)
//! - **Fallback Ladder**: spreadsheet -> structured tables -> embedded text
//!   -> vision, each step attempted only when the previous is unavailable or
//!   insufficient
//! - **Upsert Persistence**: periods are keyed by (deal, statement type,
//!   period label), so re-extraction overwrites instead of duplicating
//! - **Validation**: pure accounting-identity and plausibility checks,
//!   recomputed on demand and never persisted
//!
//! ## Example
//!
//! ```rust,ignore
//! use deal_extract::*;
//! use std::sync::Arc;
//!
//! let gemini = Arc::new(GeminiClient::from_env());
//! let orchestrator = ExtractionOrchestrator::new(
//!     FinancialClassifier::new(gemini.clone()),
//!     VisionClassifier::new(gemini),
//!     Some(Arc::new(DocIntelClient::from_env())),
//!     store,
//! );
//!
//! let result = orchestrator.run_deep_pass(&payload, "deal-1", "doc-1").await?;
//! println!("stored {} periods via {:?}", result.periods_stored, result.method);
//!
//! let rows = store.periods_for_deal("deal-1").await?;
//! let validation = validate_statements(&statements_from_rows(&rows));
//! ```

pub mod error;
pub mod llm;
pub mod merge;
pub mod orchestrator;
pub mod readers;
pub mod schema;
pub mod store;
pub mod validator;

pub use error::{ExtractError, Result};
pub use llm::{
    FastPassExtractor, FinancialClassifier, GeminiClient, TextCompletion, VisionClassifier,
    VisionCompletion,
};
pub use merge::{merge_extraction, DealMerger, MergeOutcome};
pub use orchestrator::{DeepPassResult, DocumentPayload, ExtractionOrchestrator};
pub use readers::{
    read_pdf_text, read_structured_tables, read_workbook, DocIntelClient, ExtractedTable,
    TableCell, TableExtraction,
};
pub use schema::*;
pub use store::{
    statements_from_rows, DealStore, MemoryStore, NewPeriodRow, StatementStore,
};
pub use validator::{
    validate_statements, CheckSeverity, StatementCheck, StatementsValidation,
};
