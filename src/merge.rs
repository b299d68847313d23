//! Confidence-gated merge of fast-pass extraction results into an existing
//! deal record. Scalar fields only overwrite when the existing value is
//! absent or the new field's confidence beats the deal's stored confidence;
//! list fields merge by union and are never replaced wholesale.

use crate::error::{ExtractError, Result};
use crate::schema::{DealRecord, ExtractedDealData, ExtractedField};
use crate::store::DealStore;
use log::info;
use std::sync::Arc;

/// Overall confidence at or above which an extraction counts as confident
/// enough to clear a deal's review flag.
const REVIEW_CLEAR_CONFIDENCE: u8 = 70;

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub deal: DealRecord,
    pub updated_fields: Vec<String>,
    pub activity_entry: String,
}

fn should_overwrite<T>(existing: &Option<T>, field: &ExtractedField<T>, stored_confidence: u8) -> bool {
    field.value.is_some() && (existing.is_none() || field.confidence > stored_confidence)
}

fn merge_scalar<T: Clone>(
    existing: &mut Option<T>,
    field: &ExtractedField<T>,
    stored_confidence: u8,
    name: &str,
    updated: &mut Vec<String>,
) {
    if should_overwrite(existing, field, stored_confidence) {
        *existing = field.value.clone();
        updated.push(name.to_string());
    }
}

fn union_lists(existing: &mut Vec<String>, incoming: &[String], name: &str, updated: &mut Vec<String>) {
    let mut added = false;
    for item in incoming {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !existing.iter().any(|e| e.eq_ignore_ascii_case(trimmed)) {
            existing.push(trimmed.to_string());
            added = true;
        }
    }
    if added {
        updated.push(name.to_string());
    }
}

/// Pure field-by-field merge; the caller owns persistence.
pub fn merge_extraction(
    deal: &DealRecord,
    extraction: &ExtractedDealData,
    source_document: &str,
) -> MergeOutcome {
    let stored_confidence = deal.extraction_confidence;
    let mut deal = deal.clone();
    let mut updated = Vec::new();

    merge_scalar(
        &mut deal.revenue,
        &extraction.revenue,
        stored_confidence,
        "revenue",
        &mut updated,
    );
    merge_scalar(
        &mut deal.ebitda,
        &extraction.ebitda,
        stored_confidence,
        "ebitda",
        &mut updated,
    );
    merge_scalar(
        &mut deal.industry,
        &extraction.industry,
        stored_confidence,
        "industry",
        &mut updated,
    );
    merge_scalar(
        &mut deal.description,
        &extraction.description,
        stored_confidence,
        "description",
        &mut updated,
    );

    // The summary has no per-field confidence; gate it on the extraction's
    // overall confidence.
    let thesis_field = ExtractedField {
        value: extraction.summary.clone(),
        confidence: extraction.overall_confidence,
        source: None,
    };
    merge_scalar(
        &mut deal.thesis,
        &thesis_field,
        stored_confidence,
        "thesis",
        &mut updated,
    );

    union_lists(&mut deal.risks, &extraction.risks, "risks", &mut updated);
    union_lists(
        &mut deal.highlights,
        &extraction.highlights,
        "highlights",
        &mut updated,
    );

    deal.extraction_confidence = deal.extraction_confidence.max(extraction.overall_confidence);

    if deal.needs_review
        && !extraction.needs_review
        && extraction.overall_confidence >= REVIEW_CLEAR_CONFIDENCE
    {
        deal.needs_review = false;
        updated.push("needs_review".to_string());
    }

    let activity_entry = if updated.is_empty() {
        format!(
            "Extraction from '{}' produced no field updates (confidence gate)",
            source_document
        )
    } else {
        format!(
            "Updated {} from document '{}'",
            updated.join(", "),
            source_document
        )
    };

    MergeOutcome {
        deal,
        updated_fields: updated,
        activity_entry,
    }
}

/// Loads the deal, merges, persists, and appends one activity entry naming
/// the updated fields and the triggering document.
pub struct DealMerger {
    store: Arc<dyn DealStore>,
}

impl DealMerger {
    pub fn new(store: Arc<dyn DealStore>) -> Self {
        Self { store }
    }

    pub async fn merge_into_existing_deal(
        &self,
        deal_id: &str,
        extraction: &ExtractedDealData,
        source_document: &str,
    ) -> Result<DealRecord> {
        let deal = self
            .store
            .fetch_deal(deal_id)
            .await?
            .ok_or_else(|| ExtractError::DealNotFound(deal_id.to_string()))?;

        let outcome = merge_extraction(&deal, extraction, source_document);
        info!(
            "merging extraction from '{}' into deal {}: {} field(s) updated",
            source_document,
            deal_id,
            outcome.updated_fields.len()
        );

        self.store.update_deal(&outcome.deal).await?;
        self.store
            .append_activity(deal_id, &outcome.activity_entry)
            .await?;

        Ok(outcome.deal)
    }
}
