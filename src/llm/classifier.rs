use crate::llm::client::TextCompletion;
use crate::llm::normalize::{clean_json_output, normalize_classification, RawClassification};
use crate::llm::prompts::SYSTEM_PROMPT_CLASSIFY_TEXT;
use crate::schema::ClassificationResult;
use log::{debug, warn};
use std::sync::Arc;

/// Below this the text cannot plausibly hold a statement; reject outright.
pub const MIN_CLASSIFIER_INPUT_CHARS: usize = 100;

/// Cost/latency bound on one classification call. Content beyond the bound
/// is not considered; the result carries an explicit truncation warning so
/// callers can tell incomplete extraction from a genuinely sparse document.
pub const MAX_CLASSIFIER_INPUT_CHARS: usize = 30_000;

/// Text-path classifier: one LLM call with the fixed instruction set, then
/// defensive normalization into the internal schema.
pub struct FinancialClassifier {
    client: Arc<dyn TextCompletion>,
}

impl FinancialClassifier {
    pub fn new(client: Arc<dyn TextCompletion>) -> Self {
        Self { client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Returns None on sparse input, an unconfigured client, a transport
    /// failure, or a totally unparseable response. The caller treats None as
    /// "try the next method", never as a fatal error.
    pub async fn classify(&self, text: &str) -> Option<ClassificationResult> {
        let char_count = text.chars().count();
        if char_count < MIN_CLASSIFIER_INPUT_CHARS {
            debug!(
                "classifier input too sparse ({} chars, need {})",
                char_count, MIN_CLASSIFIER_INPUT_CHARS
            );
            return None;
        }

        if !self.client.is_configured() {
            warn!("text classification requested but LLM client is not configured");
            return None;
        }

        let truncated = char_count > MAX_CLASSIFIER_INPUT_CHARS;
        let input: String = if truncated {
            text.chars().take(MAX_CLASSIFIER_INPUT_CHARS).collect()
        } else {
            text.to_string()
        };

        let raw = match self.client.complete(SYSTEM_PROMPT_CLASSIFY_TEXT, &input).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("text classification call failed: {}", e);
                return None;
            }
        };

        let cleaned = clean_json_output(&raw);
        let parsed: RawClassification = match serde_json::from_str(&cleaned) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("classifier response was not parseable JSON: {}", e);
                return None;
            }
        };

        let mut result = normalize_classification(parsed);
        if truncated {
            result.warnings.push(format!(
                "input truncated to {} characters; statements beyond that point were not considered",
                MAX_CLASSIFIER_INPUT_CHARS
            ));
        }
        Some(result)
    }
}
