use crate::llm::client::VisionCompletion;
use crate::llm::normalize::{clean_json_output, normalize_classification, RawClassification};
use crate::llm::prompts::SYSTEM_PROMPT_CLASSIFY_VISION;
use crate::schema::ClassificationResult;
use log::{debug, warn};
use std::sync::Arc;

/// Fallback classifier for scanned/image-only documents: same output
/// contract as the text path, but the multimodal capability reads the raw
/// bytes. Used only when plain-text extraction comes up short.
pub struct VisionClassifier {
    client: Arc<dyn VisionCompletion>,
}

impl VisionClassifier {
    pub fn new(client: Arc<dyn VisionCompletion>) -> Self {
        Self { client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    pub async fn classify(&self, file_bytes: &[u8], filename: &str) -> Option<ClassificationResult> {
        if file_bytes.is_empty() {
            debug!("vision classification skipped: empty document buffer");
            return None;
        }

        if !self.client.is_configured() {
            warn!("vision classification requested but multimodal client is not configured");
            return None;
        }

        let raw = match self
            .client
            .complete_with_document(
                SYSTEM_PROMPT_CLASSIFY_VISION,
                file_bytes,
                filename,
                "Extract every financial statement from this document.",
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("vision classification call failed for '{}': {}", filename, e);
                return None;
            }
        };

        let cleaned = clean_json_output(&raw);
        let parsed: RawClassification = match serde_json::from_str(&cleaned) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("vision classifier response was not parseable JSON: {}", e);
                return None;
            }
        };

        Some(normalize_classification(parsed))
    }
}
