use crate::llm::client::TextCompletion;
use crate::llm::normalize::{clamp_confidence, clean_json_output};
use crate::llm::prompts::SYSTEM_PROMPT_FAST_PASS;
use crate::schema::ExtractedDealData;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

/// The light extraction path: one call pulling top-line deal fields rather
/// than full three-statement data. Its output feeds the merge logic.
pub struct FastPassExtractor {
    client: Arc<dyn TextCompletion>,
}

impl FastPassExtractor {
    pub fn new(client: Arc<dyn TextCompletion>) -> Self {
        Self { client }
    }

    pub async fn extract(&self, text: &str) -> Option<ExtractedDealData> {
        if text.trim().is_empty() {
            debug!("fast pass skipped: empty text");
            return None;
        }
        if !self.client.is_configured() {
            warn!("fast pass requested but LLM client is not configured");
            return None;
        }

        let raw = match self.client.complete(SYSTEM_PROMPT_FAST_PASS, text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("fast pass call failed: {}", e);
                return None;
            }
        };

        let cleaned = clean_json_output(&raw);
        let mut value: Value = match serde_json::from_str(&cleaned) {
            Ok(value) => value,
            Err(e) => {
                warn!("fast pass response was not parseable JSON: {}", e);
                return None;
            }
        };

        clamp_confidence_fields(&mut value);

        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("fast pass response did not match the expected shape: {}", e);
                None
            }
        }
    }
}

/// Clamps every `confidence`/`overall_confidence` field in the tree to
/// [0,100] before strict deserialization, so an out-of-range or string
/// confidence degrades instead of failing the whole extraction.
fn clamp_confidence_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if key == "confidence" || key == "overall_confidence" {
                    *entry = Value::from(clamp_confidence(entry));
                } else {
                    clamp_confidence_fields(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                clamp_confidence_fields(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct ScriptedClient(String);

    #[async_trait]
    impl TextCompletion for ScriptedClient {
        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn response() -> String {
        json!({
            "company_name": {"value": "Acme Industrial", "confidence": 95, "source": null},
            "industry": {"value": "Manufacturing", "confidence": 88, "source": null},
            "description": {"value": null, "confidence": 0, "source": null},
            "revenue": {"value": 120.0, "confidence": 140, "source": "Revenue of $120m"},
            "ebitda": {"value": 30.0, "confidence": "85", "source": null},
            "ebitda_margin_pct": {"value": 25.0, "confidence": 80, "source": null},
            "revenue_growth_pct": {"value": null, "confidence": 0, "source": null},
            "employee_count": {"value": 450, "confidence": 70, "source": null},
            "founded_year": {"value": 1987, "confidence": 90, "source": null},
            "headquarters": {"value": "Columbus, OH", "confidence": 75, "source": null},
            "risks": ["Customer concentration"],
            "highlights": ["Recurring revenue"],
            "summary": "Industrial components maker.",
            "overall_confidence": 82,
            "needs_review": false,
            "review_reasons": []
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_extracts_and_clamps_confidences() {
        let extractor = FastPassExtractor::new(Arc::new(ScriptedClient(response())));
        let data = extractor.extract("CIM text about Acme Industrial").await.unwrap();

        assert_eq!(data.company_name.value.as_deref(), Some("Acme Industrial"));
        // 140 clamped, "85" coerced
        assert_eq!(data.revenue.confidence, 100);
        assert_eq!(data.ebitda.confidence, 85);
        assert_eq!(data.overall_confidence, 82);
        assert!(!data.needs_review);
    }

    #[tokio::test]
    async fn test_garbage_is_none() {
        let extractor = FastPassExtractor::new(Arc::new(ScriptedClient("not json".to_string())));
        assert!(extractor.extract("some text").await.is_none());
        let extractor = FastPassExtractor::new(Arc::new(ScriptedClient(response())));
        assert!(extractor.extract("   ").await.is_none());
    }
}
