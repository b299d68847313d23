use crate::error::{ExtractError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const ANALYZE_API_VERSION: &str = "2024-02-29-preview";
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// One detected table cell. Spans default to 1 when the provider omits them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub row_index: usize,
    pub column_index: usize,
    #[serde(default = "default_span")]
    pub row_span: usize,
    #[serde(default = "default_span")]
    pub column_span: usize,
    #[serde(default)]
    pub content: String,
}

fn default_span() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTable {
    pub row_count: usize,
    pub column_count: usize,
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

/// Structured-table extraction capability for complex or scanned layouts.
#[async_trait]
pub trait TableExtraction: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn extract_tables(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedTable>>;
}

/// Azure Document Intelligence layout client: submit the PDF, then poll the
/// returned operation until the provider reports completion. The provider's
/// own timeout is the only ceiling on the poll loop.
#[derive(Clone)]
pub struct DocIntelClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeStatus {
    status: String,
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    #[serde(default)]
    tables: Vec<ExtractedTable>,
}

impl DocIntelClient {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Reads `DOCINTEL_ENDPOINT` / `DOCINTEL_API_KEY`; missing values yield an
    /// unconfigured client so the ladder skips this step.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("DOCINTEL_ENDPOINT").unwrap_or_default(),
            std::env::var("DOCINTEL_API_KEY").unwrap_or_default(),
        )
    }
}

#[async_trait]
impl TableExtraction for DocIntelClient {
    fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.api_key.is_empty()
    }

    async fn extract_tables(&self, pdf_bytes: &[u8]) -> Result<Vec<ExtractedTable>> {
        if !self.is_configured() {
            return Err(ExtractError::NotConfigured {
                capability: "table extraction",
            });
        }

        let url = format!(
            "{}/documentintelligence/documentModels/prebuilt-layout:analyze?api-version={}",
            self.endpoint, ANALYZE_API_VERSION
        );

        let res = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/pdf")
            .body(pdf_bytes.to_vec())
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(ExtractError::ClassificationFailed(format!(
                "table analysis submit failed (status {}): {}",
                status, err_text
            )));
        }

        let operation_url = res
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ExtractError::ClassificationFailed(
                    "analysis response missing operation-location".to_string(),
                )
            })?;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let poll = self
                .client
                .get(&operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .send()
                .await?;
            let body: AnalyzeStatus = poll.json().await?;

            match body.status.as_str() {
                "succeeded" => {
                    return Ok(body.analyze_result.map(|r| r.tables).unwrap_or_default());
                }
                "failed" => {
                    return Err(ExtractError::ClassificationFailed(
                        "provider failed to analyze the document".to_string(),
                    ));
                }
                other => debug!("table analysis still running (status '{}')", other),
            }
        }
    }
}

/// Runs the capability and renders its tables to delimited text. Any failure
/// (unconfigured, transport, zero tables, all-empty tables) is None so the
/// orchestrator falls through to the next ladder step.
pub async fn read_structured_tables(
    client: &dyn TableExtraction,
    pdf_bytes: &[u8],
) -> Option<String> {
    if !client.is_configured() {
        debug!("structured table extraction skipped: not configured");
        return None;
    }

    let tables = match client.extract_tables(pdf_bytes).await {
        Ok(tables) => tables,
        Err(e) => {
            warn!("structured table extraction failed: {}", e);
            return None;
        }
    };

    if tables.is_empty() {
        debug!("structured table extraction found zero tables");
        return None;
    }

    render_tables(&tables)
}

/// Renders detected tables as tab-delimited text blocks. Spanned cells
/// replicate their content into every covered grid position so a downstream
/// text classifier can still align period columns.
pub fn render_tables(tables: &[ExtractedTable]) -> Option<String> {
    let mut blocks = Vec::new();

    for (index, table) in tables.iter().enumerate() {
        if table.row_count == 0 || table.column_count == 0 {
            continue;
        }

        let mut grid = vec![vec![String::new(); table.column_count]; table.row_count];
        for cell in &table.cells {
            let content = cell.content.trim();
            for r in cell.row_index..(cell.row_index + cell.row_span).min(table.row_count) {
                for c in
                    cell.column_index..(cell.column_index + cell.column_span).min(table.column_count)
                {
                    grid[r][c] = content.to_string();
                }
            }
        }

        let lines: Vec<String> = grid.iter().map(|row| row.join("\t")).collect();
        let body = lines.join("\n");
        if body.replace(['\t', '\n'], "").trim().is_empty() {
            continue;
        }

        blocks.push(format!("[Table {}]\n{}", index + 1, body));
    }

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}
