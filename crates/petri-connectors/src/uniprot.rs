//! UniProt connector via the UniProtKB REST search.
//!
//! Queries return TSV with accession, protein name, gene names, and sequence.
//! A free-text query that matches nothing is retried once as a keyword query
//! scoped to reviewed human entries, which is what most biomedical questions
//! mean anyway.

use crate::limiter::RateLimiter;
use crate::{Connector, ConnectorError, ConnectorResult};
use async_trait::async_trait;
use petri_core::config::PipelineConfig;
use petri_core::text;
use petri_core::types::{EvidenceItem, Source};
use tracing::debug;

const SEARCH_URL: &str = "https://rest.uniprot.org/uniprotkb/search";
const FIELDS: &str = "accession,protein_name,gene_names,sequence";

/// Reviewed protein records rank just under literature.
const UNIPROT_SCORE: f64 = 0.9;
/// Residues of sequence carried into the passage text.
const SEQUENCE_PREVIEW: usize = 60;

/// Connector for UniProtKB protein records.
pub struct UniprotConnector {
    client: reqwest::Client,
    limiter: RateLimiter,
    timeout_secs: u64,
}

impl UniprotConnector {
    pub fn new(config: &PipelineConfig) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConnectorError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            limiter: RateLimiter::new(config.min_request_interval),
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    async fn search(&self, query: &str, limit: usize) -> ConnectorResult<Vec<EvidenceItem>> {
        self.limiter.acquire().await;
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("query", query),
                ("format", "tsv"),
                ("fields", FIELDS),
                ("size", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| crate::http_util::map_transport(e, self.timeout_secs))?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ConnectorError::RateLimited("uniprot".to_string()));
        }
        if !status.is_success() {
            return Err(ConnectorError::Unavailable(format!(
                "uniprot returned {}",
                status
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::Malformed(e.to_string()))?;
        Ok(parse_tsv(&body, limit))
    }
}

#[async_trait]
impl Connector for UniprotConnector {
    fn source(&self) -> Source {
        Source::Uniprot
    }

    async fn fetch(&self, query: &str, limit: usize) -> ConnectorResult<Vec<EvidenceItem>> {
        let items = self.search(query, limit).await?;
        if !items.is_empty() {
            return Ok(items);
        }
        // Free text missed; retry scoped to reviewed human entries.
        if let Some(keyword_query) = keywordized(query) {
            debug!(retry = %keyword_query, "uniprot keyword retry");
            return self.search(&keyword_query, limit).await;
        }
        Ok(items)
    }

    async fn fetch_by_id(&self, id: &str) -> ConnectorResult<EvidenceItem> {
        let items = self.search(&format!("accession:{}", id), 1).await?;
        items
            .into_iter()
            .next()
            .ok_or_else(|| ConnectorError::Unavailable(format!("no record for {}", id)))
    }
}

/// Rebuild a missed free-text query as
/// `(reviewed:true) AND (organism_id:9606) AND (kw1 OR kw2 ...)`.
fn keywordized(query: &str) -> Option<String> {
    let terms = text::terms(query);
    if terms.is_empty() {
        return None;
    }
    let keywords = terms
        .iter()
        .take(5)
        .map(|t| format!("({})", t))
        .collect::<Vec<_>>()
        .join(" OR ");
    Some(format!(
        "(reviewed:true) AND (organism_id:9606) AND ({})",
        keywords
    ))
}

/// Parse the TSV body: header row, then
/// `accession \t protein name \t gene names \t sequence`.
/// Rows without an accession are skipped.
fn parse_tsv(body: &str, limit: usize) -> Vec<EvidenceItem> {
    body.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            let accession = cols.first()?.trim();
            if accession.is_empty() {
                return None;
            }
            let protein = cols.get(1).map(|s| s.trim()).unwrap_or_default();
            let genes = cols.get(2).map(|s| s.trim()).unwrap_or_default();
            let sequence = cols.get(3).map(|s| s.trim()).unwrap_or_default();

            let mut passage = if protein.is_empty() {
                format!("UniProt entry {}.", accession)
            } else {
                format!("{}.", protein.trim_end_matches('.'))
            };
            if !genes.is_empty() {
                passage.push_str(&format!(" Encoded by {}.", genes));
            }
            if !sequence.is_empty() {
                let preview: String = sequence.chars().take(SEQUENCE_PREVIEW).collect();
                passage.push_str(&format!(" Sequence ({} aa): {}...", sequence.len(), preview));
            }

            Some(
                EvidenceItem::new(Source::Uniprot, accession, passage, UNIPROT_SCORE).with_url(
                    format!("https://www.uniprot.org/uniprotkb/{}/entry", accession),
                ),
            )
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Entry\tProtein names\tGene Names\tSequence\n\
        P05067\tAmyloid-beta precursor protein\tAPP AD1\tMLPGLALLLLAAWTARALEV\n\
        P10636\tMicrotubule-associated protein tau\tMAPT\t\n";

    #[test]
    fn tsv_rows_become_evidence_items() {
        let items = parse_tsv(SAMPLE, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "P05067");
        assert_eq!(items[0].score, 0.9);
        assert!(items[0].text.contains("Amyloid-beta precursor protein"));
        assert!(items[0].text.contains("Encoded by APP AD1"));
        assert!(items[0].text.contains("Sequence (20 aa)"));
        // Row without a sequence still yields a passage.
        assert!(items[1].text.contains("tau"));
        assert!(!items[1].text.contains("Sequence"));
    }

    #[test]
    fn tsv_respects_limit_and_skips_blank_rows() {
        let body = format!("{}\n\t\t\t\n", SAMPLE);
        assert_eq!(parse_tsv(&body, 10).len(), 2);
        assert_eq!(parse_tsv(&body, 1).len(), 1);
    }

    #[test]
    fn keywordized_scopes_to_reviewed_human_entries() {
        let q = keywordized("the amyloid aggregation in disease").unwrap();
        assert!(q.starts_with("(reviewed:true) AND (organism_id:9606) AND"));
        assert!(q.contains("(amyloid) OR (aggregation)"));
        assert_eq!(keywordized("the of and"), None);
    }
}
