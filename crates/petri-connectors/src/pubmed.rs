//! PubMed connector via the NCBI E-utilities.
//!
//! Two-step fetch: `esearch.fcgi` (JSON) turns the query into a PMID list,
//! then `efetch.fcgi` (XML) is called per id for title and abstract. Both
//! steps go through the shared rate limiter; NCBI asks for no more than a
//! handful of unkeyed requests per second.

use crate::limiter::RateLimiter;
use crate::{Connector, ConnectorError, ConnectorResult};
use async_trait::async_trait;
use petri_core::config::PipelineConfig;
use petri_core::types::{EvidenceItem, Source};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::debug;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// Peer-reviewed abstracts rank at full relevance.
const PUBMED_SCORE: f64 = 1.0;

#[derive(Debug, Deserialize)]
struct EsearchEnvelope {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Connector for PubMed literature.
pub struct PubmedConnector {
    client: reqwest::Client,
    limiter: RateLimiter,
    timeout_secs: u64,
}

impl PubmedConnector {
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

    async fn search_ids(&self, query: &str, limit: usize) -> ConnectorResult<Vec<String>> {
        self.limiter.acquire().await;
        let response = self
            .client
            .get(ESEARCH_URL)
            .query(&[
                ("db", "pubmed"),
                ("term", query),
                ("retmax", &limit.to_string()),
                ("retmode", "json"),
            ])
            .send()
            .await
            .map_err(|e| crate::http_util::map_transport(e, self.timeout_secs))?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ConnectorError::RateLimited("pubmed esearch".to_string()));
        }
        if !status.is_success() {
            return Err(ConnectorError::Unavailable(format!(
                "pubmed esearch returned {}",
                status
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::Malformed(e.to_string()))?;
        parse_esearch_ids(&body)
    }

    async fn fetch_article(&self, pmid: &str) -> ConnectorResult<EvidenceItem> {
        self.limiter.acquire().await;
        let response = self
            .client
            .get(EFETCH_URL)
            .query(&[("db", "pubmed"), ("id", pmid), ("retmode", "xml")])
            .send()
            .await
            .map_err(|e| crate::http_util::map_transport(e, self.timeout_secs))?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ConnectorError::RateLimited("pubmed efetch".to_string()));
        }
        if !status.is_success() {
            return Err(ConnectorError::Unavailable(format!(
                "pubmed efetch returned {}",
                status
            )));
        }
        let xml = response
            .text()
            .await
            .map_err(|e| ConnectorError::Malformed(e.to_string()))?;
        let (title, abstract_text) = parse_article(&xml)?;
        let text = if abstract_text.is_empty() {
            title
        } else if title.is_empty() {
            abstract_text
        } else {
            format!("{}\n{}", title, abstract_text)
        };
        Ok(EvidenceItem::new(Source::Pubmed, pmid, text, PUBMED_SCORE)
            .with_url(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)))
    }
}

#[async_trait]
impl Connector for PubmedConnector {
    fn source(&self) -> Source {
        Source::Pubmed
    }

    async fn fetch(&self, query: &str, limit: usize) -> ConnectorResult<Vec<EvidenceItem>> {
        let ids = self.search_ids(query, limit).await?;
        let mut items = Vec::with_capacity(ids.len());
        for pmid in ids.iter().take(limit) {
            // Per-article failures drop the article, not the whole query.
            match self.fetch_article(pmid).await {
                Ok(item) => items.push(item),
                Err(e) => debug!(pmid = %pmid, error = %e, "skipping article"),
            }
        }
        debug!(count = items.len(), "pubmed articles fetched");
        Ok(items)
    }

    async fn fetch_by_id(&self, id: &str) -> ConnectorResult<EvidenceItem> {
        self.fetch_article(id).await
    }
}

fn parse_esearch_ids(body: &str) -> ConnectorResult<Vec<String>> {
    let envelope: EsearchEnvelope =
        serde_json::from_str(body).map_err(|e| ConnectorError::Malformed(e.to_string()))?;
    Ok(envelope.esearchresult.idlist)
}

/// Extract `(title, abstract)` from one efetch article payload. Multi-section
/// abstracts are joined with spaces.
fn parse_article(xml: &str) -> ConnectorResult<(String, String)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut title = String::new();
    let mut abstract_text = String::new();
    let mut in_title = false;
    let mut in_abstract = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"ArticleTitle" => in_title = true,
                b"AbstractText" => in_abstract = true,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let value = t
                    .unescape()
                    .map_err(|e| ConnectorError::Malformed(e.to_string()))?;
                if in_title {
                    push_joined(&mut title, &value);
                } else if in_abstract {
                    push_joined(&mut abstract_text, &value);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"ArticleTitle" => in_title = false,
                b"AbstractText" => in_abstract = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ConnectorError::Malformed(e.to_string())),
            _ => {}
        }
    }

    if title.is_empty() && abstract_text.is_empty() {
        return Err(ConnectorError::Malformed("no article content".to_string()));
    }
    Ok((title, abstract_text))
}

fn push_joined(out: &mut String, value: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn esearch_ids_parse_from_json() {
        let body = r#"{"esearchresult": {"idlist": ["31452104", "28445112"], "count": "2"}}"#;
        let ids = parse_esearch_ids(body).unwrap();
        assert_eq!(ids, vec!["31452104", "28445112"]);
    }

    #[test]
    fn esearch_rejects_malformed_json() {
        assert!(matches!(
            parse_esearch_ids("<html>busy</html>"),
            Err(ConnectorError::Malformed(_))
        ));
    }

    #[test]
    fn article_xml_yields_title_and_joined_abstract() {
        let xml = r#"<PubmedArticle><Article>
            <ArticleTitle>Amyloid beta aggregation in Alzheimer's disease</ArticleTitle>
            <Abstract>
              <AbstractText Label="BACKGROUND">Plaques accumulate.</AbstractText>
              <AbstractText Label="RESULTS">Aggregation accelerates.</AbstractText>
            </Abstract>
        </Article></PubmedArticle>"#;
        let (title, abstract_text) = parse_article(xml).unwrap();
        assert!(title.starts_with("Amyloid beta aggregation"));
        assert_eq!(abstract_text, "Plaques accumulate. Aggregation accelerates.");
    }

    #[test]
    fn article_without_content_is_malformed() {
        let xml = "<PubmedArticle><Article></Article></PubmedArticle>";
        assert!(matches!(
            parse_article(xml),
            Err(ConnectorError::Malformed(_))
        ));
    }
}
