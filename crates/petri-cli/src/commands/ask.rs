//! Run the pipeline for one query.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use indicatif::ProgressBar;
use petri::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Compiled-in corpus for offline runs; one JSON document per line.
const OFFLINE_CORPUS: &str = include_str!("../../data/corpus.jsonl");

pub async fn run(
    query: &str,
    limit: Option<usize>,
    offline: bool,
    sources: Option<&str>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let mut config = PipelineConfig::from_env();
    if let Some(k) = limit {
        config = config.with_retrieval_k(k);
    }

    let filter = sources.map(parse_sources).transpose()?;

    let retriever = if offline {
        offline_retriever(&config).await?
    } else {
        live_retriever(&config)?
    };

    let mut coordinator = Coordinator::new(config, retriever);
    if let Some(only) = filter {
        coordinator = coordinator.with_source_filter(only);
    }

    let spinner = (!json).then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_message("querying sources...");
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    });

    let outcome = coordinator.run_pipeline(query).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = outcome.with_context(|| format!("no hypothesis for: {query}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result(query, &result, verbose);
    Ok(())
}

/// Comma-separated source names into a retrieval filter.
fn parse_sources(raw: &str) -> Result<Vec<Source>> {
    let mut sources = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        sources.push(part.parse::<Source>()?);
    }
    if sources.is_empty() {
        bail!("No sources named in filter: {raw}");
    }
    Ok(sources)
}

fn live_retriever(config: &PipelineConfig) -> Result<Retriever> {
    if !cfg!(feature = "http") {
        bail!(
            "Live connectors are not compiled in. Rebuild with {} or run with {}.",
            "--features http".cyan(),
            "--offline".cyan()
        );
    }
    let registry = SourceRegistry::from_config(config).context("building live connectors")?;
    if registry.is_empty() {
        bail!(
            "Every source is disabled. Enable one, e.g. {}.",
            "PETRI_ENABLE_PUBMED=true".cyan()
        );
    }
    Ok(Retriever::new(config.clone(), registry))
}

/// Mock connectors over the bundled corpus, with the whole corpus behind the
/// vector fallback. DrugBank keeps its keyless record mode.
async fn offline_retriever(config: &PipelineConfig) -> Result<Retriever> {
    let corpus = Arc::new(JsonlCorpus::parse(OFFLINE_CORPUS).context("bundled corpus")?);
    let (pubmed_docs, uniprot_docs) = partition(&corpus);

    let mut registry = SourceRegistry::new();
    if config.is_enabled(Source::Pubmed) {
        let mut mock = MockConnector::new(Source::Pubmed);
        for doc in pubmed_docs {
            mock = mock.with_item(corpus_item(Source::Pubmed, &doc, 1.0));
        }
        registry = registry.with_connector(Arc::new(mock));
    }
    if config.is_enabled(Source::Uniprot) {
        let mut mock = MockConnector::new(Source::Uniprot);
        for doc in uniprot_docs {
            mock = mock.with_item(corpus_item(Source::Uniprot, &doc, 0.9));
        }
        registry = registry.with_connector(Arc::new(mock));
    }
    if config.is_enabled(Source::Drugbank) {
        let connector = DrugbankConnector::from_env(config).context("drugbank connector")?;
        registry = registry.with_connector(Arc::new(connector));
    }

    let embedder = Arc::new(HashEmbedder::default_dimension());
    let index = Arc::new(
        VectorIndex::build_from_corpus(embedder.as_ref(), corpus.as_ref())
            .await
            .context("indexing bundled corpus")?,
    );

    Ok(Retriever::new(config.clone(), registry).with_fallback(embedder, index, corpus))
}

/// Split the bundled corpus by id shape: purely numeric ids are PubMed
/// records, accession-shaped ids are UniProt records, everything else is
/// served only through the fallback.
fn partition(corpus: &JsonlCorpus) -> (Vec<CorpusDocument>, Vec<CorpusDocument>) {
    let mut pubmed = Vec::new();
    let mut uniprot = Vec::new();
    for doc in corpus.all() {
        if doc.id.chars().all(|c| c.is_ascii_digit()) {
            pubmed.push(doc);
        } else if accession_like(&doc.id) {
            uniprot.push(doc);
        }
    }
    (pubmed, uniprot)
}

fn accession_like(id: &str) -> bool {
    matches!(id.chars().next(), Some('P') | Some('Q') | Some('O'))
        && id.len() >= 6
        && id.chars().all(|c| c.is_ascii_alphanumeric())
        && id.chars().any(|c| c.is_ascii_digit())
}

fn corpus_item(source: Source, doc: &CorpusDocument, score: f64) -> EvidenceItem {
    let mut item = EvidenceItem::new(source, doc.id.clone(), doc.text.clone(), score);
    if let Some(url) = &doc.url {
        item = item.with_url(url.clone());
    }
    item
}

fn print_result(query: &str, result: &HypothesisResult, verbose: bool) {
    println!("{} Hypothesis for {}:", "→".blue(), query.cyan().bold());
    println!();
    println!("{}", result.text);
    println!();

    let c = &result.confidence;
    println!("{}", "Confidence".blue().bold());
    println!(
        "  Overall:      {}",
        format!("{:.2}%", c.overall_percentage).cyan().bold()
    );
    println!("  Evidence:     {:.3}  (weight 40%)", c.evidence);
    println!("  Consistency:  {:.3}  (weight 35%)", c.consistency);
    println!("  Novelty:      {:.3}  (weight 25%)", c.novelty);
    println!();

    if result.citations.is_empty() {
        println!("{} No citations resolved", "•".yellow());
    } else {
        println!("{}", "Citations".blue().bold());
        for (id, item) in &result.citations {
            println!(
                "  {} {}  {}",
                format!("[{}]", id).blue(),
                item.source.to_string().cyan(),
                snippet(&item.text, 72).dimmed()
            );
            if let Some(url) = &item.url {
                println!("      {}", url.dimmed());
            }
        }
    }

    if !result.warnings.is_empty() {
        println!();
        println!("{}", "Warnings".yellow().bold());
        for warning in &result.warnings {
            println!("  {} {}", "•".yellow(), warning);
        }
    }

    if verbose {
        let d = &result.diagnostics;
        println!();
        println!("{}", "Diagnostics".blue().bold());
        println!(
            "  Phases:   retrieval {} ms, analysis {} ms, synthesis {} ms, scoring {} ms",
            d.retrieval_ms, d.analysis_ms, d.synthesis_ms, d.scoring_ms
        );
        println!(
            "  Sources:  {} queried, {} failed",
            d.sources_queried, d.sources_failed
        );
        println!("  Cache:    {} hits, {} misses", d.cache_hits, d.cache_misses);
    }

    println!();
    println!(
        "{} {} citations, confidence {}",
        "✓".green(),
        result.citations.len().to_string().cyan(),
        format!("{:.2}%", c.overall_percentage).cyan()
    );
}

fn snippet(text: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for (i, ch) in text.chars().enumerate() {
        if i >= max_chars {
            out.push_str("...");
            break;
        }
        out.push(if ch == '\n' { ' ' } else { ch });
    }
    out
}
