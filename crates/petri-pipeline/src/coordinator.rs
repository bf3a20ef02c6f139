//! The pipeline coordinator.
//!
//! One [`Coordinator`] owns the retriever, the agent set, the synthesizer,
//! and the evaluator; `run_pipeline` drives a query through the fixed state
//! path and returns one [`HypothesisResult`]. The coordinator keeps no
//! mutable state between runs; only the cache and the rate limiters inside
//! the retriever persist across invocations, so concurrent runs do not
//! interfere.

use futures::future::join_all;
use petri_agents::{
    default_agents, AgentError, ContextSelector, DomainAgent, HypothesisSynthesizer,
    SynthesisOutput,
};
use petri_core::config::PipelineConfig;
use petri_core::types::{
    DomainFinding, EvidenceItem, HypothesisResult, PipelineDiagnostics, RetrievalResult, RunId,
    Source,
};
use petri_model::{Generator, TemplateGenerator};
use petri_retrieval::{merge_ranked, Retriever};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::confidence::ConfidenceEvaluator;
use crate::{PipelineError, PipelineResult};

/// Pipeline phases, in transition order. `Failed` is terminal for fatal
/// errors; degraded retrieval is not fatal and stays on the main path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Retrieving,
    Analyzing,
    Synthesizing,
    Scoring,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Retrieving => "retrieving",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Synthesizing => "synthesizing",
            PipelineState::Scoring => "scoring",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state path one run took.
#[derive(Debug, Clone, Default)]
pub struct RunTrace {
    path: Vec<PipelineState>,
}

impl RunTrace {
    fn enter(&mut self, state: PipelineState) {
        debug!(state = %state, "pipeline state");
        self.path.push(state);
    }

    /// Every state entered, in order.
    pub fn path(&self) -> &[PipelineState] {
        &self.path
    }

    /// The state the run ended in; `Idle` before any transition.
    pub fn current(&self) -> PipelineState {
        self.path.last().copied().unwrap_or(PipelineState::Idle)
    }
}

/// Drives one query through retrieval, analysis, synthesis, and scoring.
pub struct Coordinator {
    config: PipelineConfig,
    retriever: Retriever,
    agents: Vec<Arc<dyn DomainAgent>>,
    synthesizer: HypothesisSynthesizer,
    evaluator: ConfidenceEvaluator,
    source_filter: Option<Vec<Source>>,
}

impl Coordinator {
    /// Coordinator with the stock agents and the offline template generator.
    pub fn new(config: PipelineConfig, retriever: Retriever) -> Self {
        let selector = ContextSelector::new(config.context_budget);
        Self {
            config,
            retriever,
            agents: default_agents(),
            synthesizer: HypothesisSynthesizer::new(Arc::new(TemplateGenerator::new()))
                .with_selector(selector),
            evaluator: ConfidenceEvaluator::new(),
            source_filter: None,
        }
    }

    /// Swap the generation backend.
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.synthesizer = HypothesisSynthesizer::new(generator)
            .with_selector(ContextSelector::new(self.config.context_budget));
        self
    }

    /// Replace the agent set.
    pub fn with_agents(mut self, agents: Vec<Arc<dyn DomainAgent>>) -> Self {
        self.agents = agents;
        self
    }

    /// Restrict retrieval to a subset of the registered sources. The filter
    /// narrows; it cannot enable a source the registry does not hold.
    pub fn with_source_filter(mut self, sources: Vec<Source>) -> Self {
        self.source_filter = Some(sources);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Run one query through the full pipeline.
    pub async fn run_pipeline(&self, query: &str) -> PipelineResult<HypothesisResult> {
        self.run_traced(query, &[]).await.0
    }

    /// Run one query with caller-supplied passages merged in as upload
    /// evidence ahead of analysis.
    pub async fn run_pipeline_with_context(
        &self,
        query: &str,
        extra_texts: &[String],
    ) -> PipelineResult<HypothesisResult> {
        self.run_traced(query, extra_texts).await.0
    }

    /// Run and report the state path alongside the result.
    pub async fn run_traced(
        &self,
        query: &str,
        extra_texts: &[String],
    ) -> (PipelineResult<HypothesisResult>, RunTrace) {
        let mut trace = RunTrace::default();
        trace.enter(PipelineState::Idle);
        let result = self.run_inner(query, extra_texts, &mut trace).await;
        if result.is_err() {
            trace.enter(PipelineState::Failed);
        }
        (result, trace)
    }

    async fn run_inner(
        &self,
        query: &str,
        extra_texts: &[String],
        trace: &mut RunTrace,
    ) -> PipelineResult<HypothesisResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidQuery);
        }
        let run_id = RunId::new();
        info!(%run_id, query, "pipeline start");
        let mut diagnostics = PipelineDiagnostics::default();

        // Retrieval
        trace.enter(PipelineState::Retrieving);
        let started = Instant::now();
        let (mut retrieval, stats) = self
            .retriever
            .retrieve_detailed(query, self.source_filter.as_deref())
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))?;

        let uploads = wrap_uploads(extra_texts);
        if !uploads.is_empty() {
            // Uploads extend the pool rather than competing for the k slots.
            let cap = self.config.retrieval_k + uploads.len();
            let mut pool = uploads;
            pool.extend(retrieval.items);
            retrieval.items = merge_ranked(pool, cap);
        }
        diagnostics.retrieval_ms = started.elapsed().as_millis() as u64;
        diagnostics.cache_hits = stats.cache_hits;
        diagnostics.cache_misses = stats.cache_misses;
        diagnostics.sources_queried = stats.sources_queried.len();
        diagnostics.sources_failed = stats.sources_failed.len();
        let mut warnings = retrieval.warnings.clone();

        if retrieval.items.is_empty() {
            return Err(PipelineError::NoEvidenceAvailable);
        }
        debug!(
            items = retrieval.items.len(),
            degraded = retrieval.degraded,
            "retrieval complete"
        );

        // Analysis
        trace.enter(PipelineState::Analyzing);
        let started = Instant::now();
        let findings = self
            .analyze(query, &retrieval, &mut warnings)
            .await;
        diagnostics.analysis_ms = started.elapsed().as_millis() as u64;
        if findings.is_empty() {
            return Err(PipelineError::SynthesisImpossible);
        }

        // Synthesis
        trace.enter(PipelineState::Synthesizing);
        let started = Instant::now();
        let SynthesisOutput {
            text,
            citations,
            source_coverage,
            warnings: synthesis_warnings,
        } = self
            .synthesizer
            .synthesize(query, &retrieval, &findings)
            .await
            .map_err(|e| match e {
                AgentError::NoFindings => PipelineError::SynthesisImpossible,
                other => PipelineError::Internal(other.to_string()),
            })?;
        diagnostics.synthesis_ms = started.elapsed().as_millis() as u64;
        warnings.extend(synthesis_warnings);

        // Scoring
        trace.enter(PipelineState::Scoring);
        let started = Instant::now();
        let confidence = self.evaluator.evaluate(&retrieval, &findings, &text)?;
        diagnostics.scoring_ms = started.elapsed().as_millis() as u64;

        trace.enter(PipelineState::Done);
        info!(
            %run_id,
            confidence = confidence.overall_percentage,
            citations = citations.len(),
            coverage = source_coverage,
            degraded = retrieval.degraded,
            "pipeline done"
        );
        Ok(HypothesisResult {
            text,
            confidence,
            citations,
            warnings,
            diagnostics,
        })
    }

    /// Fan the agents out in parallel, each under the request deadline.
    /// A failing or silent agent costs one finding and leaves a warning.
    async fn analyze(
        &self,
        query: &str,
        retrieval: &RetrievalResult,
        warnings: &mut Vec<String>,
    ) -> Vec<DomainFinding> {
        let deadline = self.config.request_timeout;
        let analyses = join_all(self.agents.iter().map(|agent| async move {
            let domain = agent.domain();
            match timeout(deadline, agent.analyze(query, retrieval)).await {
                Ok(Ok(finding)) => (domain, Ok(finding)),
                Ok(Err(e)) => (domain, Err(e.to_string())),
                Err(_) => (domain, Err(format!("timed out after {} s", deadline.as_secs()))),
            }
        }))
        .await;

        let mut findings = Vec::new();
        for (domain, outcome) in analyses {
            match outcome {
                Ok(finding) => findings.push(finding),
                Err(reason) => {
                    warn!(domain = %domain, reason = %reason, "agent produced no finding");
                    warnings.push(format!("{domain} agent produced no finding: {reason}"));
                }
            }
        }
        findings
    }
}

/// Caller-supplied passages as upload evidence: full relevance, not trusted,
/// ids numbered from one.
fn wrap_uploads(texts: &[String]) -> Vec<EvidenceItem> {
    texts
        .iter()
        .filter(|t| !t.trim().is_empty())
        .enumerate()
        .map(|(idx, t)| EvidenceItem::new(Source::Upload, format!("upload-{}", idx + 1), t.trim(), 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_are_stable() {
        assert_eq!(PipelineState::Retrieving.as_str(), "retrieving");
        assert_eq!(PipelineState::Failed.to_string(), "failed");
        assert_eq!(
            serde_json::to_string(&PipelineState::Done).unwrap(),
            "\"done\""
        );
    }

    #[test]
    fn empty_trace_reports_idle() {
        let trace = RunTrace::default();
        assert_eq!(trace.current(), PipelineState::Idle);
        assert!(trace.path().is_empty());
    }

    #[test]
    fn uploads_are_numbered_trimmed_and_skip_blanks() {
        let uploads = wrap_uploads(&[
            "  first passage  ".to_string(),
            "   ".to_string(),
            "second".to_string(),
        ]);
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].id, "upload-1");
        assert_eq!(uploads[0].text, "first passage");
        assert_eq!(uploads[1].id, "upload-2");
        assert!(uploads.iter().all(|u| u.source == Source::Upload));
        assert!(uploads.iter().all(|u| u.score == 1.0));
    }
}
