//! Text generation trait and deterministic implementations.

use crate::{ModelError, ModelResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Produces hypothesis prose from a prompt and an evidence context.
///
/// Implementations must preserve citation markers (`[Source ID: ...]`)
/// appearing in the context; downstream citation mapping depends on them
/// surviving generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate text for `prompt` grounded in `context`.
    async fn generate(&self, prompt: &str, context: &str) -> ModelResult<String>;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Rule-based generator: merges the context paragraphs into one passage,
/// keeping every citation marker intact. The offline default — no model call,
/// fully deterministic.
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for TemplateGenerator {
    async fn generate(&self, _prompt: &str, context: &str) -> ModelResult<String> {
        let paragraphs: Vec<&str> = context
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if paragraphs.is_empty() {
            return Err(ModelError::InvalidInput("empty context".to_string()));
        }
        Ok(paragraphs.join(" "))
    }

    fn name(&self) -> &str {
        "template"
    }
}

/// Scripted generator for tests: returns the first canned response whose
/// pattern appears in the prompt or context, counting every call.
pub struct MockGenerator {
    responses: Vec<(String, String)>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a canned response for a prompt/context pattern.
    pub fn with_response(mut self, pattern: &str, response: &str) -> Self {
        self.responses.push((pattern.to_string(), response.to_string()));
        self
    }

    /// Make every call fail as unavailable.
    pub fn failing(message: &str) -> Self {
        Self {
            responses: Vec::new(),
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generate calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str, context: &str) -> ModelResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(ModelError::Unavailable(message.clone()));
        }
        for (pattern, response) in &self.responses {
            if prompt.contains(pattern.as_str()) || context.contains(pattern.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok("Mock hypothesis".to_string())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
