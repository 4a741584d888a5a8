//! Answer generation: the [`Generator`] trait, widget tone/length
//! configuration, prompt construction, and the local fallback answer.
//!
//! The engine never talks to a language-model vendor directly. It builds a
//! [`GenerationRequest`] and hands it to whatever [`Generator`] the
//! application injected (HTTP client, SDK wrapper, test stub).

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Returned when nothing else can be said.
pub const APOLOGY: &str =
    "I'm sorry, I encountered an error while searching for information. Please try again later.";

/// Returned by [`RagEngine::reply`](crate::engine::RagEngine::reply) for an empty question.
pub const EMPTY_QUERY_REPLY: &str =
    "I'm sorry, I need a valid question to search for information.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Voice of the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Technical,
    Casual,
    Formal,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Technical => "technical",
            Tone::Casual => "casual",
            Tone::Formal => "formal",
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            Tone::Professional => "Respond in a clear, courteous, professional tone.",
            Tone::Friendly => "Respond in a warm, friendly and approachable tone.",
            Tone::Technical => {
                "Respond in a precise, technical tone and include specific details where relevant."
            }
            Tone::Casual => "Respond in a relaxed, conversational tone.",
            Tone::Formal => "Respond in a formal tone, avoiding contractions and slang.",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "friendly" => Ok(Tone::Friendly),
            "technical" => Ok(Tone::Technical),
            "casual" => Ok(Tone::Casual),
            "formal" => Ok(Tone::Formal),
            other => Err(RagError::InvalidInput(format!(
                "unknown tone '{}': expected professional, friendly, technical, casual, or formal",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Tone {
    type Error = RagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Widget settings that shape generated answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub ai_tone: Tone,
    /// 1 (terse) ..= 5 (detailed).
    pub response_length: u8,
    /// Extra operator instructions appended to the system prompt.
    pub ai_instructions: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            ai_tone: Tone::Professional,
            response_length: 3,
            ai_instructions: None,
        }
    }
}

impl WidgetConfig {
    /// Lenient constructor for untrusted settings: an unknown tone becomes
    /// `professional` and the length is clamped into `1..=5`.
    pub fn from_raw(ai_tone: &str, response_length: i64, ai_instructions: Option<String>) -> Self {
        let tone = ai_tone.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to professional tone");
            Tone::Professional
        });
        Self {
            ai_tone: tone,
            response_length: response_length.clamp(1, 5) as u8,
            ai_instructions: ai_instructions.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if !(1..=5).contains(&self.response_length) {
            return Err(RagError::InvalidInput(format!(
                "widget.response_length must be in 1..=5, got {}",
                self.response_length
            )));
        }
        Ok(())
    }

    /// Output-length budget in tokens for the language model.
    pub fn max_tokens(&self) -> u32 {
        match self.response_length {
            0..=2 => 100,
            3 => 200,
            _ => 300,
        }
    }

    /// How many context chunks the fallback answer quotes.
    pub fn fallback_chunk_count(&self) -> usize {
        match self.response_length {
            0..=2 => 1,
            3 => 2,
            _ => 3,
        }
    }

    fn length_guidance(&self) -> &'static str {
        match self.response_length {
            0..=2 => "Keep the answer brief: one or two sentences.",
            3 => "Keep the answer concise: a short paragraph.",
            _ => "Give a thorough, detailed answer.",
        }
    }
}

/// Everything a [`Generator`] needs to produce an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub query: String,
    pub context: Vec<String>,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub tone: Tone,
}

impl GenerationRequest {
    pub fn new(query: &str, context: Vec<String>, config: &WidgetConfig) -> Self {
        let system_prompt = build_system_prompt(&context, config);
        Self {
            query: query.to_string(),
            context,
            system_prompt,
            max_tokens: config.max_tokens(),
            tone: config.ai_tone,
        }
    }
}

/// External answer synthesis. May fail; the engine always recovers.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short identifier for logs (e.g. `"openai"`, `"disabled"`).
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for std::sync::Arc<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        (**self).generate(request).await
    }
}

/// A generator that always fails, forcing the local fallback answer.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        anyhow::bail!("answer generation is disabled")
    }
}

fn build_system_prompt(context: &[String], config: &WidgetConfig) -> String {
    let mut prompt = if context.is_empty() {
        String::from(
            "You are a customer support assistant. Provide helpful, accurate responses based on your knowledge.\n\
             If you don't know the answer to a question, acknowledge that and provide a general response.",
        )
    } else {
        format!(
            "You are a customer support assistant. Provide helpful, accurate responses based on the context provided.\n\
             Use the following context information to answer the user's query.\n\
             If the context doesn't contain relevant information, acknowledge that and provide a general response.\n\n\
             RELEVANT CONTEXT:\n{}",
            context.join(CONTEXT_SEPARATOR)
        )
    };

    prompt.push_str("\n\n");
    prompt.push_str(config.ai_tone.guidance());
    prompt.push(' ');
    prompt.push_str(config.length_guidance());

    if let Some(instructions) = &config.ai_instructions {
        prompt.push_str("\n\nAdditional instructions:\n");
        prompt.push_str(instructions.trim());
    }
    prompt
}

/// Deterministic answer built from the top context chunks, used whenever
/// the generator is unavailable.
pub fn fallback_answer(context: &[String], config: &WidgetConfig) -> String {
    if context.is_empty() {
        return String::from(
            "I couldn't find specific information about that in our knowledge base. \
             Please try adding some text or documents to the knowledge base first, then ask again. \
             (Note: the AI model is currently unavailable, so responses are using a fallback method.)",
        );
    }

    let quoted = context
        .iter()
        .take(config.fallback_chunk_count())
        .map(|c| c.trim())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Based on the information in our knowledge base:\n\n{}\n\n\
         This is the most relevant information I could find for your query. \
         The AI model is currently unavailable, so I'm showing you the matching knowledge base content instead of a synthesized answer.",
        quoted
    )
}
