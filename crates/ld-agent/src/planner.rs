//! High-level agent operations over a [`TextModel`]

use std::sync::Arc;

use ld_api_contract::{AgentStep, ChatMessage};
use serde_json::Value;
use tracing::instrument;

use crate::model::{ModelResult, TextModel};
use crate::{plan, prompts};

/// Facade over the generative model for the three agent operations:
/// plan generation, per-step code generation, and refinement chat.
#[derive(Clone)]
pub struct Planner {
    model: Arc<dyn TextModel>,
}

impl Planner {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Turn quiz responses into a normalized step plan.
    #[instrument(skip_all)]
    pub async fn analyze_research_goal(
        &self,
        quiz_responses: &Value,
    ) -> ModelResult<Vec<AgentStep>> {
        let prompt = prompts::analysis_prompt(quiz_responses);
        let reply = self.model.generate(&prompt).await?;
        Ok(plan::parse_steps(&reply))
    }

    /// Generate an executable snippet for one step, optionally seeded
    /// with the code already produced by earlier steps.
    #[instrument(skip_all)]
    pub async fn generate_step_code(
        &self,
        step: &AgentStep,
        context: &Value,
        previous_code: Option<&str>,
    ) -> ModelResult<String> {
        let prompt = prompts::code_prompt(step, context, previous_code);
        let reply = self.model.generate(&prompt).await?;
        Ok(plan::extract_code(&reply))
    }

    /// Answer a refinement question against the current plan and the
    /// recent conversation window.
    #[instrument(skip_all)]
    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatMessage],
        steps: &[AgentStep],
    ) -> ModelResult<String> {
        let prompt = prompts::chat_prompt(message, history, steps);
        self.model.generate(&prompt).await
    }
}
