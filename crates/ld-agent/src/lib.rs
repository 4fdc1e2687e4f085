//! Generative-model integration for LabDesk
//!
//! Everything the server needs from the AI collaborator lives here: the
//! [`TextModel`] seam for single-turn generation, the production
//! [`GeminiClient`], the prompt builders, and the step-plan parsing with
//! its lossy text fallback. The [`Planner`] facade ties them together.

pub mod gemini;
pub mod model;
pub mod plan;
pub mod planner;
pub mod prompts;

pub use gemini::GeminiClient;
pub use model::{ModelError, ModelResult, TextModel};
pub use plan::{default_step, extract_code, normalize_steps, parse_steps};
pub use planner::Planner;
