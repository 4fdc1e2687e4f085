//! Prompt construction for the research-planning agent
//!
//! The prompt text is an external contract with the model: the strict
//! JSON instructions in the analysis prompt are what [`crate::plan`]
//! relies on for its primary parse path.

use ld_api_contract::{AgentStep, ChatMessage, ChatRole};
use serde_json::Value;

/// How many trailing history entries are rendered into chat context.
pub const HISTORY_WINDOW: usize = 5;

fn quiz_field<'a>(quiz: &'a Value, key: &str, default: &'a str) -> &'a str {
    quiz.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Build the instruction that turns quiz responses into a step plan.
pub fn analysis_prompt(quiz_responses: &Value) -> String {
    let field = quiz_field(quiz_responses, "field", "General");
    let question = quiz_field(quiz_responses, "question", "");
    let data_type = quiz_field(quiz_responses, "dataType", "");
    let data_format = quiz_field(quiz_responses, "dataFormat", "");
    let outcomes = quiz_field(quiz_responses, "outcomes", "");
    let constraints = quiz_field(quiz_responses, "constraints", "");

    let outcomes = if outcomes.is_empty() {
        "Not specified"
    } else {
        outcomes
    };
    let constraints = if constraints.is_empty() {
        "None"
    } else {
        constraints
    };

    format!(
        r#"You are an AI research assistant helping a {field} researcher with data analysis.

Research Question: {question}
Data Type: {data_type}
Data Format: {data_format}
Expected Outcomes: {outcomes}
Constraints: {constraints}

Generate a step-by-step research plan as a JSON array. Each step should have:
- step_number: integer starting from 1
- title: brief descriptive title
- description: detailed description of what this step accomplishes
- code: Python code snippet (pandas, numpy, matplotlib, scipy) for this step
- dependencies: array of step numbers this step depends on (can be empty)

Focus on:
1. Data loading and preprocessing
2. Exploratory data analysis
3. Statistical analysis/modeling
4. Visualization
5. Results interpretation

Return ONLY a valid JSON array, no markdown, no explanations. Example format:
[
  {{
    "step_number": 1,
    "title": "Load and inspect data",
    "description": "Load the dataset and examine its structure",
    "code": "import pandas as pd\ndf = pd.read_csv('data.csv')\nprint(df.head())\nprint(df.info())",
    "dependencies": []
  }}
]
"#
    )
}

/// Build the instruction that produces code for one step.
pub fn code_prompt(step: &AgentStep, context: &Value, previous_code: Option<&str>) -> String {
    let mut prompt = format!(
        r#"Generate Python code for this research step:

Step: {}
Description: {}

Research Context:
- Field: {}
- Data Format: {}
- Expected Outcomes: {}

"#,
        step.title,
        step.description,
        quiz_field(context, "field", "General"),
        quiz_field(context, "dataFormat", "Unknown"),
        quiz_field(context, "outcomes", ""),
    );

    if let Some(previous_code) = previous_code {
        prompt.push_str(&format!(
            "\nPrevious code that has been executed:\n```python\n{}\n```\n",
            previous_code
        ));
    }

    prompt.push_str(
        r#"
Generate complete, executable Python code using pandas, numpy, matplotlib, and scipy.
Include all necessary imports. The code should be well-commented.

Return ONLY the Python code, no markdown formatting, no explanations.
"#,
    );
    prompt
}

/// Build the refinement-chat instruction.
///
/// Only the last [`HISTORY_WINDOW`] history entries are included; there
/// is no summarization of anything older.
pub fn chat_prompt(message: &str, history: &[ChatMessage], steps: &[AgentStep]) -> String {
    let steps_summary = steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}: {}", i + 1, step.title, step.description))
        .collect::<Vec<_>>()
        .join("\n");

    let mut history_context = String::new();
    if !history.is_empty() {
        history_context.push_str("\nPrevious conversation:\n");
        let window_start = history.len().saturating_sub(HISTORY_WINDOW);
        for entry in &history[window_start..] {
            let role = match entry.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            history_context.push_str(&format!("{}: {}\n", role, entry.content));
        }
    }

    format!(
        r#"You are an AI research assistant. The user is working through a research plan with the following steps:

{steps_summary}

{history_context}

User's question: {message}

Provide a helpful, concise response. If the user wants to modify the plan, suggest specific changes to the steps.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(number: u32, title: &str, description: &str) -> AgentStep {
        AgentStep {
            step_number: number,
            title: title.into(),
            description: description.into(),
            code: String::new(),
            dependencies: vec![],
        }
    }

    #[test]
    fn test_analysis_prompt_uses_quiz_fields_and_defaults() {
        let quiz = json!({
            "question": "Does treatment X work?",
            "dataType": "tabular",
            "dataFormat": "CSV"
        });
        let prompt = analysis_prompt(&quiz);
        assert!(prompt.contains("a General researcher"));
        assert!(prompt.contains("Research Question: Does treatment X work?"));
        assert!(prompt.contains("Expected Outcomes: Not specified"));
        assert!(prompt.contains("Constraints: None"));
        assert!(prompt.contains("Return ONLY a valid JSON array"));
    }

    #[test]
    fn test_code_prompt_includes_previous_code_when_present() {
        let quiz = json!({ "field": "Biology" });
        let step = step(2, "Clean data", "Drop missing rows");
        let prompt = code_prompt(&step, &quiz, Some("df = df.dropna()"));
        assert!(prompt.contains("Step: Clean data"));
        assert!(prompt.contains("- Field: Biology"));
        assert!(prompt.contains("```python\ndf = df.dropna()\n```"));
    }

    #[test]
    fn test_chat_prompt_numbers_steps_from_one() {
        let steps = vec![step(1, "Load", "Read data"), step(2, "Plot", "Draw charts")];
        let prompt = chat_prompt("add a modeling step", &[], &steps);
        assert!(prompt.contains("1. Load: Read data"));
        assert!(prompt.contains("2. Plot: Draw charts"));
        assert!(!prompt.contains("Previous conversation"));
    }

    #[test]
    fn test_chat_prompt_windows_history_to_last_five() {
        let history: Vec<ChatMessage> = (0..8)
            .map(|i| ChatMessage::user(format!("message {i}")))
            .collect();
        let prompt = chat_prompt("hello", &history, &[]);
        assert!(!prompt.contains("message 2"));
        assert!(prompt.contains("message 3"));
        assert!(prompt.contains("message 7"));
    }
}
