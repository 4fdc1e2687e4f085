//! Step-plan parsing
//!
//! The primary path decodes a fenced JSON array strictly. The fallback is
//! a deliberately lossy line heuristic: the surrounding product tolerates
//! imperfect plans, so a best-effort degradation beats a hard failure.

use ld_api_contract::AgentStep;

/// Parse a model reply into a normalized step plan.
///
/// Never returns an empty plan for unparseable input: when neither the
/// strict nor the fallback path finds anything, the hard-coded
/// [`default_step`] stands in.
pub fn parse_steps(reply: &str) -> Vec<AgentStep> {
    let body = fenced_block(reply, "```json")
        .or_else(|| fenced_block(reply, "```"))
        .unwrap_or(reply)
        .trim();

    match serde_json::from_str::<Vec<AgentStep>>(body) {
        Ok(steps) => normalize_steps(steps),
        Err(_) => {
            let steps = fallback_steps(reply);
            if steps.is_empty() {
                vec![default_step()]
            } else {
                steps
            }
        }
    }
}

/// Contents of the first fence opened by `opener`, if any.
fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let end = text[start..].find("```")? + start;
    Some(&text[start..end])
}

/// Line-heuristic extraction for replies that are not well-formed JSON.
///
/// A line starting with a digit or `Step` opens a new step titled by that
/// line; the first following non-empty line becomes its description;
/// anything resembling a code fence is discarded. Lossy and
/// order-dependent by design.
fn fallback_steps(text: &str) -> Vec<AgentStep> {
    let mut steps: Vec<AgentStep> = Vec::new();
    let mut current: Option<AgentStep> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let opens_step = line.starts_with("Step")
            || line.chars().next().is_some_and(|c| c.is_ascii_digit());
        if opens_step {
            if let Some(step) = current.take() {
                steps.push(step);
            }
            current = Some(AgentStep {
                step_number: steps.len() as u32 + 1,
                title: line.to_string(),
                description: String::new(),
                code: String::new(),
                dependencies: vec![],
            });
        } else if let Some(step) = current.as_mut() {
            if step.description.is_empty() {
                step.description = line.to_string();
            } else if line.to_lowercase().contains("code") || line.contains("```") {
                continue;
            }
        }
    }

    if let Some(step) = current {
        steps.push(step);
    }
    steps
}

/// The plan of last resort.
pub fn default_step() -> AgentStep {
    AgentStep {
        step_number: 1,
        title: "Load and analyze data".to_string(),
        description: "Perform initial data analysis".to_string(),
        code: "import pandas as pd\nimport numpy as np\n# Load your data here".to_string(),
        dependencies: vec![],
    }
}

/// Renumber steps sequentially from 1 and drop dependencies that do not
/// reference an earlier step.
///
/// The model is asked for exactly this shape but is not trusted to
/// deliver it; the plan invariants hold regardless of what came back.
pub fn normalize_steps(steps: Vec<AgentStep>) -> Vec<AgentStep> {
    let renumbered: Vec<(u32, u32)> = steps
        .iter()
        .enumerate()
        .map(|(index, step)| (step.step_number, index as u32 + 1))
        .collect();

    steps
        .into_iter()
        .enumerate()
        .map(|(index, mut step)| {
            let new_number = index as u32 + 1;
            step.dependencies = step
                .dependencies
                .iter()
                .filter_map(|dep| {
                    renumbered
                        .iter()
                        .find(|(old, _)| old == dep)
                        .map(|(_, new)| *new)
                })
                .filter(|dep| *dep < new_number)
                .collect();
            step.step_number = new_number;
            step
        })
        .collect()
}

/// Extract one executable snippet from a model reply.
///
/// Prefers a `python`-tagged fence, then any fence, then the whole
/// trimmed reply.
pub fn extract_code(reply: &str) -> String {
    fenced_block(reply, "```python")
        .or_else(|| fenced_block(reply, "```"))
        .unwrap_or(reply)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps_from_json_fence() {
        let reply = r#"Here is your plan:
```json
[
  {"step_number": 1, "title": "Load", "description": "Read CSV", "code": "import pandas as pd", "dependencies": []},
  {"step_number": 2, "title": "Plot", "description": "Histogram", "code": "df.hist()", "dependencies": [1]}
]
```
Good luck!"#;
        let steps = parse_steps(reply);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].title, "Load");
        assert_eq!(steps[1].dependencies, vec![1]);
    }

    #[test]
    fn test_parse_steps_from_bare_json() {
        let reply = r#"[{"step_number": 1, "title": "Load", "description": "Read CSV", "code": "df = ..."}]"#;
        let steps = parse_steps(reply);
        assert_eq!(steps.len(), 1);
        assert!(steps[0].dependencies.is_empty());
    }

    #[test]
    fn test_parse_steps_renumbers_and_drops_forward_dependencies() {
        let reply = r#"[
  {"step_number": 3, "title": "A", "description": "", "code": "", "dependencies": [7]},
  {"step_number": 7, "title": "B", "description": "", "code": "", "dependencies": [3]},
  {"step_number": 9, "title": "C", "description": "", "code": "", "dependencies": [3, 7]}
]"#;
        let steps = parse_steps(reply);
        let numbers: Vec<u32> = steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(steps[0].dependencies.is_empty(), "forward reference kept");
        assert_eq!(steps[1].dependencies, vec![1]);
        assert_eq!(steps[2].dependencies, vec![1, 2]);
    }

    #[test]
    fn test_fallback_extracts_numbered_lines() {
        let reply = "Here is a plan.\n\
                     Step 1: Load the data\n\
                     Read the CSV file into a dataframe.\n\
                     2. Clean the data\n\
                     Drop missing values.\n";
        let steps = parse_steps(reply);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_number, 1);
        assert_eq!(steps[0].title, "Step 1: Load the data");
        assert_eq!(steps[0].description, "Read the CSV file into a dataframe.");
        assert_eq!(steps[1].step_number, 2);
        assert_eq!(steps[1].description, "Drop missing values.");
    }

    #[test]
    fn test_fallback_skips_code_fences() {
        let reply = "1. Load data\nRead the file.\n```python\nimport pandas\n```\n";
        let steps = parse_steps(reply);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].description, "Read the file.");
        assert!(steps[0].code.is_empty());
    }

    #[test]
    fn test_unparseable_reply_yields_default_step() {
        let steps = parse_steps("The model refuses to cooperate today.");
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0], default_step());
        assert_eq!(steps[0].step_number, 1);
    }

    #[test]
    fn test_extract_code_prefers_python_fence() {
        let reply = "Some prose.\n```python\nimport numpy as np\n```\nMore prose.";
        assert_eq!(extract_code(reply), "import numpy as np");
    }

    #[test]
    fn test_extract_code_falls_back_to_any_fence() {
        let reply = "```\nprint('hi')\n```";
        assert_eq!(extract_code(reply), "print('hi')");
    }

    #[test]
    fn test_extract_code_without_fence_returns_trimmed_reply() {
        assert_eq!(extract_code("  df.describe()  \n"), "df.describe()");
    }
}
