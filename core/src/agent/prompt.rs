use crate::error::TemplateError;
use crate::traits::ToolSpec;
use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const TOOLS_PLACEHOLDER: &str = "{tools}";
pub const TOOL_NAMES_PLACEHOLDER: &str = "{tool_names}";
pub const QUESTION_PLACEHOLDER: &str = "{input}";
pub const SCRATCHPAD_PLACEHOLDER: &str = "{agent_scratchpad}";

const PLACEHOLDERS: [&str; 4] = [
    TOOLS_PLACEHOLDER,
    TOOL_NAMES_PLACEHOLDER,
    QUESTION_PLACEHOLDER,
    SCRATCHPAD_PLACEHOLDER,
];

pub const DEFAULT_TEMPLATE: &str = "Answer the following questions as best you can. You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {input}
Thought:{agent_scratchpad}";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(tools|tool_names|input|agent_scratchpad)\}").unwrap());

/// Renders the prompt for one iteration.
///
/// Substitution is a single pass over the template, so placeholder-looking
/// text inside the question or the transcript is left untouched.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptBuilder {
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        let template = template.into();
        for placeholder in PLACEHOLDERS {
            if !template.contains(placeholder) {
                return Err(TemplateError::MissingPlaceholder(placeholder));
            }
        }
        Ok(Self { template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn build(&self, question: &str, tools: &[ToolSpec], scratchpad: &str) -> String {
        let descriptions = tools
            .iter()
            .map(|t| format!("{}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n");
        let names = tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        PLACEHOLDER_RE
            .replace_all(&self.template, |caps: &Captures| match &caps[1] {
                "tools" => descriptions.clone(),
                "tool_names" => names.clone(),
                "input" => question.to_string(),
                _ => scratchpad.to_string(),
            })
            .into_owned()
    }
}
