use std::time::Duration;

/// Model output matched neither the final-answer nor the action grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not parse model output: `{text}`")]
pub struct ParseError {
    pub text: String,
}

/// Fatal outcomes of [`AgentLoop::run`](crate::agent::AgentLoop::run).
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("model requested unknown tool `{name}`")]
    UnknownTool { name: String },
    #[error("completion client failed: {0}")]
    Completion(#[source] anyhow::Error),
    #[error("completion client did not answer within {after:?}")]
    CompletionTimeout { after: Duration },
    #[error("tool `{name}` failed: {source}")]
    ToolFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("no final answer after {budget} iterations")]
    BudgetExceeded { budget: usize, last_output: String },
}

impl AgentError {
    /// Whether a caller may retry the run. Only a missed deadline qualifies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CompletionTimeout { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("prompt template is missing the `{0}` placeholder")]
    MissingPlaceholder(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a tool named `{name}` is already registered")]
    DuplicateTool { name: String },
}
