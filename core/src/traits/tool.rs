use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// A capability the agent can call by name.
///
/// From the loop's point of view a tool is a string-to-string function. The
/// description is pasted into the prompt verbatim, so it must not contain the
/// stop markers or the `Action:`/`Observation:` labels.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn invoke(&self, input: &str) -> anyhow::Result<String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}
