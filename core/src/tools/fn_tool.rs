use crate::traits::Tool;
use async_trait::async_trait;

type InvokeFn = dyn Fn(&str) -> anyhow::Result<String> + Send + Sync;

/// Wraps a closure as a [`Tool`].
///
/// Useful for capabilities that already exist as a function, such as a
/// question-answering chain over a document index.
pub struct FnTool {
    name: String,
    description: String,
    func: Box<InvokeFn>,
}

impl FnTool {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            func: Box::new(func),
        }
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<String> {
        (self.func)(input)
    }
}
