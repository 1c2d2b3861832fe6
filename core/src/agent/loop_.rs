use crate::agent::parser::{Action, parse_output};
use crate::agent::transcript::{OBSERVATION_MARKER, Step, Transcript};
use crate::agent::{PromptBuilder, ToolRegistry};
use crate::config::Config;
use crate::error::{AgentError, TemplateError};
use crate::traits::CompletionClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 20;

pub fn default_stop_markers() -> Vec<String> {
    vec![OBSERVATION_MARKER.to_string(), "\n\tObservation:".to_string()]
}

struct RunState<'a> {
    question: &'a str,
    transcript: Transcript,
    iterations_used: usize,
    budget: usize,
}

/// Reason-then-act loop: ask the model, run the tool it picks, feed the
/// observation back, repeat until it gives a final answer.
pub struct AgentLoop {
    client: Arc<dyn CompletionClient>,
    prompt: PromptBuilder,
    tool_registry: Arc<ToolRegistry>,
    max_iterations: usize,
    stop: Vec<String>,
    completion_timeout: Option<Duration>,
}

impl AgentLoop {
    pub fn new(client: Arc<dyn CompletionClient>, tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            prompt: PromptBuilder::default(),
            tool_registry,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stop: default_stop_markers(),
            completion_timeout: None,
        }
    }

    pub fn from_config(
        client: Arc<dyn CompletionClient>,
        tool_registry: Arc<ToolRegistry>,
        config: &Config,
    ) -> Result<Self, TemplateError> {
        let mut agent = Self::new(client, tool_registry)
            .with_max_iterations(config.max_iterations)
            .with_stop_markers(config.stop.clone());

        if let Some(template) = &config.prompt_template {
            agent = agent.with_prompt(PromptBuilder::new(template.clone())?);
        }
        if let Some(secs) = config.completion_timeout_secs {
            agent = agent.with_completion_timeout(Duration::from_secs(secs));
        }
        Ok(agent)
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// The observation marker is always kept, otherwise the model would
    /// write its own observations.
    pub fn with_stop_markers(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        if !self.stop.iter().any(|s| s == OBSERVATION_MARKER) {
            self.stop.push(OBSERVATION_MARKER.to_string());
        }
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    pub fn stop_markers(&self) -> &[String] {
        &self.stop
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub async fn run(&self, question: &str) -> Result<String, AgentError> {
        let tools = self.tool_registry.specs();
        let mut state = RunState {
            question,
            transcript: Transcript::new(),
            iterations_used: 0,
            budget: self.max_iterations,
        };
        let mut last_output = String::new();

        info!(budget = state.budget, tools = tools.len(), "Agent run started");

        while state.iterations_used < state.budget {
            let prompt = self
                .prompt
                .build(state.question, &tools, &state.transcript.render());
            debug!(
                iteration = state.iterations_used + 1,
                prompt_len = prompt.len(),
                "Requesting completion"
            );

            let output = self.complete(&prompt).await?;

            let action = parse_output(&output).inspect_err(|e| {
                warn!(iteration = state.iterations_used + 1, "Unparseable model output: {}", e.text);
            })?;

            let (name, input) = match action {
                Action::FinalAnswer { text } => {
                    info!(iterations = state.iterations_used + 1, "Final answer produced");
                    return Ok(text);
                }
                Action::ToolCall { name, input } => (name, input),
            };

            let Some(tool) = self.tool_registry.get(&name) else {
                warn!(tool = %name, "Model requested an unregistered tool");
                return Err(AgentError::UnknownTool { name });
            };

            debug!(tool = %name, input = %input, "Invoking tool");
            let observation = match tool.invoke(&input).await {
                Ok(observation) => observation,
                Err(source) => {
                    warn!(tool = %name, "Tool failed: {}", source);
                    return Err(AgentError::ToolFailed { name, source });
                }
            };

            state.transcript.push(Step::new(output.clone(), observation));
            state.iterations_used += 1;
            last_output = output;
        }

        warn!(
            budget = state.budget,
            steps = state.transcript.len(),
            "Iteration budget exhausted without a final answer"
        );
        Err(AgentError::BudgetExceeded {
            budget: state.budget,
            last_output,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        let call = self.client.generate(prompt, &self.stop);
        let result = match self.completion_timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(?after, "Completion client timed out");
                    return Err(AgentError::CompletionTimeout { after });
                }
            },
            None => call.await,
        };
        result.map_err(|e| {
            warn!("Completion client failed: {}", e);
            AgentError::Completion(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FnTool;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOMINEES: &str = "The director nominees are Jane Roe, John Doe and Ada Park.";

    struct ScriptedClient {
        responses: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
        stops: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedClient {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
                stops: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        fn prompt(&self, idx: usize) -> String {
            self.prompts.lock().unwrap()[idx].clone()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn generate(&self, prompt: &str, stop: &[String]) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.stops.lock().unwrap().push(stop.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    struct RepeatingClient {
        output: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionClient for RepeatingClient {
        async fn generate(&self, _prompt: &str, _stop: &[String]) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl CompletionClient for FailingClient {
        async fn generate(&self, _prompt: &str, _stop: &[String]) -> anyhow::Result<String> {
            anyhow::bail!("quota exceeded")
        }
    }

    struct HangingClient;

    #[async_trait]
    impl CompletionClient for HangingClient {
        async fn generate(&self, _prompt: &str, _stop: &[String]) -> anyhow::Result<String> {
            std::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    fn proxy_registry(invocations: Arc<AtomicUsize>) -> Arc<ToolRegistry> {
        let tool = FnTool::new(
            "Proxy Statement",
            "Useful for answering questions about the company's proxy statement",
            move |_| {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(NOMINEES.to_string())
            },
        );
        Arc::new(ToolRegistry::new().with_tool(Arc::new(tool)).unwrap())
    }

    fn repeating(output: &str) -> Arc<RepeatingClient> {
        Arc::new(RepeatingClient {
            output: output.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn answers_after_one_tool_call() {
        let client = Arc::new(ScriptedClient::new(&[
            " I should check the proxy statement.\nAction: Proxy Statement\nAction Input: director nominees",
            " I now know the final answer\nFinal Answer: Jane Roe, John Doe and Ada Park",
        ]));
        let invocations = Arc::new(AtomicUsize::new(0));
        let agent = AgentLoop::new(client.clone(), proxy_registry(invocations.clone()));

        let answer = agent.run("Who are the director nominees?").await.unwrap();

        assert_eq!(answer, "Jane Roe, John Doe and Ada Park");
        assert_eq!(client.calls(), 2);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);

        let second = client.prompt(1);
        assert!(second.contains("Question: Who are the director nominees?"));
        assert!(second.ends_with(&format!(
            "Action Input: director nominees\nObservation: {NOMINEES}\nThought:"
        )));
    }

    #[tokio::test]
    async fn first_prompt_has_empty_scratchpad() {
        let client = Arc::new(ScriptedClient::new(&["Final Answer: nothing to do"]));
        let agent = AgentLoop::new(client.clone(), Arc::new(ToolRegistry::new()));

        assert_eq!(agent.run("q").await.unwrap(), "nothing to do");
        assert!(client.prompt(0).ends_with("Question: q\nThought:"));
    }

    #[tokio::test]
    async fn unknown_tool_fails_run() {
        let client = Arc::new(ScriptedClient::new(&["Action: Search\nAction Input: rust"]));
        let agent = AgentLoop::new(client.clone(), Arc::new(ToolRegistry::new()));

        let err = agent.run("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool { ref name } if name == "Search"));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn stops_after_budget() {
        let output = "Action: Proxy Statement\nAction Input: again";
        let client = repeating(output);
        let invocations = Arc::new(AtomicUsize::new(0));
        let agent = AgentLoop::new(client.clone(), proxy_registry(invocations.clone()))
            .with_max_iterations(3);

        let err = agent.run("loop forever").await.unwrap_err();

        match err {
            AgentError::BudgetExceeded {
                budget,
                last_output,
            } => {
                assert_eq!(budget, 3);
                assert_eq!(last_output, output);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_budget_never_calls_client() {
        let client = repeating("Final Answer: unreachable");
        let agent =
            AgentLoop::new(client.clone(), Arc::new(ToolRegistry::new())).with_max_iterations(0);

        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::BudgetExceeded { budget: 0, .. }));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn answer_on_last_iteration_is_returned() {
        let client = Arc::new(ScriptedClient::new(&[
            "Action: Proxy Statement\nAction Input: nominees",
            "Final Answer: done",
        ]));
        let agent = AgentLoop::new(client.clone(), proxy_registry(Arc::new(AtomicUsize::new(0))))
            .with_max_iterations(2);

        assert_eq!(agent.run("q").await.unwrap(), "done");
    }

    #[tokio::test]
    async fn parse_error_carries_output() {
        let client = Arc::new(ScriptedClient::new(&["I have no idea."]));
        let invocations = Arc::new(AtomicUsize::new(0));
        let agent = AgentLoop::new(client, proxy_registry(invocations.clone()));

        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::Parse(ref e) if e.text == "I have no idea."));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completion_failure_is_fatal() {
        let agent = AgentLoop::new(Arc::new(FailingClient), Arc::new(ToolRegistry::new()));

        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::Completion(_)));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn completion_timeout_is_retryable() {
        let agent = AgentLoop::new(Arc::new(HangingClient), Arc::new(ToolRegistry::new()))
            .with_completion_timeout(Duration::from_millis(10));

        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::CompletionTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn tool_failure_is_fatal() {
        let tool = FnTool::new("Search", "Searches", |_| anyhow::bail!("index offline"));
        let registry = Arc::new(ToolRegistry::new().with_tool(Arc::new(tool)).unwrap());
        let client = Arc::new(ScriptedClient::new(&["Action: Search\nAction Input: x"]));
        let agent = AgentLoop::new(client, registry);

        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolFailed { ref name, .. } if name == "Search"));
    }

    #[tokio::test]
    async fn observation_marker_is_always_a_stop_marker() {
        let client = Arc::new(ScriptedClient::new(&["Final Answer: ok"]));
        let agent = AgentLoop::new(client.clone(), Arc::new(ToolRegistry::new()))
            .with_stop_markers(vec!["\nQuestion:".to_string()]);

        agent.run("q").await.unwrap();

        let stops = client.stops.lock().unwrap()[0].clone();
        assert_eq!(stops, vec!["\nQuestion:".to_string(), OBSERVATION_MARKER.to_string()]);
    }

    #[tokio::test]
    async fn runs_do_not_share_transcripts() {
        let client = Arc::new(ScriptedClient::new(&[
            "Action: Proxy Statement\nAction Input: nominees",
            "Final Answer: first",
            "Final Answer: second",
        ]));
        let agent = AgentLoop::new(client.clone(), proxy_registry(Arc::new(AtomicUsize::new(0))));

        assert_eq!(agent.run("one").await.unwrap(), "first");
        assert_eq!(agent.run("two").await.unwrap(), "second");
        assert!(client.prompt(2).ends_with("Question: two\nThought:"));
    }

    #[test]
    fn from_config_applies_settings() {
        let config = Config {
            max_iterations: 5,
            completion_timeout_secs: Some(30),
            ..Config::default()
        };
        let agent = AgentLoop::from_config(
            repeating("Final Answer: x"),
            Arc::new(ToolRegistry::new()),
            &config,
        )
        .unwrap();

        assert_eq!(agent.max_iterations(), 5);
        assert_eq!(agent.stop_markers(), default_stop_markers().as_slice());
        assert_eq!(agent.completion_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn from_config_rejects_bad_template() {
        let config = Config {
            prompt_template: Some("Question: {input}".to_string()),
            ..Config::default()
        };
        let result = AgentLoop::from_config(
            repeating("Final Answer: x"),
            Arc::new(ToolRegistry::new()),
            &config,
        );
        assert!(matches!(result, Err(TemplateError::MissingPlaceholder(_))));
    }
}
