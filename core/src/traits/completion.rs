use async_trait::async_trait;

/// A text-completion backend.
///
/// `generate` returns the model's continuation of `prompt`, cut at the first
/// occurrence of any marker in `stop`. Transport and quota failures surface as
/// errors; implementations do not retry.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn generate(&self, prompt: &str, stop: &[String]) -> anyhow::Result<String>;
}

/// Cuts `text` at the earliest occurrence of any stop marker.
pub fn truncate_at_stop(text: &str, stop: &[String]) -> String {
    let cut = stop
        .iter()
        .filter(|marker| !marker.is_empty())
        .filter_map(|marker| text.find(marker.as_str()))
        .min()
        .unwrap_or(text.len());
    text[..cut].to_string()
}
