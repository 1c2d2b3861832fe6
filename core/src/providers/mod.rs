pub mod factory;
pub mod ollama;
pub mod openai;

pub use factory::create_client;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;
