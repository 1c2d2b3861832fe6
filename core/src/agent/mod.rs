pub mod loop_;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod transcript;

pub use loop_::{AgentLoop, DEFAULT_MAX_ITERATIONS, default_stop_markers};
pub use parser::{Action, FINAL_ANSWER_MARKER, parse_output};
pub use prompt::{DEFAULT_TEMPLATE, PromptBuilder};
pub use registry::ToolRegistry;
pub use transcript::{OBSERVATION_MARKER, Step, THOUGHT_MARKER, Transcript};
