pub mod completion;
pub mod tool;

pub use completion::{CompletionClient, truncate_at_stop};
pub use tool::{Tool, ToolSpec};
