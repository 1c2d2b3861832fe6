pub mod fn_tool;

pub use fn_tool::FnTool;
