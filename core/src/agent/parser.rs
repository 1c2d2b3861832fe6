//! Turns raw model text into the next [`Action`].
//!
//! Two grammars are recognised, checked in order:
//!
//! 1. `Final Answer: <text>`, taken from the last occurrence of the marker.
//! 2. `Action: <tool>` followed, possibly after newlines, by
//!    `Action Input: <input>`, where the input runs to the end of the text.
//!
//! Anything else is a [`ParseError`].

use crate::error::ParseError;
use regex::Regex;
use std::sync::LazyLock;

pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.*?)\s*Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ToolCall { name: String, input: String },
    FinalAnswer { text: String },
}

pub fn parse_output(text: &str) -> Result<Action, ParseError> {
    if let Some(idx) = text.rfind(FINAL_ANSWER_MARKER) {
        let answer = &text[idx + FINAL_ANSWER_MARKER.len()..];
        return Ok(Action::FinalAnswer {
            text: answer.trim().to_string(),
        });
    }

    let caps = ACTION_RE.captures(text).ok_or_else(|| ParseError {
        text: text.to_string(),
    })?;

    let name = caps[1]
        .trim()
        .trim_matches(['[', ']'])
        .trim()
        .to_string();
    let input = caps[2].trim_matches(' ').trim_matches('"').to_string();

    Ok(Action::ToolCall { name, input })
}
