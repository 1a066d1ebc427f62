//! Agent-level progress events.
//!
//! `AgentEvent` is the stream of conversation states: one event per
//! appended message, then exactly one terminal event.

use scout_core::message::Message;
use scout_core::provider::Usage;
use serde::{Deserialize, Serialize};

use crate::loop_runner::LoopState;

/// Events emitted by the agent while a query is being answered.
///
/// - `message`: a message was appended to the conversation
/// - `done`: the model produced a final answer
/// - `error`: the run failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A message was appended; `state` is the loop state it leads to.
    Message {
        state: LoopState,
        iteration: u32,
        message: Message,
    },

    /// The run finished with an answer.
    Done {
        answer: String,
        iterations: u32,
        tool_calls_made: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },

    /// The run failed.
    Error { message: String },
}

impl AgentEvent {
    /// True for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Message { .. })
    }
}
