//! The ReAct agent loop for Scout.
//!
//! The agent alternates between asking the model and running tools:
//!
//! 1. **Seed** the conversation with the query (and an optional system prompt)
//! 2. **Ask the model** via the configured provider
//! 3. **If tool calls**: run them in order, append each result, go back to 2
//! 4. **If text**: that text is the answer
//!
//! Every appended message is reported as an [`AgentEvent`]. The run ends
//! with an answer, or with an error once the iteration cap is reached.

pub mod loop_runner;
pub mod stream_event;

pub use loop_runner::{AgentLoop, AgentResult, LoopState};
pub use stream_event::AgentEvent;
