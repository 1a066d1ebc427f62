//! Console rendering of agent events.

use scout_agent::AgentEvent;
use scout_core::message::{Message, MessageToolCall, Role};

/// Text block printed for an event, or `None` when the event has nothing to show.
///
/// Terminal events are not printed here: the final answer was already
/// rendered as a message, and errors go to stderr.
pub fn render_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::Message { message, .. } => Some(format!("\n[Agent]: {}", render_message(message))),
        AgentEvent::Done { .. } | AgentEvent::Error { .. } => None,
    }
}

fn render_message(message: &Message) -> String {
    match message.role {
        Role::Tool => {
            let id = message.tool_call_id.as_deref().unwrap_or("?");
            format!("[Tool {id}] {}", message.content)
        }
        Role::Assistant if message.requests_tools() => {
            let calls = message
                .tool_calls
                .iter()
                .map(render_call)
                .collect::<Vec<_>>()
                .join(", ");
            if message.content.trim().is_empty() {
                format!("calling {calls}")
            } else {
                format!("{}\ncalling {calls}", message.content)
            }
        }
        _ => message.content.clone(),
    }
}

fn render_call(call: &MessageToolCall) -> String {
    // Re-serialize so the arguments print on one line without extra whitespace.
    let arguments = serde_json::from_str::<serde_json::Value>(&call.arguments)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| call.arguments.clone());
    format!("{}({arguments})", call.name)
}
