//! # Scout Core
//!
//! Domain types, traits, and error definitions for the Scout agent.
//! This crate has no HTTP or runtime dependencies. It defines the model
//! that the provider, tool, and agent crates implement against.
//!
//! ## Layout
//!
//! - [`message`]: role-tagged messages and the append-only [`Conversation`]
//! - [`provider`]: the [`Provider`] trait over chat-completion backends
//! - [`tool`]: the [`Tool`] trait and the fixed-name [`ToolRegistry`]
//! - [`error`]: one `thiserror` enum per bounded context

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
