//! # Boardroom Core
//!
//! Domain types, collaborator traits, and error definitions for the Boardroom
//! multi-agent orchestrator. This crate has no framework dependencies. It
//! defines the model every other crate implements against.
//!
//! ## Layout
//!
//! - [`profile`]: agent personas and the registry snapshot that holds them
//! - [`message`]: the append-only conversation log entries
//! - [`decision`]: who speaks next, or the termination sentinel
//! - [`tool`]: structured tool calls and the name-keyed router
//! - [`provider`]: the text-completion seam
//! - [`store`]: memory, artifact, task, config and history stores
//! - [`event`]: broadcast bus for domain events
//!
//! Collaborators are object-safe `async_trait` traits held as `Arc<dyn ...>`,
//! so tests swap in scripted implementations without touching callers.

pub mod error;
pub mod message;
pub mod profile;
pub mod decision;
pub mod provider;
pub mod tool;
pub mod store;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use message::{ConversationMessage, MessageKind};
pub use profile::{AgentProfile, AgentRegistry, MemoryKind, MemoryPolicy};
pub use decision::{OrchestrationDecision, TeamAction, TeamChange, TERMINATE};
pub use provider::{CompletionRequest, CompletionService, PromptMessage, PromptRole};
pub use tool::{Payload, Tool, ToolCall, ToolContext, ToolOutcome, ToolRouter};
pub use store::{
    ArtifactStore, ConfigOverride, ConfigStore, HistoryStore, MemoryStore, NewTask, StoreResult,
    Task, TaskPriority, TaskStatus, TaskStore, TaskUpdate,
};
pub use event::{DomainEvent, EventBus};
