//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No database types in any signature
//! - No process/transport implementation details
//! - Repository traits are minimal and CRUD-focused

pub mod event_emitter;
pub mod mcp_dto;
pub mod mcp_error;
pub mod server_repository;

// Re-export for convenience
pub use event_emitter::{AppEventEmitter, NoopEmitter};
pub use mcp_dto::{McpConnectionStatus, McpTestReport};
pub use mcp_error::{McpErrorCategory, McpErrorInfo, McpServiceError};
pub use server_repository::{McpRepositoryError, McpServerRepository};
