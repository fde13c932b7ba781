//! Orchestrator-facing boundary of the concierge booking engine.
//!
//! An external language-model loop decides *when* to call the engine; this
//! crate decides *what* a call does and how the outcome is reported:
//! - `tools` - one `Tool` per inbound operation, collected in a `ToolRegistry`
//!   that also emits the JSON function definitions handed to the model
//! - `session` - explicit per-conversation state owned by the orchestrator
//! - `runtime` - runs a batch of model tool calls and logs them in the session
//!
//! # Status Lines
//!
//! Every tool answers with `TOKEN: details`. The orchestrator may only tell
//! the guest something succeeded when the token is `SUCCESS`, and the ledger
//! only produces that token after its transaction committed.

pub mod runtime;
pub mod session;
pub mod tools;

pub use runtime::{AgentRuntime, ToolCall};
pub use session::{ConversationSession, Speaker, ToolCallRecord};
pub use tools::{Tool, ToolRegistry};
