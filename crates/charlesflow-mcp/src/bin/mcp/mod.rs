//! MCP server modules for CharlesFlow
//!
//! Parameter types, global session state, progress forwarding and prompts
//! used by mcp_server.rs.

pub mod progress;
pub mod prompts;
pub mod results;
pub mod state;
pub mod types;


// Re-export commonly used items
pub use progress::forward_capture_events;
pub use prompts::PromptRegistry;
pub use state::{
    needs_exclusive_session, set_client_log_level, SESSION_BUSY_MESSAGE, SESSION_SEMAPHORE,
};
pub use types::*;
