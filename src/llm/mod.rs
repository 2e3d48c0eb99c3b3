//! 推理层：后端抽象与实现（Anthropic Messages API / Mock）

pub mod anthropic;
pub mod mock;
pub mod traits;
pub mod types;

pub use anthropic::{AnthropicReasoner, AnthropicSettings, ANTHROPIC_BASE_URL, ANTHROPIC_VERSION};
pub use mock::MockReasoner;
pub use traits::{ReasoningError, ReasoningProvider};
pub use types::{
    ContentBlock, Message, ReasoningRequest, ReasoningResponse, Role, SessionHandle, ToolSpec, Usage,
};
