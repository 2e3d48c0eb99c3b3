//! 核心编排层：错误、会话状态机、子代理委派、Agent 执行循环

pub mod agent;
pub mod error;
pub mod session;
pub mod subagents;

pub use agent::{
    format_contexts, Agent, AgentBuilder, AgentSettings, BaseAgent, ExecuteOptions, ProposalReceipt,
    ReasonParams, TaskOutcome, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
pub use error::AgentError;
pub use session::{generate_agent_id, AgentSession, ErrorRecord, SessionStatus, SessionSummary};
pub use subagents::{
    delegation_tool, DelegationHook, SubagentDefinition, SubagentRegistry, DELEGATION_TOOL_NAME,
};
