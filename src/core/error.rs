//! Agent 错误类型
//!
//! 配置缺失快速失败；推理错误先记入会话再向上抛出；未知子代理立即失败且不改动会话；
//! 后端错误（含审批超时）原样透传。

use thiserror::Error;

use crate::llm::ReasoningError;
use crate::providers::ProviderError;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// 操作所需的凭据 / 后端未配置
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Reasoning failed: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("Unknown subagent: {0}")]
    UnknownSubagent(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// 具体 agent 变体在 handle 中报告的业务失败
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl AgentError {
    /// 错误种类标签，写入会话 ErrorRecord::kind
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Configuration(_) => "ConfigurationError",
            AgentError::Reasoning(_) => "ReasoningError",
            AgentError::UnknownSubagent(_) => "UnknownSubagentError",
            AgentError::Provider(ProviderError::ApprovalTimeout { .. }) => "ApprovalTimeoutError",
            AgentError::Provider(_) => "ProviderError",
            AgentError::Execution(_) => "ExecutionError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kind_tags() {
        assert_eq!(AgentError::from(ReasoningError::Timeout).kind(), "ReasoningError");
        let timeout = AgentError::from(ProviderError::ApprovalTimeout {
            proposal_id: "p".into(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(timeout.kind(), "ApprovalTimeoutError");
        assert_eq!(AgentError::from(ProviderError::NotFound("x".into())).kind(), "ProviderError");
        assert_eq!(AgentError::UnknownSubagent("w".into()).kind(), "UnknownSubagentError");
    }

    #[test]
    fn test_provider_errors_display_unchanged() {
        let err = AgentError::from(ProviderError::Transport("connection reset".into()));
        assert_eq!(err.to_string(), "Provider transport error: connection reset");
    }
}
