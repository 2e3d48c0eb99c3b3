//! 推理后端抽象
//!
//! 所有后端（Anthropic Messages API / Mock）实现 ReasoningProvider：一次请求，一次完整响应。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::{ReasoningRequest, ReasoningResponse};

/// 推理调用失败（传输、API、解析）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReasoningError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Reasoning request timed out")]
    Timeout,
}

/// 推理后端 trait
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// 后端名称（日志用）
    fn name(&self) -> &str;

    async fn reason(&self, request: ReasoningRequest) -> Result<ReasoningResponse, ReasoningError>;
}
