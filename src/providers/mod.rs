//! 可插拔后端契约：记忆（Memory）、治理审批（Governance）、任务（Task）
//!
//! 核心只持有 `Arc<dyn …Provider>`，从不依赖具体后端类型；每个契约附带一个进程内实现，
//! 供原型、测试与离线运行使用。

pub mod governance;
pub mod memory;
pub mod tasks;

use std::time::Duration;

use thiserror::Error;

pub use governance::{
    session_metadata, Change, ChangeOperation, GovernanceProvider, InMemoryGovernance, Proposal,
    ProposalStatus,
};
pub use memory::{Context, InMemoryProvider, MemoryProvider};
pub use tasks::{InMemoryTaskProvider, Task, TaskProvider, TaskStatus};

/// JSON 对象（metadata / filters / data 共用）
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// 后端调用错误；核心原样向上传播，不做包装或吞掉
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider transport error: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider backend error: {0}")]
    Backend(String),

    /// 轮询超时时提案仍为 pending（后端状态不变）
    #[error("Proposal {proposal_id} not decided within {timeout:?}")]
    ApprovalTimeout {
        proposal_id: String,
        timeout: Duration,
    },
}

pub type ProviderResult<T> = Result<T, ProviderError>;
