//! Agent 会话：一次执行周期的簿记
//!
//! 状态机只有 active → completed | active → failed 两条边，终态不可离开；
//! ended_at 当且仅当状态非 active 时存在。提案 id 幂等插入，错误只追加不删除。
//! 纯内存结构，不做任何 I/O。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::SessionHandle;
use crate::providers::Metadata;

use super::error::AgentError;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

/// 会话中记录的一条错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    /// 错误种类标签（见 AgentError::kind）
    pub kind: String,
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// 一次 agent 执行周期
///
/// 只序列化：状态与 ended_at 的一致性由方法维护，不从外部数据重建
#[derive(Debug, Clone, Serialize)]
pub struct AgentSession {
    pub id: String,
    pub agent_id: String,
    /// 推理后端的续接句柄；对核心不透明
    pub claude_session_id: Option<SessionHandle>,
    /// 外部任务系统的关联 id
    pub task_id: Option<String>,
    pub task_metadata: Metadata,
    pub started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    status: SessionStatus,
    pub metadata: Metadata,
    tasks_completed: u64,
    proposals_created: Vec<String>,
    errors: Vec<ErrorRecord>,
}

/// 会话摘要（日志 / 存储用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub agent_id: String,
    pub claude_session_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub tasks_completed: u64,
    pub proposals_created: Vec<String>,
    pub error_count: usize,
    pub metadata: Metadata,
}

impl AgentSession {
    /// 新会话，id 形如 `session_{12 hex}`
    pub fn new(agent_id: impl Into<String>) -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self::with_id(format!("session_{}", &hex[..12]), agent_id)
    }

    /// 以调用方提供的 id 恢复会话
    pub fn with_id(id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            claude_session_id: None,
            task_id: None,
            task_metadata: Metadata::new(),
            started_at: Utc::now(),
            ended_at: None,
            status: SessionStatus::Active,
            metadata: Metadata::new(),
            tasks_completed: 0,
            proposals_created: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_task(mut self, task_id: Option<String>, task_metadata: Option<Metadata>) -> Self {
        self.task_id = task_id;
        self.task_metadata = task_metadata.unwrap_or_default();
        self
    }

    pub fn with_claude_session_id(mut self, handle: Option<SessionHandle>) -> Self {
        self.claude_session_id = handle;
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    pub fn record_task_completed(&mut self) {
        self.tasks_completed += 1;
    }

    pub fn proposals_created(&self) -> &[String] {
        &self.proposals_created
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// 记录提案 id；重复 id 忽略
    pub fn add_proposal(&mut self, proposal_id: impl Into<String>) {
        let proposal_id = proposal_id.into();
        if !self.proposals_created.contains(&proposal_id) {
            self.proposals_created.push(proposal_id);
        }
    }

    pub fn add_error(&mut self, error: &AgentError, context: Option<&str>) {
        self.add_error_message(error.to_string(), error.kind(), context);
    }

    /// 追加一条错误记录（不经 AgentError 的场景，如钩子或外部任务的失败消息）
    pub fn add_error_message(
        &mut self,
        message: impl Into<String>,
        kind: impl Into<String>,
        context: Option<&str>,
    ) {
        self.errors.push(ErrorRecord {
            message: message.into(),
            kind: kind.into(),
            context: context.map(str::to_string),
            timestamp: Utc::now(),
        });
    }

    /// 标记完成；终态上重复调用无效果
    pub fn complete(&mut self) {
        if self.is_active() {
            self.status = SessionStatus::Completed;
            self.ended_at = Some(Utc::now());
        }
    }

    /// 标记失败；终态上不改状态，但错误仍会被记录
    pub fn fail(&mut self, error: Option<&AgentError>) {
        if self.is_active() {
            self.status = SessionStatus::Failed;
            self.ended_at = Some(Utc::now());
        }
        if let Some(err) = error {
            self.add_error(err, None);
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            agent_id: self.agent_id.clone(),
            claude_session_id: self.claude_session_id.as_ref().map(|h| h.as_str().to_string()),
            started_at: self.started_at,
            ended_at: self.ended_at,
            status: self.status,
            tasks_completed: self.tasks_completed,
            proposals_created: self.proposals_created.clone(),
            error_count: self.errors.len(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn summary_json(&self) -> Value {
        serde_json::to_value(self.summary()).unwrap_or(Value::Null)
    }
}

/// 生成 agent id：`agent_{type}_{8 hex}`
pub fn generate_agent_id(agent_type: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("agent_{}_{}", agent_type, &hex[..8])
}
