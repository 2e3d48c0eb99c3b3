//! 治理审批契约：提案（Proposal）与人工审批
//!
//! propose 立即返回 pending 提案，从不阻塞等待人工审核；状态只由治理后端（外部权威）修改，
//! 经 get_proposal_status 轮询或 wait_for_approval 阻塞等待观察到。
//! 自动审批判断（should_auto_approve）只是客户端的建议性逻辑，不等同于后端确认的 approved。

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Metadata, ProviderError, ProviderResult};

/// 变更操作类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Create,
    Update,
    Delete,
}

/// 一条待提议的变更；提议前临时构造
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub operation: ChangeOperation,
    pub target: String,
    #[serde(default)]
    pub data: Metadata,
    pub reasoning: Option<String>,
}

impl Change {
    pub fn new(operation: ChangeOperation, target: impl Into<String>, data: Metadata) -> Self {
        Self {
            operation,
            target: target.into(),
            data,
            reasoning: None,
        }
    }

    /// Create 变更；data 不是 JSON 对象时包装为 {"value": data}
    pub fn create(target: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            other => {
                let mut map = Metadata::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self::new(ChangeOperation::Create, target, data)
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// 提案状态：pending 之后恰好转换一次到 approved / rejected，之后终态不变
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

/// 治理提案；id 是唯一稳定句柄
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub changes: Vec<Change>,
    pub status: ProposalStatus,
    pub confidence: f64,
    pub reasoning: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Proposal {
    pub fn is_decided(&self) -> bool {
        self.status != ProposalStatus::Pending
    }
}

/// 治理后端 trait
#[async_trait]
pub trait GovernanceProvider: Send + Sync {
    /// 创建提案；立即返回 pending 状态
    async fn propose(
        &self,
        changes: Vec<Change>,
        confidence: f64,
        reasoning: Option<String>,
        metadata: Option<Metadata>,
    ) -> ProviderResult<Proposal>;

    /// 查询当前状态（幂等读）
    async fn get_proposal_status(&self, proposal_id: &str) -> ProviderResult<Proposal>;

    /// 阻塞等待审批：每 poll_interval 轮询一次；approved → true，rejected → false，
    /// timeout 耗尽仍为 pending → ApprovalTimeout
    async fn wait_for_approval(
        &self,
        proposal_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> ProviderResult<bool> {
        tracing::info!(proposal_id, ?timeout, "Waiting for approval");
        let poll_interval = poll_interval.max(Duration::from_millis(1));
        let started = tokio::time::Instant::now();
        loop {
            let proposal = self.get_proposal_status(proposal_id).await?;
            match proposal.status {
                ProposalStatus::Approved => {
                    tracing::info!(proposal_id, "Proposal approved");
                    return Ok(true);
                }
                ProposalStatus::Rejected => {
                    tracing::warn!(proposal_id, "Proposal rejected");
                    return Ok(false);
                }
                ProposalStatus::Pending => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(ProviderError::ApprovalTimeout {
                    proposal_id: proposal_id.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// 是否可自动审批（建议性）：需同时开启 auto_approve 且置信度达到阈值
    fn should_auto_approve(&self, proposal: &Proposal, auto_approve: bool, threshold: f64) -> bool {
        auto_approve && proposal.confidence >= threshold
    }
}

/// 标准的会话关联 metadata（agent 会话、agent、工作会话、工作区、外部任务）
pub fn session_metadata(
    agent_session_id: Option<&str>,
    agent_id: Option<&str>,
    work_session_id: Option<&str>,
    workspace_id: Option<&str>,
    task_id: Option<&str>,
) -> Metadata {
    let mut metadata = Metadata::new();
    let pairs = [
        ("agent_session_id", agent_session_id),
        ("agent_id", agent_id),
        ("work_session_id", work_session_id),
        ("workspace_id", workspace_id),
        ("task_id", task_id),
    ];
    for (key, value) in pairs {
        if let Some(v) = value {
            metadata.insert(key.to_string(), json!(v));
        }
    }
    metadata
}

/// 进程内治理后端；approve / reject 扮演外部审批人
#[derive(Debug, Default)]
pub struct InMemoryGovernance {
    proposals: RwLock<HashMap<String, Proposal>>,
}

impl InMemoryGovernance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approve(&self, proposal_id: &str) -> ProviderResult<Proposal> {
        self.decide(proposal_id, ProposalStatus::Approved)
    }

    pub fn reject(&self, proposal_id: &str) -> ProviderResult<Proposal> {
        self.decide(proposal_id, ProposalStatus::Rejected)
    }

    /// 仍为 pending 的提案 id
    pub fn pending_ids(&self) -> Vec<String> {
        self.proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|p| !p.is_decided())
            .map(|p| p.id.clone())
            .collect()
    }

    fn decide(&self, proposal_id: &str, status: ProposalStatus) -> ProviderResult<Proposal> {
        let mut proposals = self.proposals.write().unwrap_or_else(PoisonError::into_inner);
        let proposal = proposals
            .get_mut(proposal_id)
            .ok_or_else(|| ProviderError::NotFound(format!("proposal {proposal_id}")))?;
        if proposal.is_decided() {
            return Err(ProviderError::Backend(format!(
                "proposal {proposal_id} already {:?}",
                proposal.status
            )));
        }
        proposal.status = status;
        Ok(proposal.clone())
    }
}

#[async_trait]
impl GovernanceProvider for InMemoryGovernance {
    async fn propose(
        &self,
        changes: Vec<Change>,
        confidence: f64,
        reasoning: Option<String>,
        metadata: Option<Metadata>,
    ) -> ProviderResult<Proposal> {
        let proposal = Proposal {
            id: format!("prop_{}", uuid::Uuid::new_v4().simple()),
            changes,
            status: ProposalStatus::Pending,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning,
            metadata: metadata.unwrap_or_default(),
        };
        tracing::info!(proposal_id = %proposal.id, changes = proposal.changes.len(), "Proposal created");
        self.proposals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(proposal.id.clone(), proposal.clone());
        Ok(proposal)
    }

    async fn get_proposal_status(&self, proposal_id: &str) -> ProviderResult<Proposal> {
        self.proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(proposal_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("proposal {proposal_id}")))
    }
}
