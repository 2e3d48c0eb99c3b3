//! Agent 编排：身份、后端、推理、会话与委派的组合
//!
//! - `BaseAgent`：共享机制（推理、会话、记忆检索、治理提案），由具体 agent 组合持有
//! - `Agent` trait：具体变体只实现 `handle`，`execute` / `autonomous_loop` / `run_continuous` 为默认实现
//! - 推理核心 `AgentCore` 以 `Arc` 持有，子代理注册表只保留 `Weak` 引用用于委派
//!
//! 同一 agent 的操作由所有者顺序调用；会话状态放在 `Mutex` 中，锁从不跨越 await。

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::llm::{Message, ReasoningProvider, ReasoningRequest, ReasoningResponse, SessionHandle, ToolSpec};
use crate::providers::{
    session_metadata, Change, Context, GovernanceProvider, MemoryProvider, Metadata, Proposal,
    TaskProvider, TaskStatus,
};

use super::error::AgentError;
use super::session::{generate_agent_id, AgentSession};
use super::subagents::{preview, SubagentRegistry};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Agent 行为参数（来自配置）
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub auto_approve: bool,
    /// 自动审批的置信度阈值
    pub confidence_threshold: f64,
    /// 仅存储，核心不实现重试
    pub max_retries: u32,
    /// ReasonParams 未指定 max_tokens 时使用
    pub max_tokens: u32,
    pub approval_timeout: Duration,
    pub poll_interval: Duration,
    /// run_continuous 每轮最多拉取的待办任务数
    pub pending_task_limit: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            auto_approve: false,
            confidence_threshold: 0.8,
            max_retries: 3,
            max_tokens: DEFAULT_MAX_TOKENS,
            approval_timeout: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(5),
            pending_task_limit: 10,
        }
    }
}

/// 一次推理调用的参数
#[derive(Debug, Clone, PartialEq)]
pub struct ReasonParams {
    pub task: String,
    /// 非空时作为第一条消息
    pub context: Option<String>,
    /// 显式 system prompt，优先于 agent 默认值
    pub system_prompt: Option<String>,
    pub tools: Option<Vec<ToolSpec>>,
    pub max_tokens: Option<u32>,
    /// 续接已有的推理会话（需存在句柄）
    pub resume_session: bool,
    /// 模型覆盖
    pub model: Option<String>,
}

impl ReasonParams {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            context: None,
            system_prompt: None,
            tools: None,
            max_tokens: None,
            resume_session: false,
            model: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_resume_session(mut self, resume: bool) -> Self {
        self.resume_session = resume;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// execute 的可选参数：外部任务关联 + 变体自定义参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteOptions {
    pub task_id: Option<String>,
    pub task_metadata: Option<Metadata>,
    pub params: Metadata,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_task_metadata(mut self, metadata: Metadata) -> Self {
        self.task_metadata = Some(metadata);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// propose 的结果；auto_approve_eligible 只是建议，提案在后端仍是 pending
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalReceipt {
    pub proposal: Proposal,
    pub auto_approve_eligible: bool,
}

/// autonomous_loop 中单个任务的结果
///
/// JSON 形如 `{"status": "completed", "value": …}` 或 `{"status": "failed", "value": {"error": …}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum TaskOutcome {
    Failed { error: String },
    Completed(Value),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TaskOutcome::Failed { error } => Some(error),
            TaskOutcome::Completed(_) => None,
        }
    }
}

/// 推理核心：身份、后端与会话状态
pub struct AgentCore {
    agent_id: String,
    agent_type: String,
    agent_name: String,
    reasoner: Arc<dyn ReasoningProvider>,
    memory: Option<Arc<dyn MemoryProvider>>,
    governance: Option<Arc<dyn GovernanceProvider>>,
    tasks: Option<Arc<dyn TaskProvider>>,
    settings: AgentSettings,
    metadata: Metadata,
    session: Mutex<Option<AgentSession>>,
    /// 推理会话续接句柄（来自构建参数或首个带句柄的响应）
    reasoning_handle: Mutex<Option<SessionHandle>>,
    span: tracing::Span,
}

impl AgentCore {
    pub(crate) fn span(&self) -> &tracing::Span {
        &self.span
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut AgentSession) -> R) -> Option<R> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .map(f)
    }

    /// 构造消息序列并调用推理后端；失败时若会话 active 则记录错误再返回
    pub(crate) async fn reason(
        &self,
        params: ReasonParams,
        default_system_prompt: Option<String>,
    ) -> Result<ReasoningResponse, AgentError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(context) = params.context.as_deref().filter(|c| !c.is_empty()) {
            messages.push(Message::user(format!("**Relevant Context:**\n\n{context}")));
        }
        messages.push(Message::user(params.task.clone()));

        let resume = if params.resume_session {
            self.reasoning_handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        } else {
            None
        };

        let request = ReasoningRequest {
            model: params.model.unwrap_or_else(|| self.settings.model.clone()),
            messages,
            max_tokens: params.max_tokens.unwrap_or(self.settings.max_tokens),
            system: params.system_prompt.or(default_system_prompt),
            tools: params.tools.unwrap_or_default(),
            resume,
        };

        tracing::info!(task = %preview(&params.task, 100), "Reasoning");
        match self.reasoner.reason(request).await {
            Ok(response) => {
                if let Some(handle) = &response.session_handle {
                    self.remember_handle(handle);
                }
                Ok(response)
            }
            Err(e) => {
                let err = AgentError::from(e);
                tracing::error!(error = %err, "Reasoning error");
                self.with_session(|s| {
                    if s.is_active() {
                        s.add_error(&err, Some("reasoning"));
                    }
                });
                Err(err)
            }
        }
    }

    fn remember_handle(&self, handle: &SessionHandle) {
        let mut stored = self
            .reasoning_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if stored.is_none() {
            *stored = Some(handle.clone());
            self.with_session(|s| s.claude_session_id = Some(handle.clone()));
            tracing::info!(handle = %handle, "Reasoning session started");
        }
    }
}

/// 共享机制：具体 agent 组合持有一个 BaseAgent
pub struct BaseAgent {
    core: Arc<AgentCore>,
    subagents: SubagentRegistry,
}

impl BaseAgent {
    pub fn builder(reasoner: Arc<dyn ReasoningProvider>) -> AgentBuilder {
        AgentBuilder::new(reasoner)
    }

    pub fn agent_id(&self) -> &str {
        &self.core.agent_id
    }

    pub fn agent_type(&self) -> &str {
        &self.core.agent_type
    }

    pub fn agent_name(&self) -> &str {
        &self.core.agent_name
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.core.settings
    }

    pub fn metadata(&self) -> &Metadata {
        &self.core.metadata
    }

    pub fn memory(&self) -> Option<&Arc<dyn MemoryProvider>> {
        self.core.memory.as_ref()
    }

    pub fn governance(&self) -> Option<&Arc<dyn GovernanceProvider>> {
        self.core.governance.as_ref()
    }

    pub fn tasks(&self) -> Option<&Arc<dyn TaskProvider>> {
        self.core.tasks.as_ref()
    }

    pub fn subagents(&self) -> &SubagentRegistry {
        &self.subagents
    }

    pub fn span(&self) -> &tracing::Span {
        &self.core.span
    }

    /// 当前推理续接句柄
    pub fn reasoning_handle(&self) -> Option<SessionHandle> {
        self.core
            .reasoning_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 当前会话快照
    pub fn current_session(&self) -> Option<AgentSession> {
        self.core
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 在当前会话上执行修改；无会话时返回 None
    pub fn with_session<R>(&self, f: impl FnOnce(&mut AgentSession) -> R) -> Option<R> {
        self.core.with_session(f)
    }

    /// 无会话或会话已终结时开启新会话，返回会话 id
    pub fn ensure_session(&self, task_id: Option<String>, task_metadata: Option<Metadata>) -> String {
        let handle = self.reasoning_handle();
        let mut slot = self.core.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = slot.as_ref().filter(|s| s.is_active()) {
            return session.id.clone();
        }

        let mut metadata = Metadata::new();
        metadata.insert("agent_type".into(), json!(self.core.agent_type));
        metadata.insert("agent_name".into(), json!(self.core.agent_name));
        metadata.insert("model".into(), json!(self.core.settings.model));
        metadata.extend(self.core.metadata.clone());

        let mut session = AgentSession::new(self.core.agent_id.clone())
            .with_task(task_id, task_metadata)
            .with_claude_session_id(handle);
        session.metadata = metadata;

        tracing::info!(
            parent: &self.core.span,
            session_id = %session.id,
            task_id = session.task_id.as_deref().unwrap_or("-"),
            "Started new session"
        );
        let id = session.id.clone();
        *slot = Some(session);
        id
    }

    /// 通用 system prompt：身份 + 已配置后端 + 子代理目录
    pub fn generic_system_prompt(&self) -> String {
        let status = |configured: bool| if configured { "Available" } else { "Not configured" };
        let mut prompt = format!(
            "You are an autonomous agent (ID: {}, Type: {}).\n\n\
             Your capabilities depend on the providers configured:\n\
             - Memory: {}\n\
             - Governance: {}\n\
             - Tasks: {}",
            self.core.agent_id,
            self.core.agent_type,
            status(self.core.memory.is_some()),
            status(self.core.governance.is_some()),
            status(self.core.tasks.is_some()),
        );

        let catalogue = self.subagents.delegation_prompt();
        if !catalogue.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&catalogue);
        }
        prompt.push_str("\n\nBe helpful, accurate, and thoughtful in your responses.");
        prompt
    }

    /// 检索记忆；未配置记忆后端时返回空
    pub async fn query_memory(&self, query: &str, limit: usize) -> Result<Vec<Context>, AgentError> {
        match &self.core.memory {
            Some(memory) => Ok(memory.query(query, None, limit).await?),
            None => Ok(Vec::new()),
        }
    }

    /// 创建治理提案并记入会话；返回时提案仍为 pending
    pub async fn propose(
        &self,
        changes: Vec<Change>,
        confidence: f64,
        reasoning: Option<String>,
    ) -> Result<ProposalReceipt, AgentError> {
        let governance = self.core.governance.as_ref().ok_or_else(|| {
            AgentError::Configuration("governance provider required to propose changes".into())
        })?;

        let metadata = self.current_session().map(|s| {
            let meta_str = |key: &str| s.task_metadata.get(key).and_then(Value::as_str).map(str::to_string);
            let work_session_id = meta_str("work_session_id");
            let workspace_id = meta_str("workspace_id");
            session_metadata(
                Some(&s.id),
                Some(&self.core.agent_id),
                work_session_id.as_deref(),
                workspace_id.as_deref(),
                s.task_id.as_deref(),
            )
        });

        let proposal = governance
            .propose(changes, confidence, reasoning, metadata)
            .instrument(self.core.span.clone())
            .await?;
        self.with_session(|s| s.add_proposal(proposal.id.clone()));

        let auto_approve_eligible = governance.should_auto_approve(
            &proposal,
            self.core.settings.auto_approve,
            self.core.settings.confidence_threshold,
        );
        tracing::info!(
            parent: &self.core.span,
            proposal_id = %proposal.id,
            confidence = proposal.confidence,
            auto_approve_eligible,
            "Proposal submitted"
        );
        Ok(ProposalReceipt {
            proposal,
            auto_approve_eligible,
        })
    }

    /// 按配置的超时与轮询间隔阻塞等待审批
    pub async fn wait_for_approval(&self, proposal_id: &str) -> Result<bool, AgentError> {
        let governance = self.core.governance.as_ref().ok_or_else(|| {
            AgentError::Configuration("governance provider required to wait for approval".into())
        })?;
        Ok(governance
            .wait_for_approval(
                proposal_id,
                self.core.settings.approval_timeout,
                self.core.settings.poll_interval,
            )
            .instrument(self.core.span.clone())
            .await?)
    }

    /// 当前会话创建过的提案 id
    pub fn pending_proposals(&self) -> Vec<String> {
        self.current_session()
            .map(|s| s.proposals_created().to_vec())
            .unwrap_or_default()
    }

    async fn reason_with_default(
        &self,
        params: ReasonParams,
        default_system_prompt: Option<String>,
    ) -> Result<ReasoningResponse, AgentError> {
        self.core
            .reason(params, default_system_prompt)
            .instrument(self.core.span.clone())
            .await
    }
}

impl std::fmt::Debug for BaseAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseAgent")
            .field("agent_id", &self.core.agent_id)
            .field("agent_type", &self.core.agent_type)
            .field("model", &self.core.settings.model)
            .finish()
    }
}

/// 记忆上下文拼接为文本（每条一行）
pub fn format_contexts(contexts: &[Context]) -> String {
    contexts
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// BaseAgent 构建器
pub struct AgentBuilder {
    reasoner: Arc<dyn ReasoningProvider>,
    agent_id: Option<String>,
    agent_type: String,
    agent_name: Option<String>,
    memory: Option<Arc<dyn MemoryProvider>>,
    governance: Option<Arc<dyn GovernanceProvider>>,
    tasks: Option<Arc<dyn TaskProvider>>,
    settings: AgentSettings,
    metadata: Metadata,
    resume: Option<(String, Option<SessionHandle>)>,
}

impl AgentBuilder {
    pub fn new(reasoner: Arc<dyn ReasoningProvider>) -> Self {
        Self {
            reasoner,
            agent_id: None,
            agent_type: "generic".to_string(),
            agent_name: None,
            memory: None,
            governance: None,
            tasks: None,
            settings: AgentSettings::default(),
            metadata: Metadata::new(),
            resume: None,
        }
    }

    pub fn agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn agent_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = agent_type.into();
        self
    }

    pub fn agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }

    pub fn memory(mut self, memory: Arc<dyn MemoryProvider>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn governance(mut self, governance: Arc<dyn GovernanceProvider>) -> Self {
        self.governance = Some(governance);
        self
    }

    pub fn tasks(mut self, tasks: Arc<dyn TaskProvider>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// 以已有会话 id（及可选推理句柄）恢复
    pub fn resume_session(
        mut self,
        session_id: impl Into<String>,
        reasoning_handle: Option<SessionHandle>,
    ) -> Self {
        self.resume = Some((session_id.into(), reasoning_handle));
        self
    }

    pub fn build(self) -> BaseAgent {
        let agent_id = self
            .agent_id
            .unwrap_or_else(|| generate_agent_id(&self.agent_type));
        let agent_name = self.agent_name.unwrap_or_else(|| agent_id.clone());
        let span = tracing::info_span!("agent", agent_id = %agent_id, agent_type = %self.agent_type);

        let (session, handle) = match self.resume {
            Some((session_id, handle)) => (
                Some(
                    AgentSession::with_id(session_id, agent_id.clone())
                        .with_claude_session_id(handle.clone()),
                ),
                handle,
            ),
            None => (None, None),
        };

        let core = Arc::new(AgentCore {
            agent_id,
            agent_type: self.agent_type,
            agent_name,
            reasoner: self.reasoner,
            memory: self.memory,
            governance: self.governance,
            tasks: self.tasks,
            settings: self.settings,
            metadata: self.metadata,
            session: Mutex::new(session),
            reasoning_handle: Mutex::new(handle),
            span,
        });

        tracing::info!(
            parent: &core.span,
            reasoner = core.reasoner.name(),
            "Initialized {} (type: {})",
            core.agent_name,
            core.agent_type
        );

        let subagents = SubagentRegistry::new(Arc::downgrade(&core));
        BaseAgent { core, subagents }
    }
}

/// 具体 agent 变体实现的 trait
///
/// 只需提供 `base` 与 `handle`；其余为共享默认实现。
#[async_trait]
pub trait Agent: Send + Sync {
    fn base(&self) -> &BaseAgent;

    /// 变体的任务逻辑（组合 reason / delegate / propose）
    async fn handle(&self, task: &str, options: &ExecuteOptions) -> Result<Value, AgentError>;

    /// 未显式指定时使用的 system prompt
    fn default_system_prompt(&self) -> Option<String> {
        Some(self.base().generic_system_prompt())
    }

    /// 执行单个任务：惰性开启会话，成功后 tasks_completed + 1
    async fn execute(&self, task: &str, options: ExecuteOptions) -> Result<Value, AgentError> {
        let base = self.base();
        base.ensure_session(options.task_id.clone(), options.task_metadata.clone());
        let result = self.handle(task, &options).await;
        if result.is_ok() {
            base.with_session(|s| s.record_task_completed());
        }
        result
    }

    /// 推理：显式 system prompt > default_system_prompt > 无
    async fn reason(&self, params: ReasonParams) -> Result<ReasoningResponse, AgentError> {
        let default = if params.system_prompt.is_none() {
            self.default_system_prompt()
        } else {
            None
        };
        self.base().reason_with_default(params, default).await
    }

    async fn delegate(
        &self,
        subagent_name: &str,
        task: &str,
        context: Option<&str>,
    ) -> Result<ReasoningResponse, AgentError> {
        self.base().subagents().delegate(subagent_name, task, context).await
    }

    /// 顺序执行任务列表；单个任务失败被记录并继续，结束后会话无条件 completed
    async fn autonomous_loop(&self, tasks: &[String], delay_between_tasks: Duration) -> Vec<TaskOutcome> {
        let base = self.base();
        let span = base.span().clone();
        async move {
            base.ensure_session(None, None);
            let total = tasks.len();
            let mut results = Vec::with_capacity(total);

            for (i, task) in tasks.iter().enumerate() {
                let n = i + 1;
                tracing::info!("Task {n}/{total}: {}", preview(task, 50));

                match self.execute(task, ExecuteOptions::new()).await {
                    Ok(value) => {
                        tracing::info!("Task {n} completed");
                        results.push(TaskOutcome::Completed(value));
                    }
                    Err(e) => {
                        tracing::error!("Task {n} failed: {e}");
                        let context = format!("task_{n}");
                        base.with_session(|s| s.add_error(&e, Some(&context)));
                        results.push(TaskOutcome::Failed { error: e.to_string() });
                    }
                }

                if !delay_between_tasks.is_zero() && n < total {
                    tokio::time::sleep(delay_between_tasks).await;
                }
            }

            if let Some(summary) = base.with_session(|s| {
                s.complete();
                s.summary_json()
            }) {
                tracing::info!(%summary, "Session completed");
            }
            results
        }
        .instrument(span)
        .await
    }

    /// 持续轮询任务后端；max_iterations 为 None 时运行至 cancel 被触发（只在轮次之间检查）
    async fn run_continuous(
        &self,
        check_interval: Duration,
        max_iterations: Option<u64>,
        cancel: CancellationToken,
    ) -> Result<(), AgentError> {
        let base = self.base();
        let provider = base.tasks().cloned().ok_or_else(|| {
            AgentError::Configuration("task provider required for continuous operation".into())
        })?;
        let span = base.span().clone();

        async move {
            tracing::info!(?check_interval, "Starting continuous operation");
            let limit = base.settings().pending_task_limit;
            let mut iteration: u64 = 0;

            loop {
                if max_iterations.is_some_and(|max| iteration >= max) || cancel.is_cancelled() {
                    break;
                }

                match provider.get_pending_tasks(base.agent_id(), limit).await {
                    Ok(pending) if pending.is_empty() => tracing::debug!("No pending tasks"),
                    Ok(pending) => {
                        tracing::info!("Found {} pending tasks", pending.len());
                        for task in pending {
                            if let Err(e) = provider
                                .update_task_status(&task.id, TaskStatus::InProgress, None, None)
                                .await
                            {
                                tracing::error!(task_id = %task.id, "Error in continuous loop: {e}");
                                break;
                            }

                            let options = ExecuteOptions::new()
                                .with_task_id(task.id.clone())
                                .with_task_metadata(task.metadata.clone());
                            let update = match self.execute(&task.description, options).await {
                                Ok(result) => {
                                    provider
                                        .update_task_status(&task.id, TaskStatus::Completed, Some(result), None)
                                        .await
                                }
                                Err(e) => {
                                    tracing::error!(task_id = %task.id, "Task failed: {e}");
                                    let context = format!("task_{}", task.id);
                                    base.with_session(|s| s.add_error(&e, Some(&context)));
                                    provider
                                        .update_task_status(&task.id, TaskStatus::Failed, None, Some(e.to_string()))
                                        .await
                                }
                            };
                            if let Err(e) = update {
                                tracing::error!(task_id = %task.id, "Error in continuous loop: {e}");
                                break;
                            }
                        }
                    }
                    Err(e) => tracing::error!("Error in continuous loop: {e}"),
                }

                iteration += 1;
                if max_iterations.is_some_and(|max| iteration >= max) {
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(check_interval) => {}
                }
            }

            tracing::info!(iterations = iteration, "Continuous operation stopped");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
