//! 子代理注册表与委派协议
//!
//! 子代理是命名的提示词 / 工具配置；委派时复用父 agent 的推理能力：
//! 替换 system prompt，可选覆盖模型，并把调用方给出的工具按子代理声明的集合做交集（只收窄不扩张）。
//! 注册表只持有父 agent 推理核心的 Weak 引用，不参与其所有权。

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::Instrument;

use crate::llm::{ReasoningResponse, ToolSpec};
use crate::providers::Metadata;

use super::agent::{AgentCore, ReasonParams};
use super::error::AgentError;

/// 委派工具名（出现在目录提示词与工具声明中）
pub const DELEGATION_TOOL_NAME: &str = "delegate_to_subagent";

/// 子代理定义；注册后不可变，name 为路由键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubagentDefinition {
    pub name: String,
    /// 何时使用该子代理（进入委派目录）
    pub description: String,
    pub system_prompt: String,
    /// None = 继承调用方全部工具；Some(空集) = 不给任何工具
    pub tools: Option<BTreeSet<String>>,
    /// 模型覆盖；None 时沿用父 agent 的模型
    pub model: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SubagentDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            tools: None,
            model: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// 按名称精确匹配收窄调用方工具
    pub fn filter_tools(&self, tools: Option<Vec<ToolSpec>>) -> Option<Vec<ToolSpec>> {
        match &self.tools {
            None => tools,
            Some(allowed) => Some(
                tools
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|t| allowed.contains(&t.name))
                    .collect(),
            ),
        }
    }
}

/// 委派完成（成功或失败）后同步调用的观察者；返回 Err 只会被记录，不影响委派结果
pub trait DelegationHook: Send + Sync {
    fn on_delegation(
        &self,
        subagent_name: &str,
        task: &str,
        result: &Result<ReasoningResponse, AgentError>,
    ) -> anyhow::Result<()>;
}

impl<F> DelegationHook for F
where
    F: Fn(&str, &str, &Result<ReasoningResponse, AgentError>) -> anyhow::Result<()> + Send + Sync,
{
    fn on_delegation(
        &self,
        subagent_name: &str,
        task: &str,
        result: &Result<ReasoningResponse, AgentError>,
    ) -> anyhow::Result<()> {
        self(subagent_name, task, result)
    }
}

/// 子代理注册表：按注册顺序保存定义，重名覆盖且保留原位置
pub struct SubagentRegistry {
    parent: Weak<AgentCore>,
    subagents: RwLock<Vec<SubagentDefinition>>,
    hooks: RwLock<Vec<Arc<dyn DelegationHook>>>,
}

impl SubagentRegistry {
    pub(crate) fn new(parent: Weak<AgentCore>) -> Self {
        Self {
            parent,
            subagents: RwLock::new(Vec::new()),
            hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, definition: SubagentDefinition) {
        let mut subagents = self.subagents.write().unwrap_or_else(PoisonError::into_inner);
        match subagents.iter_mut().find(|d| d.name == definition.name) {
            Some(existing) => {
                tracing::debug!(subagent = %definition.name, "Subagent definition replaced");
                *existing = definition;
            }
            None => {
                tracing::debug!(subagent = %definition.name, "Subagent registered");
                subagents.push(definition);
            }
        }
    }

    pub fn register_many(&self, definitions: impl IntoIterator<Item = SubagentDefinition>) {
        for definition in definitions {
            self.register(definition);
        }
    }

    pub fn get(&self, name: &str) -> Option<SubagentDefinition> {
        self.read().iter().find(|d| d.name == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|d| d.name == name)
    }

    /// 快照（非实时视图）
    pub fn list_subagents(&self) -> Vec<SubagentDefinition> {
        self.read().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn add_delegation_hook(&self, hook: impl DelegationHook + 'static) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// 委派目录（按注册顺序）；未注册任何子代理时返回空串
    pub fn delegation_prompt(&self) -> String {
        let subagents = self.read();
        if subagents.is_empty() {
            return String::new();
        }

        let mut prompt = String::from(
            "## Available Subagents\n\nYou can delegate tasks to specialized subagents:\n",
        );
        for definition in subagents.iter() {
            prompt.push_str(&format!("\n### {}\n{}\n", definition.name, definition.description));
        }
        prompt.push_str(&format!(
            "\nTo delegate to a subagent, use the {DELEGATION_TOOL_NAME} tool."
        ));
        prompt
    }

    /// 以默认参数委派
    pub async fn delegate(
        &self,
        subagent_name: &str,
        task: &str,
        context: Option<&str>,
    ) -> Result<ReasoningResponse, AgentError> {
        let mut params = ReasonParams::new(task);
        if let Some(ctx) = context {
            params = params.with_context(ctx);
        }
        self.delegate_with(subagent_name, params).await
    }

    /// 委派：params 中的 system_prompt 被子代理的替换，tools 按子代理声明收窄
    pub async fn delegate_with(
        &self,
        subagent_name: &str,
        params: ReasonParams,
    ) -> Result<ReasoningResponse, AgentError> {
        let subagent = self
            .get(subagent_name)
            .ok_or_else(|| AgentError::UnknownSubagent(subagent_name.to_string()))?;
        let core = self.parent.upgrade().ok_or_else(|| {
            AgentError::Configuration("parent agent dropped before delegation".to_string())
        })?;

        let span = core.span().clone();
        async move {
            tracing::info!(
                subagent = subagent_name,
                task = %preview(&params.task, 50),
                "Delegating to subagent"
            );

            let task = params.task.clone();
            let model = subagent.model.clone().or(params.model);
            let params = ReasonParams {
                system_prompt: Some(subagent.system_prompt.clone()),
                tools: subagent.filter_tools(params.tools),
                model,
                ..params
            };

            let result = core.reason(params, None).await;
            self.run_hooks(subagent_name, &task, &result);
            result
        }
        .instrument(span)
        .await
    }

    fn run_hooks(&self, subagent_name: &str, task: &str, result: &Result<ReasoningResponse, AgentError>) {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner).clone();
        for hook in hooks {
            if let Err(e) = hook.on_delegation(subagent_name, task, result) {
                tracing::warn!(subagent = subagent_name, "Delegation hook failed: {e:#}");
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<SubagentDefinition>> {
        self.subagents.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 供主 agent 调用的委派工具声明；subagent_name 限定为已注册名称
pub fn delegation_tool(registry: &SubagentRegistry) -> ToolSpec {
    ToolSpec::new(
        DELEGATION_TOOL_NAME,
        "Delegate a specialized task to a subagent.\n\n\
         Use this when you encounter a task that matches a subagent's expertise.\n\
         Each subagent is optimized for specific types of work.",
        json!({
            "type": "object",
            "properties": {
                "subagent_name": {
                    "type": "string",
                    "description": "Name of the subagent to delegate to",
                    "enum": registry.names(),
                },
                "task": {
                    "type": "string",
                    "description": "Clear description of the task for the subagent",
                },
                "context": {
                    "type": "string",
                    "description": "Additional context the subagent needs",
                },
            },
            "required": ["subagent_name", "task"],
        }),
    )
}

pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
