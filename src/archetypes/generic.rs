//! 通用 agent：检索记忆后直接推理，不注册子代理

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::{format_contexts, Agent, AgentBuilder, AgentError, BaseAgent, ExecuteOptions, ReasonParams};

pub struct GenericAgent {
    base: BaseAgent,
}

impl GenericAgent {
    pub fn new(builder: AgentBuilder) -> Self {
        Self { base: builder.build() }
    }
}

#[async_trait]
impl Agent for GenericAgent {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    async fn handle(&self, task: &str, _options: &ExecuteOptions) -> Result<Value, AgentError> {
        let contexts = self.base.query_memory(task, 5).await?;
        let response = self
            .reason(ReasonParams::new(task).with_context(format_contexts(&contexts)))
            .await?;
        Ok(json!({
            "response": response.text_content(),
            "proposals": Value::Array(Vec::new()),
        }))
    }
}
