//! 任务队列契约与进程内实现
//!
//! 任务归外部后端所有；核心只读取待办任务并推进状态（in_progress → completed / failed）。

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Metadata, ProviderError, ProviderResult};

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 等待执行
    Pending,
    /// 正在执行
    InProgress,
    /// 已完成
    Completed,
    /// 执行失败
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// 外部任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub agent_id: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub metadata: Metadata,
    /// 执行结果（completed 时）
    pub result: Option<Value>,
    /// 错误信息（failed 时）
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 任务后端 trait
#[async_trait]
pub trait TaskProvider: Send + Sync {
    /// 取某个 agent 的待办任务（到达顺序）
    async fn get_pending_tasks(&self, agent_id: &str, limit: usize) -> ProviderResult<Vec<Task>>;

    /// 推进任务状态，附带结果或错误信息
    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        result: Option<Value>,
        error: Option<String>,
    ) -> ProviderResult<Task>;

    async fn create_task(
        &self,
        agent_id: &str,
        description: &str,
        metadata: Option<Metadata>,
    ) -> ProviderResult<Task>;
}

/// 进程内任务队列：按创建顺序（FIFO）返回
#[derive(Debug, Default)]
pub struct InMemoryTaskProvider {
    tasks: RwLock<HashMap<String, Task>>,
    order: RwLock<Vec<String>>,
}

impl InMemoryTaskProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
            .cloned()
    }

    /// 某 agent 的全部任务（任意状态，创建顺序）
    pub fn tasks_for(&self, agent_id: &str) -> Vec<Task> {
        let tasks = self.tasks.read().unwrap_or_else(PoisonError::into_inner);
        self.order
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|id| tasks.get(id))
            .filter(|t| t.agent_id == agent_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TaskProvider for InMemoryTaskProvider {
    async fn get_pending_tasks(&self, agent_id: &str, limit: usize) -> ProviderResult<Vec<Task>> {
        Ok(self
            .tasks_for(agent_id)
            .into_iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .take(limit)
            .collect())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        result: Option<Value>,
        error: Option<String>,
    ) -> ProviderResult<Task> {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| ProviderError::NotFound(format!("task {task_id}")))?;
        task.status = status;
        if result.is_some() {
            task.result = result;
        }
        if error.is_some() {
            task.error = error;
        }
        task.updated_at = Utc::now();
        tracing::debug!(task_id, status = status.as_str(), "Task status updated");
        Ok(task.clone())
    }

    async fn create_task(
        &self,
        agent_id: &str,
        description: &str,
        metadata: Option<Metadata>,
    ) -> ProviderResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: format!("task_{}", uuid::Uuid::new_v4().simple()),
            agent_id: agent_id.to_string(),
            description: description.to_string(),
            status: TaskStatus::Pending,
            metadata: metadata.unwrap_or_default(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        tracing::info!(task_id = %task.id, agent_id, "Task created");
        self.tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task.id.clone(), task.clone());
        self.order
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task.id.clone());
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_pending_tasks_fifo_per_agent() {
        let provider = InMemoryTaskProvider::new();
        let a = provider.create_task("agent_a", "first", None).await.unwrap();
        provider.create_task("agent_b", "other", None).await.unwrap();
        let c = provider.create_task("agent_a", "second", None).await.unwrap();

        let pending = provider.get_pending_tasks("agent_a", 10).await.unwrap();
        assert_eq!(pending.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec![a.id.as_str(), c.id.as_str()]);

        let limited = provider.get_pending_tasks("agent_a", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].description, "first");
    }

    #[tokio::test]
    async fn test_update_status_carries_result_and_error() {
        let provider = InMemoryTaskProvider::new();
        let t = provider.create_task("a", "do it", None).await.unwrap();
        assert!(t.id.starts_with("task_"));

        provider
            .update_task_status(&t.id, TaskStatus::InProgress, None, None)
            .await
            .unwrap();
        assert!(provider.get_pending_tasks("a", 10).await.unwrap().is_empty());

        let done = provider
            .update_task_status(&t.id, TaskStatus::Completed, Some(json!({"ok": true})), None)
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result, Some(json!({"ok": true})));

        let err = provider
            .update_task_status("task_missing", TaskStatus::Failed, None, Some("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(TaskStatus::InProgress).unwrap(), json!("in_progress"));
    }
}
