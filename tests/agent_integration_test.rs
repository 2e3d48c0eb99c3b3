//! Agent 编排端到端测试：会话复用、委派、自治循环、审批等待与任务队列

use std::sync::Arc;
use std::time::Duration;

use hive::archetypes::{ContentConfig, ContentCreatorAgent, GenericAgent};
use hive::core::{
    Agent, AgentSettings, BaseAgent, ExecuteOptions, ReasonParams, SessionStatus, SubagentDefinition,
};
use hive::llm::{MockReasoner, ReasoningError, ReasoningResponse, ToolSpec};
use hive::providers::{Change, InMemoryGovernance, InMemoryTaskProvider, TaskProvider, TaskStatus};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn fast_settings() -> AgentSettings {
    AgentSettings {
        approval_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(10),
        ..AgentSettings::default()
    }
}

fn tool(name: &str) -> ToolSpec {
    ToolSpec::new(name, format!("{name} tool"), json!({"type": "object"}))
}

#[tokio::test]
async fn test_sequential_executes_share_one_session() {
    let agent = GenericAgent::new(BaseAgent::builder(Arc::new(MockReasoner::new())));

    agent.execute("first", ExecuteOptions::new()).await.unwrap();
    let first = agent.base().current_session().unwrap();
    assert_eq!(first.tasks_completed(), 1);

    agent.execute("second", ExecuteOptions::new()).await.unwrap();
    let second = agent.base().current_session().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.tasks_completed(), 2);
}

#[tokio::test]
async fn test_delegation_narrows_tools_to_subagent_declaration() {
    let mock = Arc::new(MockReasoner::new());
    let agent = GenericAgent::new(BaseAgent::builder(mock.clone()));
    agent.base().subagents().register(
        SubagentDefinition::new("writer", "Writes copy", "You write copy.").with_tools(["search"]),
    );

    agent
        .base()
        .subagents()
        .delegate_with(
            "writer",
            ReasonParams::new("draft a post").with_tools(vec![tool("search"), tool("fetch")]),
        )
        .await
        .unwrap();

    let request = mock.last_request().unwrap();
    assert_eq!(request.tool_names(), vec!["search"]);
    assert_eq!(request.system.as_deref(), Some("You write copy."));
}

#[tokio::test]
async fn test_unknown_subagent_leaves_session_untouched() {
    let mock = Arc::new(MockReasoner::new());
    let agent = GenericAgent::new(BaseAgent::builder(mock.clone()));
    agent.execute("warm up", ExecuteOptions::new()).await.unwrap();
    let before = agent.base().current_session().unwrap();

    let err = agent.delegate("ghost", "anything", None).await.unwrap_err();
    assert_eq!(err.kind(), "UnknownSubagentError");

    let after = agent.base().current_session().unwrap();
    assert_eq!(after.summary(), before.summary());
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_autonomous_loop_keeps_order_and_completes_session() {
    let mock = Arc::new(
        MockReasoner::new()
            .with_response(ReasoningResponse::text("one"))
            .with_error(ReasoningError::Timeout)
            .with_response(ReasoningResponse::text("three")),
    );
    let agent = GenericAgent::new(BaseAgent::builder(mock));
    let tasks = vec!["t1".to_string(), "t2".to_string(), "t3".to_string()];

    let outcomes = agent.autonomous_loop(&tasks, Duration::ZERO).await;
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_completed());
    assert!(outcomes[1].error().is_some());
    assert!(outcomes[2].is_completed());

    let session = agent.base().current_session().unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);
    assert!(session.ended_at().is_some());
    assert_eq!(session.tasks_completed(), 2);
    assert!(session
        .errors()
        .iter()
        .any(|e| e.context.as_deref() == Some("task_2")));
}

#[tokio::test]
async fn test_wait_for_approval_sees_external_decision() {
    let governance = Arc::new(InMemoryGovernance::new());
    let agent = GenericAgent::new(
        BaseAgent::builder(Arc::new(MockReasoner::new()))
            .governance(governance.clone())
            .settings(fast_settings()),
    );
    agent.base().ensure_session(None, None);

    let approved = agent
        .base()
        .propose(vec![Change::create("doc", json!({"v": 1}))], 0.9, None)
        .await
        .unwrap();
    let rejected = agent
        .base()
        .propose(vec![Change::create("doc", json!({"v": 2}))], 0.9, None)
        .await
        .unwrap();

    let authority = governance.clone();
    let (approve_id, reject_id) = (approved.proposal.id.clone(), rejected.proposal.id.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        authority.approve(&approve_id).unwrap();
        authority.reject(&reject_id).unwrap();
    });

    assert!(agent.base().wait_for_approval(&approved.proposal.id).await.unwrap());
    assert!(!agent.base().wait_for_approval(&rejected.proposal.id).await.unwrap());
    assert_eq!(agent.base().pending_proposals().len(), 2);
}

#[tokio::test]
async fn test_wait_for_approval_times_out_while_pending() {
    let governance = Arc::new(InMemoryGovernance::new());
    let agent = GenericAgent::new(
        BaseAgent::builder(Arc::new(MockReasoner::new()))
            .governance(governance)
            .settings(AgentSettings {
                approval_timeout: Duration::from_millis(50),
                ..fast_settings()
            }),
    );
    let receipt = agent
        .base()
        .propose(vec![Change::create("doc", json!({}))], 0.5, None)
        .await
        .unwrap();
    assert!(!receipt.auto_approve_eligible);

    let err = agent.base().wait_for_approval(&receipt.proposal.id).await.unwrap_err();
    assert_eq!(err.kind(), "ApprovalTimeoutError");
}

#[tokio::test]
async fn test_content_agent_drains_task_queue() {
    let governance = Arc::new(InMemoryGovernance::new());
    let tasks = Arc::new(InMemoryTaskProvider::new());
    let agent = ContentCreatorAgent::new(
        BaseAgent::builder(Arc::new(MockReasoner::new()))
            .governance(governance.clone())
            .tasks(tasks.clone()),
        ContentConfig::default(),
    );
    let agent_id = agent.base().agent_id().to_string();
    let task = tasks
        .create_task(&agent_id, "Write a tweet about async Rust", None)
        .await
        .unwrap();

    agent
        .run_continuous(Duration::from_millis(1), Some(1), CancellationToken::new())
        .await
        .unwrap();

    let done = tasks.get_task(&task.id).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    let result = done.result.unwrap();
    assert_eq!(result["platform"], "twitter");
    assert_eq!(result["proposals"].as_array().unwrap().len(), 1);
    assert_eq!(governance.pending_ids().len(), 1);

    let session = agent.base().current_session().unwrap();
    assert_eq!(session.task_id.as_deref(), Some(task.id.as_str()));
    assert_eq!(session.proposals_created().len(), 1);
}
