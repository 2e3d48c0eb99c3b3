//! hive - 智能体编排命令行入口
//!
//! 用法：`hive [--config PATH] [--continuous] [--iterations N] <task>...`
//! 默认依次执行命令行任务并输出 JSON；`--continuous` 时任务进入内存任务队列，由 run_continuous 消费直到 Ctrl+C。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use hive::archetypes::{
    ContentConfig, ContentCreatorAgent, GenericAgent, ReportingAgent, ReportingConfig, ResearchAgent,
    ResearchConfig,
};
use hive::config::{create_reasoner_from_config, load_config, AppConfig};
use hive::core::{Agent, BaseAgent};
use hive::providers::{InMemoryGovernance, InMemoryProvider, InMemoryTaskProvider, TaskProvider};
use tokio_util::sync::CancellationToken;

/// 按配置的 agent 类型执行命令行任务
#[derive(Parser, Debug)]
#[command(name = "hive", version, about = "Provider-pluggable agent orchestration")]
struct Args {
    /// Path to config file (layered over config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Queue the tasks and poll them with run_continuous until Ctrl+C
    #[arg(long)]
    continuous: bool,

    /// Stop continuous mode after this many polling iterations
    #[arg(long, requires = "continuous")]
    iterations: Option<u64>,

    /// Task descriptions, executed in order
    tasks: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let args = Args::parse();
    let cfg = load_config(args.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let reasoner = create_reasoner_from_config(&cfg).context("Failed to create reasoner")?;

    let tasks = Arc::new(InMemoryTaskProvider::new());
    let mut builder = BaseAgent::builder(reasoner)
        .agent_type(cfg.agent.agent_type.clone())
        .settings(cfg.to_agent_settings())
        .memory(Arc::new(InMemoryProvider::new()))
        .governance(Arc::new(InMemoryGovernance::new()))
        .tasks(tasks.clone());
    if let Some(name) = &cfg.agent.agent_name {
        builder = builder.agent_name(name.clone());
    }

    match cfg.agent.agent_type.as_str() {
        "research" => run(ResearchAgent::new(builder, ResearchConfig::default()), &cfg, &args, &tasks).await,
        "content" => run(ContentCreatorAgent::new(builder, ContentConfig::default()), &cfg, &args, &tasks).await,
        "reporting" => run(ReportingAgent::new(builder, ReportingConfig::default()), &cfg, &args, &tasks).await,
        "generic" => run(GenericAgent::new(builder), &cfg, &args, &tasks).await,
        other => bail!("Unknown agent type: {other}"),
    }
}

async fn run<A: Agent>(
    agent: A,
    cfg: &AppConfig,
    args: &Args,
    tasks: &InMemoryTaskProvider,
) -> anyhow::Result<()> {
    if !args.continuous {
        let outcomes = agent.autonomous_loop(&args.tasks, cfg.delay_between_tasks()).await;
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    for task in &args.tasks {
        tasks.create_task(agent.base().agent_id(), task, None).await?;
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, stopping");
            on_signal.cancel();
        }
    });

    agent
        .run_continuous(cfg.check_interval(), args.iterations, cancel)
        .await
        .context("Continuous run failed")?;

    for task in tasks.tasks_for(agent.base().agent_id()) {
        println!("{}", serde_json::to_string_pretty(&task)?);
    }
    if let Some(session) = agent.base().current_session() {
        println!("{}", serde_json::to_string_pretty(&session.summary())?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_to_autonomous_loop() {
        let args = Args::try_parse_from(["hive", "first task", "second task"]).unwrap();
        assert!(!args.continuous);
        assert!(args.config.is_none());
        assert_eq!(args.tasks, vec!["first task", "second task"]);
    }

    #[test]
    fn test_args_continuous_with_iterations() {
        let args = Args::try_parse_from([
            "hive", "--config", "hive.toml", "--continuous", "--iterations", "3", "task",
        ])
        .unwrap();
        assert!(args.continuous);
        assert_eq!(args.iterations, Some(3));
        assert_eq!(args.config, Some(PathBuf::from("hive.toml")));
    }

    #[test]
    fn test_args_reject_bad_input() {
        assert!(Args::try_parse_from(["hive", "--iterations", "x", "--continuous"]).is_err());
        assert!(Args::try_parse_from(["hive", "--iterations", "2"]).is_err());
        assert!(Args::try_parse_from(["hive", "--unknown"]).is_err());
    }
}
