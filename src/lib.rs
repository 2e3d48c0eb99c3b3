//! hive - 可插拔后端的智能体编排核心
//!
//! 模块划分：
//! - **archetypes**: 预置 agent（研究 / 内容 / 报告 / 通用）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 会话状态机、子代理委派、Agent 执行循环
//! - **llm**: 推理后端抽象与实现（Anthropic / Mock）
//! - **observability**: tracing 初始化
//! - **providers**: 记忆、治理审批、任务后端契约与进程内实现

pub mod archetypes;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod providers;

pub use crate::core::{Agent, AgentBuilder, AgentError, BaseAgent};
