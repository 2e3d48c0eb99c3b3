//! 预置 agent 原型：研究、内容创作、报告与通用
//!
//! 每个原型在构造时注册自己的子代理，并实现 [`Agent::handle`](crate::core::Agent::handle)。

pub mod content;
pub mod generic;
pub mod reporting;
pub mod research;

pub use content::{
    BrandVoiceMode, ContentConfig, ContentCreatorAgent, CreatedContent, RepurposedContent,
    SUPPORTED_PLATFORMS,
};
pub use generic::GenericAgent;
pub use reporting::{format_subagent, DataAnalysis, Report, ReportingAgent, ReportingConfig};
pub use research::{
    DeepDiveReport, MonitorReport, MonitoringFrequency, ResearchAgent, ResearchConfig, Signal,
    SynthesisMode,
};
