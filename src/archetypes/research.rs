//! 研究型 agent：持续监控 + 按需深度研究
//!
//! 监控按领域路由到 web_monitor / competitor_tracker / social_listener，再由 analyst 综合；
//! 深度研究直接推理。两条路径在配置了治理后端时都会把结论作为提案提交。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{
    format_contexts, Agent, AgentBuilder, AgentError, BaseAgent, ExecuteOptions, ReasonParams,
    SubagentDefinition,
};
use crate::llm::ReasoningResponse;
use crate::providers::{Change, Metadata};

const MONITOR_KEYWORDS: [&str; 4] = ["monitor", "track", "watch", "scan"];
const WEB_TOOLS: [&str; 2] = ["web_search", "web_fetch"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringFrequency {
    Hourly,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisMode {
    Summary,
    Detailed,
    Insights,
}

impl SynthesisMode {
    fn as_str(&self) -> &'static str {
        match self {
            SynthesisMode::Summary => "summary",
            SynthesisMode::Detailed => "detailed",
            SynthesisMode::Insights => "insights",
        }
    }
}

/// 研究 agent 配置
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    pub monitoring_domains: Vec<String>,
    pub monitoring_frequency: MonitoringFrequency,
    /// 信号重要性阈值（进入 system prompt）
    pub signal_threshold: f64,
    pub synthesis_mode: SynthesisMode,
    /// 同时进行的领域监控数；1 = 逐个顺序委派
    pub monitor_concurrency: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            monitoring_domains: vec!["general".to_string()],
            monitoring_frequency: MonitoringFrequency::Daily,
            signal_threshold: 0.7,
            synthesis_mode: SynthesisMode::Insights,
            monitor_concurrency: 1,
        }
    }
}

/// 单个领域的监控结果；失败时只有 error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subagent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub timestamp: DateTime<Utc>,
    pub domains: Vec<String>,
    pub signals: Vec<Signal>,
    pub insights: Option<String>,
    pub proposals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepDiveReport {
    pub topic: String,
    pub timestamp: DateTime<Utc>,
    pub findings: String,
    pub proposals: Vec<String>,
}

pub struct ResearchAgent {
    base: BaseAgent,
    config: ResearchConfig,
}

impl ResearchAgent {
    pub fn new(builder: AgentBuilder, config: ResearchConfig) -> Self {
        let base = builder.agent_type("research").build();
        let mut config = config;
        if config.monitoring_domains.is_empty() {
            config.monitoring_domains = ResearchConfig::default().monitoring_domains;
        }
        config.monitor_concurrency = config.monitor_concurrency.max(1);

        let agent = Self { base, config };
        agent.register_subagents();
        tracing::info!(
            parent: agent.base.span(),
            domains = ?agent.config.monitoring_domains,
            frequency = ?agent.config.monitoring_frequency,
            "Research Agent initialized"
        );
        agent
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    fn register_subagents(&self) {
        self.base.subagents().register_many([
            SubagentDefinition::new(
                "web_monitor",
                "Monitor websites, blogs, and news sources for updates and changes",
                "You are a web monitoring specialist.\n\n\
                 Your job: Scrape websites, detect changes, extract key updates.\n\
                 Focus on: What's NEW since last check? What CHANGED?\n\n\
                 Return the changes detected, an importance score (0.0-1.0) and a summary of updates.",
            )
            .with_tools(WEB_TOOLS)
            .with_metadata(type_meta("monitor")),
            SubagentDefinition::new(
                "competitor_tracker",
                "Track competitor activity - products, pricing, messaging, strategic moves",
                "You are a competitive intelligence analyst.\n\n\
                 Your job: Monitor competitor activity across multiple channels.\n\
                 Focus on: Strategic moves, product changes, market positioning.\n\n\
                 Return competitor actions detected, strategic implications and a threat/opportunity assessment.",
            )
            .with_tools(WEB_TOOLS)
            .with_metadata(type_meta("monitor")),
            SubagentDefinition::new(
                "social_listener",
                "Monitor social media, communities, and forums for signals and sentiment",
                "You are a social listening specialist.\n\n\
                 Your job: Track mentions, sentiment, and emerging discussions.\n\
                 Focus on: Community sentiment, trending topics, viral content.\n\n\
                 Return social signals detected, sentiment analysis, trending topics and notable mentions.",
            )
            .with_tools(WEB_TOOLS)
            .with_metadata(type_meta("monitor")),
            SubagentDefinition::new(
                "analyst",
                "Synthesize research findings into actionable insights",
                "You are a research analyst and synthesizer.\n\n\
                 Your job: Transform raw data into actionable insights.\n\
                 Focus on: Patterns, trends, implications, recommendations.\n\n\
                 Output: clear, concise, prioritized by importance and recommendation-oriented.",
            )
            .with_metadata(type_meta("analyst")),
        ]);
    }

    /// 领域 → (子代理, 子任务)
    fn route_domain(domain: &str) -> (&'static str, String) {
        if domain.contains("competitor") {
            ("competitor_tracker", format!("Monitor competitors in {domain}"))
        } else if domain == "social" || domain.contains("trends") {
            ("social_listener", format!("Monitor social signals for {domain}"))
        } else {
            ("web_monitor", format!("Monitor web sources for {domain}"))
        }
    }

    /// 对全部领域做一次监控扫描
    pub async fn monitor(&self) -> Result<MonitorReport, AgentError> {
        tracing::info!(
            parent: self.base.span(),
            domains = ?self.config.monitoring_domains,
            "Starting monitoring scan"
        );

        let jobs: Vec<(String, &'static str, String)> = self
            .config
            .monitoring_domains
            .iter()
            .map(|domain| {
                let (subagent, task) = Self::route_domain(domain);
                (domain.clone(), subagent, task)
            })
            .collect();

        let pending: Vec<_> = jobs
            .into_iter()
            .map(|(domain, subagent, task)| self.monitor_domain(domain, subagent, task))
            .collect();
        // buffered 保持输入顺序
        let signals: Vec<Signal> = stream::iter(pending)
            .buffered(self.config.monitor_concurrency)
            .collect()
            .await;

        let mut report = MonitorReport {
            timestamp: Utc::now(),
            domains: self.config.monitoring_domains.clone(),
            signals,
            insights: None,
            proposals: Vec::new(),
        };

        if !report.signals.is_empty() {
            let synthesis_task = format!(
                "Analyze these monitoring findings and provide {} insights",
                self.config.synthesis_mode.as_str()
            );
            let synthesis_context = serde_json::to_string(&report.signals)
                .map_err(|e| AgentError::Execution(e.to_string()))?;
            let insights = self
                .base
                .subagents()
                .delegate("analyst", &synthesis_task, Some(&synthesis_context))
                .await?
                .text_content();

            if self.base.governance().is_some() && !insights.is_empty() {
                report.proposals.push(self.propose_insights(&insights, None).await?);
            }
            report.insights = Some(insights);
        }

        tracing::info!(
            parent: self.base.span(),
            "Monitoring complete - {} signals detected",
            report.signals.len()
        );
        Ok(report)
    }

    async fn monitor_domain(&self, domain: String, subagent: &'static str, task: String) -> Signal {
        let outcome: Result<ReasoningResponse, AgentError> = async {
            let context = format_contexts(&self.base.query_memory(&task, 5).await?);
            let context = (!context.is_empty()).then_some(context);
            self.base
                .subagents()
                .delegate(subagent, &task, context.as_deref())
                .await
        }
        .await;

        match outcome {
            Ok(response) => Signal {
                domain,
                subagent: Some(subagent.to_string()),
                result: Some(response.text_content()),
                error: None,
            },
            Err(e) => {
                tracing::error!(parent: self.base.span(), "Monitoring failed for {domain}: {e}");
                Signal {
                    domain,
                    subagent: None,
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// 对单个主题做深度研究
    pub async fn deep_dive(&self, topic: &str) -> Result<DeepDiveReport, AgentError> {
        tracing::info!(parent: self.base.span(), topic, "Starting deep-dive research");

        let context = format_contexts(&self.base.query_memory(topic, 10).await?);
        let research_prompt = format!(
            "Conduct comprehensive research on: {topic}\n\n\
             **Existing Knowledge:**\n{}\n\n\
             **Research Objectives:**\n\
             1. Provide comprehensive overview\n\
             2. Identify key trends and patterns\n\
             3. Analyze implications\n\
             4. Generate actionable insights\n\n\
             Please conduct thorough research and synthesis.",
            if context.is_empty() { "No prior context available" } else { context.as_str() }
        );

        let findings = self
            .reason(
                ReasonParams::new(research_prompt)
                    .with_context(context)
                    .with_max_tokens(8000),
            )
            .await?
            .text_content();

        let mut proposals = Vec::new();
        if self.base.governance().is_some() {
            proposals.push(self.propose_insights(&findings, Some(topic)).await?);
        }

        tracing::info!(parent: self.base.span(), topic, "Deep-dive research complete");
        Ok(DeepDiveReport {
            topic: topic.to_string(),
            timestamp: Utc::now(),
            findings,
            proposals,
        })
    }

    async fn propose_insights(&self, insights: &str, topic: Option<&str>) -> Result<String, AgentError> {
        let reasoning = match topic {
            Some(t) => format!("Store research insights for {t}"),
            None => "Store research insights".to_string(),
        };
        let change = Change::create("research_insights", json!({ "insights": insights, "topic": topic }))
            .with_reasoning(reasoning);
        let receipt = self
            .base
            .propose(vec![change], 0.8, Some("Research findings for memory storage".into()))
            .await?;
        Ok(receipt.proposal.id)
    }
}

fn type_meta(kind: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("type".into(), json!(kind));
    meta
}

fn is_monitor_task(task: &str) -> bool {
    let lower = task.to_lowercase();
    MONITOR_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[async_trait]
impl Agent for ResearchAgent {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    async fn handle(&self, task: &str, _options: &ExecuteOptions) -> Result<Value, AgentError> {
        let report = if is_monitor_task(task) {
            serde_json::to_value(self.monitor().await?)
        } else {
            serde_json::to_value(self.deep_dive(task).await?)
        };
        report.map_err(|e| AgentError::Execution(e.to_string()))
    }

    fn default_system_prompt(&self) -> Option<String> {
        let status = |configured: bool| if configured { "Available" } else { "Not configured" };
        let mut prompt = format!(
            "You are an autonomous Research Agent specializing in intelligence gathering and analysis.\n\n\
             **Your Mission:**\n\
             Keep users informed about their markets, competitors, and topics of interest through \
             continuous monitoring, deep-dive research, signal detection and insight synthesis.\n\n\
             **Your Capabilities:**\n\
             - Memory: {}\n\
             - Governance: {}\n\
             - Monitoring Domains: {}\n\
             - Monitoring Frequency: {:?}\n\
             - Signal Threshold: {}\n\n\
             **Research Approach:**\n\
             1. Query existing knowledge first (avoid redundant research)\n\
             2. Identify knowledge gaps\n\
             3. Conduct targeted research\n\
             4. Synthesize insights (not just data)\n\
             5. Propose findings to memory (via governance)\n",
            status(self.base.memory().is_some()),
            status(self.base.governance().is_some()),
            self.config.monitoring_domains.join(", "),
            self.config.monitoring_frequency,
            self.config.signal_threshold,
        );
        let catalogue = self.base.subagents().delegation_prompt();
        if !catalogue.is_empty() {
            prompt.push('\n');
            prompt.push_str(&catalogue);
        }
        Some(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockReasoner, ReasoningError};
    use crate::providers::{InMemoryGovernance, InMemoryProvider};
    use std::sync::Arc;

    fn research_agent(mock: &Arc<MockReasoner>, domains: &[&str], facts: &[&str]) -> ResearchAgent {
        let memory = Arc::new(InMemoryProvider::new());
        for fact in facts {
            memory.add(*fact, None);
        }
        ResearchAgent::new(
            BaseAgent::builder(mock.clone())
                .memory(memory)
                .governance(Arc::new(InMemoryGovernance::new())),
            ResearchConfig {
                monitoring_domains: domains.iter().map(|d| d.to_string()).collect(),
                ..ResearchConfig::default()
            },
        )
    }

    #[test]
    fn test_route_domain() {
        assert_eq!(ResearchAgent::route_domain("competitors").0, "competitor_tracker");
        assert_eq!(ResearchAgent::route_domain("market_trends").0, "social_listener");
        assert_eq!(ResearchAgent::route_domain("social").0, "social_listener");
        assert_eq!(ResearchAgent::route_domain("general").0, "web_monitor");
        assert!(is_monitor_task("Please SCAN the news"));
        assert!(!is_monitor_task("AI agent market landscape"));
    }

    #[tokio::test]
    async fn test_monitor_delegates_in_domain_order_then_synthesises() {
        let mock = Arc::new(MockReasoner::new());
        let agent = research_agent(
            &mock,
            &["competitors", "market_trends", "general"],
            &["Competitors raised prices last quarter"],
        );

        let value = agent.execute("monitor the market", ExecuteOptions::new()).await.unwrap();
        let report: MonitorReport = serde_json::from_value(value).unwrap();
        assert_eq!(report.signals.len(), 3);
        assert_eq!(report.signals[0].subagent.as_deref(), Some("competitor_tracker"));
        assert_eq!(report.signals[2].subagent.as_deref(), Some("web_monitor"));
        assert!(report.insights.is_some());
        assert_eq!(report.proposals.len(), 1);

        let requests = mock.requests();
        assert_eq!(requests.len(), 4);
        // 竞品监控带上记忆上下文
        assert!(requests[0].messages[0].content.contains("Competitors raised"));
        assert!(requests[0].system.as_deref().unwrap().contains("competitive intelligence"));
        assert!(requests[3].system.as_deref().unwrap().contains("research analyst"));
        assert_eq!(agent.base().pending_proposals(), report.proposals);
    }

    #[tokio::test]
    async fn test_monitor_records_domain_failure_as_signal() {
        let mock = Arc::new(
            MockReasoner::new()
                .with_error(ReasoningError::Timeout)
                .with_response(ReasoningResponse::text("web ok"))
                .with_response(ReasoningResponse::text("synthesis")),
        );
        let agent = research_agent(&mock, &["general", "blogs"], &[]);
        let report = agent.monitor().await.unwrap();
        assert!(report.signals[0].error.is_some());
        assert_eq!(report.signals[1].result.as_deref(), Some("web ok"));
        assert_eq!(report.insights.as_deref(), Some("synthesis"));
    }

    #[tokio::test]
    async fn test_concurrent_monitoring_keeps_order() {
        let mock = Arc::new(MockReasoner::new());
        let memory = Arc::new(InMemoryProvider::new());
        let agent = ResearchAgent::new(
            BaseAgent::builder(mock.clone()).memory(memory),
            ResearchConfig {
                monitoring_domains: vec!["a".into(), "b".into(), "c".into()],
                monitor_concurrency: 3,
                ..ResearchConfig::default()
            },
        );
        let report = agent.monitor().await.unwrap();
        let domains: Vec<&str> = report.signals.iter().map(|s| s.domain.as_str()).collect();
        assert_eq!(domains, vec!["a", "b", "c"]);
        // 无治理后端时不提交提案
        assert!(report.proposals.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_monitoring_runs_on_spawned_task() {
        let mock = Arc::new(MockReasoner::new());
        let agent = ResearchAgent::new(
            BaseAgent::builder(mock.clone()).memory(Arc::new(InMemoryProvider::new())),
            ResearchConfig {
                monitoring_domains: vec!["competitors".into(), "social".into(), "news".into()],
                monitor_concurrency: 2,
                ..ResearchConfig::default()
            },
        );

        let value = tokio::spawn(async move { agent.execute("scan everything", ExecuteOptions::new()).await })
            .await
            .unwrap()
            .unwrap();
        let report: MonitorReport = serde_json::from_value(value).unwrap();
        let routed: Vec<_> = report.signals.iter().map(|s| s.subagent.as_deref()).collect();
        assert_eq!(
            routed,
            vec![Some("competitor_tracker"), Some("social_listener"), Some("web_monitor")]
        );
        assert_eq!(mock.call_count(), 4);
    }

    #[tokio::test]
    async fn test_deep_dive_uses_long_budget_and_proposes() {
        let mock = Arc::new(MockReasoner::new().with_response(ReasoningResponse::text("findings")));
        let agent = research_agent(&mock, &[], &[]);
        assert_eq!(agent.config().monitoring_domains, vec!["general"]);

        let value = agent.execute("AI agent market landscape", ExecuteOptions::new()).await.unwrap();
        assert_eq!(value["findings"], "findings");
        assert_eq!(value["proposals"].as_array().unwrap().len(), 1);

        let req = mock.last_request().unwrap();
        assert_eq!(req.max_tokens, 8000);
        assert!(req.system.unwrap().contains("Research Agent"));
        assert!(req.messages.last().unwrap().content.contains("No prior context available"));
    }
}
