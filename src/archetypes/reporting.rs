//! 报告型 agent：把数据整理为 xlsx / pptx / pdf 报告规格
//!
//! 有数据时先由 data_analyst 分析，再按格式委派给对应专家子代理；
//! 品牌规范与模板进入简报，生成的规格作为提案提交审批。

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{Agent, AgentBuilder, AgentError, BaseAgent, ExecuteOptions, SubagentDefinition};
use crate::providers::{Change, Metadata};

/// 数据摘要的最大字符数
const DATA_SUMMARY_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportingConfig {
    /// 格式 → 模板路径
    pub template_library: BTreeMap<String, String>,
    pub brand_guidelines: BTreeMap<String, String>,
    /// 第一个为默认格式
    pub default_formats: Vec<String>,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            template_library: BTreeMap::new(),
            brand_guidelines: BTreeMap::new(),
            default_formats: vec!["pdf".to_string(), "xlsx".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAnalysis {
    pub insights: String,
    pub data_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_type: String,
    pub format: String,
    pub specification: String,
    pub analysis: Option<DataAnalysis>,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub proposals: Vec<String>,
}

pub struct ReportingAgent {
    base: BaseAgent,
    config: ReportingConfig,
}

/// 格式 → 负责的子代理；未知格式交给 report_writer
pub fn format_subagent(format: &str) -> &'static str {
    match format {
        "xlsx" => "excel_specialist",
        "pptx" => "presentation_designer",
        _ => "report_writer",
    }
}

impl ReportingAgent {
    pub fn new(builder: AgentBuilder, config: ReportingConfig) -> Self {
        let base = builder.agent_type("reporting").build();
        let mut config = config;
        if config.default_formats.is_empty() {
            config.default_formats = ReportingConfig::default().default_formats;
        }

        let agent = Self { base, config };
        agent.register_subagents();
        tracing::info!(
            parent: agent.base.span(),
            "Reporting Agent initialized - Formats: {}",
            agent.config.default_formats.join(", ")
        );
        agent
    }

    pub fn config(&self) -> &ReportingConfig {
        &self.config
    }

    fn register_subagents(&self) {
        let specialist = |format: &str| -> Metadata {
            [("format", json!(format)), ("type", json!("specialist"))]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect()
        };
        let mut analyst_meta = Metadata::new();
        analyst_meta.insert("type".into(), json!("analyst"));

        self.base.subagents().register_many([
            SubagentDefinition::new(
                "excel_specialist",
                "Create Excel spreadsheets with formulas, charts, and pivot tables",
                "You are an Excel specialist focused on professional spreadsheet creation.\n\n\
                 Structure workbooks as summary, data, analysis and chart sheets.\n\n\
                 Provide a detailed specification: sheet structure, key formulas, chart specifications, \
                 formatting guidelines and data validation rules.",
            )
            .with_metadata(specialist("xlsx")),
            SubagentDefinition::new(
                "presentation_designer",
                "Design PowerPoint presentations with professional layouts",
                "You are a presentation design specialist.\n\n\
                 One idea per slide, 3-5 bullets max, data-driven visuals.\n\n\
                 For each slide specify number and title, layout type, content, visual elements and design notes.",
            )
            .with_metadata(specialist("pptx")),
            SubagentDefinition::new(
                "report_writer",
                "Write professional PDF reports and executive summaries",
                "You are a professional report writer.\n\n\
                 Reports carry a cover page, executive summary, main sections, recommendations and appendices.\n\n\
                 Provide the report in Markdown with clear headings, data tables and chart placeholders.",
            )
            .with_metadata(specialist("pdf")),
            SubagentDefinition::new(
                "data_analyst",
                "Analyze data, identify patterns, generate insights",
                "You are a data analyst focused on extracting insights.\n\n\
                 Output an executive summary, data overview, findings, insights and recommendations, \
                 with data-backed conclusions.",
            )
            .with_metadata(analyst_meta),
        ]);
    }

    /// 生成指定类型与格式的报告规格
    pub async fn generate(
        &self,
        report_type: &str,
        format: &str,
        data: Option<&Value>,
        task_description: Option<&str>,
    ) -> Result<Report, AgentError> {
        tracing::info!(parent: self.base.span(), "Generating {report_type} report in {format} format");

        let analysis = match data.filter(|d| !d.is_null()) {
            Some(data) => Some(self.analyze_data(data, report_type).await?),
            None => None,
        };

        let style_context = self.style_context(format).await?;
        let brief = self.build_brief(report_type, format, analysis.as_ref(), task_description);
        let specification = self
            .base
            .subagents()
            .delegate(format_subagent(format), &brief, style_context.as_deref())
            .await?
            .text_content();

        let mut report = Report {
            report_type: report_type.to_string(),
            format: format.to_string(),
            specification,
            analysis,
            timestamp: Utc::now(),
            status: "pending_approval".to_string(),
            proposals: Vec::new(),
        };

        if self.base.governance().is_some() {
            let change = Change::create(
                format,
                json!({
                    "report_type": report.report_type,
                    "format": report.format,
                    "specification": report.specification,
                    "analysis": report.analysis,
                }),
            )
            .with_reasoning(format!("Generated {report_type} report"));
            let receipt = self
                .base
                .propose(vec![change], 0.8, Some(format!("Report specification for {report_type}")))
                .await?;
            report.proposals.push(receipt.proposal.id);
        }

        tracing::info!(parent: self.base.span(), "Report generated: {report_type} ({format})");
        Ok(report)
    }

    async fn analyze_data(&self, data: &Value, report_type: &str) -> Result<DataAnalysis, AgentError> {
        tracing::info!(parent: self.base.span(), "Analyzing data");
        let rendered = match data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let task = format!("Analyze this data for {report_type} report:\n\n{rendered}");
        let insights = self
            .base
            .subagents()
            .delegate("data_analyst", &task, None)
            .await?
            .text_content();
        Ok(DataAnalysis {
            insights,
            data_summary: rendered.chars().take(DATA_SUMMARY_CHARS).collect(),
        })
    }

    async fn style_context(&self, format: &str) -> Result<Option<String>, AgentError> {
        let examples = self
            .base
            .query_memory(&format!("{format} template examples approved"), 3)
            .await?;
        if examples.is_empty() {
            return Ok(None);
        }
        let joined = examples
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Some(format!("Style guidelines for {format}:\n{joined}")))
    }

    fn build_brief(
        &self,
        report_type: &str,
        format: &str,
        analysis: Option<&DataAnalysis>,
        task_description: Option<&str>,
    ) -> String {
        let mut brief = format!("Create a {report_type} report in {format} format.\n\n");
        if let Some(description) = task_description.filter(|d| !d.is_empty()) {
            brief.push_str(&format!("**Context:** {description}\n\n"));
        }
        if let Some(analysis) = analysis {
            brief.push_str(&format!("**Data Analysis:**\n{}\n\n", analysis.insights));
        }
        if let Some(template) = self.config.template_library.get(format) {
            brief.push_str(&format!("**Template:** Use style from {template}\n\n"));
        }
        if !self.config.brand_guidelines.is_empty() {
            brief.push_str("**Brand Guidelines:**\n");
            for (key, value) in &self.config.brand_guidelines {
                brief.push_str(&format!("- {key}: {value}\n"));
            }
            brief.push('\n');
        }
        brief.push_str("Provide detailed specification for this report.");
        brief
    }
}

#[async_trait]
impl Agent for ReportingAgent {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    async fn handle(&self, task: &str, options: &ExecuteOptions) -> Result<Value, AgentError> {
        let report_type = options.param_str("report_type").unwrap_or("general");
        let format = options
            .param_str("format")
            .unwrap_or(self.config.default_formats[0].as_str());
        let report = self
            .generate(report_type, format, options.param("data"), Some(task))
            .await?;
        serde_json::to_value(report).map_err(|e| AgentError::Execution(e.to_string()))
    }

    fn default_system_prompt(&self) -> Option<String> {
        let status = |configured: bool| if configured { "Available" } else { "Not configured" };
        let mut prompt = format!(
            "You are an autonomous Reporting Agent specializing in professional document generation.\n\n\
             **Your Capabilities:**\n\
             - Memory: {}\n\
             - Governance: {}\n\
             - Supported Formats: {}\n\
             - Templates: {} configured\n\n\
             **Reporting Philosophy:**\n\
             1. Data → Insights → Action\n\
             2. Template consistency and brand guideline adherence\n\
             3. Audience-appropriate detail level\n",
            status(self.base.memory().is_some()),
            status(self.base.governance().is_some()),
            self.config.default_formats.join(", "),
            self.config.template_library.len(),
        );
        if !self.config.brand_guidelines.is_empty() {
            prompt.push_str("\n**Brand Guidelines:**\n");
            for (key, value) in &self.config.brand_guidelines {
                prompt.push_str(&format!("- {key}: {value}\n"));
            }
        }
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
    use crate::llm::{MockReasoner, ReasoningResponse};
    use crate::providers::{InMemoryGovernance, InMemoryProvider};
    use std::sync::Arc;

    fn reporting_agent(mock: &Arc<MockReasoner>) -> ReportingAgent {
        let memory = Arc::new(InMemoryProvider::new());
        memory.add("xlsx template examples approved: blue header row", None);
        let mut config = ReportingConfig::default();
        config.template_library.insert("xlsx".into(), "templates/monthly.xlsx".into());
        config.brand_guidelines.insert("primary_color".into(), "#0044cc".into());
        ReportingAgent::new(
            BaseAgent::builder(mock.clone())
                .memory(memory)
                .governance(Arc::new(InMemoryGovernance::new())),
            config,
        )
    }

    #[test]
    fn test_format_subagent_mapping() {
        assert_eq!(format_subagent("xlsx"), "excel_specialist");
        assert_eq!(format_subagent("pptx"), "presentation_designer");
        assert_eq!(format_subagent("pdf"), "report_writer");
        assert_eq!(format_subagent("docx"), "report_writer");
    }

    #[tokio::test]
    async fn test_generate_with_data_analyses_first() {
        let mock = Arc::new(
            MockReasoner::new()
                .with_response(ReasoningResponse::text("revenue up 12%"))
                .with_response(ReasoningResponse::text("Sheet1: Summary")),
        );
        let agent = reporting_agent(&mock);

        let value = agent
            .execute(
                "Monthly metrics for the board",
                ExecuteOptions::new()
                    .with_param("report_type", "monthly_metrics")
                    .with_param("format", "xlsx")
                    .with_param("data", json!({"revenue": [100, 112]})),
            )
            .await
            .unwrap();
        assert_eq!(value["specification"], "Sheet1: Summary");
        assert_eq!(value["analysis"]["insights"], "revenue up 12%");
        assert_eq!(value["proposals"].as_array().unwrap().len(), 1);

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].system.as_deref().unwrap().contains("data analyst"));
        let brief = &requests[1].messages.last().unwrap().content;
        assert!(brief.contains("**Data Analysis:**\nrevenue up 12%"));
        assert!(brief.contains("templates/monthly.xlsx"));
        assert!(brief.contains("- primary_color: #0044cc"));
        assert!(requests[1].messages[0].content.contains("Style guidelines for xlsx"));
    }

    #[tokio::test]
    async fn test_generate_defaults_to_first_format_without_analysis() {
        let mock = Arc::new(MockReasoner::new());
        let agent = reporting_agent(&mock);
        let value = agent.execute("Quarterly summary", ExecuteOptions::new()).await.unwrap();
        assert_eq!(value["format"], "pdf");
        assert_eq!(value["report_type"], "general");
        assert!(value["analysis"].is_null());
        assert_eq!(mock.call_count(), 1);
        assert!(mock.last_request().unwrap().system.unwrap().contains("professional report writer"));
    }
}
