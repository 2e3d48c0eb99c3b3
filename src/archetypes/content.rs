//! 内容创作 agent：多平台内容生成与改写
//!
//! 每个启用的平台对应一个 `{platform}_writer` 子代理，另有 repurposer 负责跨平台改写。
//! 品牌语气从记忆中已批准的内容学习；生成结果作为提案提交审批。

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{Agent, AgentBuilder, AgentError, BaseAgent, ExecuteOptions, SubagentDefinition};
use crate::providers::{Change, Metadata};

pub const SUPPORTED_PLATFORMS: [&str; 4] = ["twitter", "linkedin", "blog", "instagram"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandVoiceMode {
    Adaptive,
    Strict,
    Creative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentConfig {
    pub enabled_platforms: Vec<String>,
    pub brand_voice_mode: BrandVoiceMode,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            enabled_platforms: SUPPORTED_PLATFORMS.iter().map(|p| p.to_string()).collect(),
            brand_voice_mode: BrandVoiceMode::Adaptive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedContent {
    pub platform: String,
    pub content_type: String,
    pub topic: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub proposals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepurposedContent {
    pub source_content: String,
    pub source_platform: Option<String>,
    pub target_platforms: Vec<String>,
    pub repurposed_content: String,
    pub timestamp: DateTime<Utc>,
    pub proposals: Vec<String>,
}

pub struct ContentCreatorAgent {
    base: BaseAgent,
    config: ContentConfig,
    /// 已提交审批的内容数
    proposed_count: AtomicU64,
}

impl ContentCreatorAgent {
    pub fn new(builder: AgentBuilder, config: ContentConfig) -> Self {
        let base = builder.agent_type("content").build();
        let mut config = config;
        if config.enabled_platforms.is_empty() {
            config.enabled_platforms = ContentConfig::default().enabled_platforms;
        }

        let agent = Self {
            base,
            config,
            proposed_count: AtomicU64::new(0),
        };
        agent.register_subagents();
        tracing::info!(
            parent: agent.base.span(),
            platforms = %agent.config.enabled_platforms.join(", "),
            voice_mode = ?agent.config.brand_voice_mode,
            "Content Creator initialized"
        );
        agent
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    pub fn proposed_count(&self) -> u64 {
        self.proposed_count.load(Ordering::Relaxed)
    }

    fn register_subagents(&self) {
        for platform in &self.config.enabled_platforms {
            if let Some(definition) = platform_writer(platform) {
                self.base.subagents().register(definition);
            } else {
                tracing::warn!(parent: self.base.span(), platform = %platform, "No writer for platform");
            }
        }

        self.base.subagents().register(
            SubagentDefinition::new(
                "repurposer",
                "Adapt content across platforms while maintaining core message and voice",
                "You are a content repurposing specialist.\n\n\
                 Transform content between platforms while keeping the core message and brand voice, \
                 optimizing format and length for each target.\n\n\
                 For each target platform output the platform name, the adapted content and \
                 platform-specific notes (hashtags, visual needs).",
            )
            .with_metadata(meta([("type", json!("repurposer"))])),
        );
    }

    /// 从任务描述推断平台；无关键词时取第一个启用平台
    pub fn detect_platform(&self, task: &str) -> String {
        let lower = task.to_lowercase();
        let detected = if ["twitter", "tweet", "thread"].iter().any(|k| lower.contains(k)) {
            Some("twitter")
        } else if lower.contains("linkedin") {
            Some("linkedin")
        } else if lower.contains("blog") || lower.contains("article") {
            Some("blog")
        } else if lower.contains("insta") {
            Some("instagram")
        } else {
            None
        };

        match detected {
            Some(p) => p.to_string(),
            None => self
                .config
                .enabled_platforms
                .first()
                .cloned()
                .unwrap_or_else(|| "twitter".to_string()),
        }
    }

    /// 为指定平台生成内容
    pub async fn create(
        &self,
        platform: &str,
        topic: &str,
        content_type: &str,
    ) -> Result<CreatedContent, AgentError> {
        tracing::info!(
            parent: self.base.span(),
            "Creating {content_type} for {platform}: {}",
            topic.chars().take(50).collect::<String>()
        );

        let subagent_name = format!("{platform}_writer");
        if !self.base.subagents().contains(&subagent_name) {
            return Err(AgentError::Execution(format!(
                "Platform '{platform}' not supported or not enabled"
            )));
        }

        let examples = self
            .base
            .query_memory(&format!("{platform} approved content"), 5)
            .await?;
        let voice_context = (!examples.is_empty()).then(|| {
            let joined = examples
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n---\n");
            format!("Previous approved content (learn voice):\n{joined}")
        });

        let brief = format!("Create a {content_type} about: {topic}");
        let content = self
            .base
            .subagents()
            .delegate(&subagent_name, &brief, voice_context.as_deref())
            .await?
            .text_content();

        let mut created = CreatedContent {
            platform: platform.to_string(),
            content_type: content_type.to_string(),
            topic: topic.to_string(),
            content,
            timestamp: Utc::now(),
            status: "pending_approval".to_string(),
            proposals: Vec::new(),
        };

        if self.base.governance().is_some() {
            let label = format!("{platform} {content_type}");
            let data = json!({
                "platform": created.platform,
                "content_type": created.content_type,
                "topic": created.topic,
                "content": created.content,
            });
            created.proposals.push(self.propose_content(platform, data, &label).await?);
        }

        tracing::info!(parent: self.base.span(), "Content created for {platform}: {content_type}");
        Ok(created)
    }

    /// 跨平台改写；targets 为空时使用全部启用平台
    pub async fn repurpose(
        &self,
        source_content: &str,
        source_platform: Option<&str>,
        target_platforms: Vec<String>,
    ) -> Result<RepurposedContent, AgentError> {
        let targets = if target_platforms.is_empty() {
            self.config.enabled_platforms.clone()
        } else {
            target_platforms
        };
        tracing::info!(parent: self.base.span(), "Repurposing content to {} platforms", targets.len());

        let mut task = format!("Adapt this content for {}:\n\n{source_content}", targets.join(", "));
        if let Some(source) = source_platform {
            task = format!("Original platform: {source}\n{task}");
        }

        let repurposed_content = self
            .base
            .subagents()
            .delegate("repurposer", &task, None)
            .await?
            .text_content();

        let mut repurposed = RepurposedContent {
            source_content: source_content.to_string(),
            source_platform: source_platform.map(str::to_string),
            target_platforms: targets,
            repurposed_content,
            timestamp: Utc::now(),
            proposals: Vec::new(),
        };

        if self.base.governance().is_some() {
            let data = json!({
                "source_platform": repurposed.source_platform,
                "target_platforms": repurposed.target_platforms,
                "repurposed_content": repurposed.repurposed_content,
            });
            repurposed
                .proposals
                .push(self.propose_content("multi-platform", data, "repurposed content").await?);
        }
        Ok(repurposed)
    }

    async fn propose_content(&self, target: &str, data: Value, label: &str) -> Result<String, AgentError> {
        let change = Change::create(target, data).with_reasoning(format!("Content approval for {label}"));
        let receipt = self
            .base
            .propose(vec![change], 0.8, Some(format!("Generated {label} for review")))
            .await?;
        self.proposed_count.fetch_add(1, Ordering::Relaxed);
        Ok(receipt.proposal.id)
    }
}

fn meta<const N: usize>(pairs: [(&str, Value); N]) -> Metadata {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn platform_writer(platform: &str) -> Option<SubagentDefinition> {
    let (description, prompt, metadata) = match platform {
        "twitter" => (
            "Write engaging Twitter/X posts and threads (280 chars max)",
            "You are a Twitter/X content specialist.\n\n\
             280 character limit per tweet, thread format for longer content, casual tone, \
             2-3 hashtags max and a strong hook in the first tweet.\n\n\
             Output: the tweet text, or numbered tweets (1/, 2/, ...) for a thread.",
            meta([("platform", json!("twitter")), ("char_limit", json!(280))]),
        ),
        "linkedin" => (
            "Write professional LinkedIn posts and articles",
            "You are a LinkedIn content specialist.\n\n\
             Professional but authentic tone, 1300-2000 character posts, strong opening line, \
             short paragraphs and 3-5 relevant hashtags.\n\n\
             Output: clear structure with line breaks, data-backed when possible.",
            meta([("platform", json!("linkedin")), ("recommended_length", json!("1300-2000"))]),
        ),
        "blog" => (
            "Write SEO-optimized long-form blog posts and articles",
            "You are a blog content specialist.\n\n\
             SEO-optimized long-form (1500-3000 words) with an H1 title, meta description, \
             structured H2/H3 sections, actionable takeaways and a conclusion with CTA.\n\n\
             Output: Markdown with a clear heading hierarchy and image placeholders.",
            meta([("platform", json!("blog")), ("recommended_length", json!("1500-3000"))]),
        ),
        "instagram" => (
            "Create Instagram posts with visual concepts and captions",
            "You are an Instagram content specialist.\n\n\
             Visual-first posts; the caption hook fits in the first 125 chars, the body stays under \
             2200 chars, followed by a call-to-action and 5-10 hashtags.\n\n\
             Output: visual concept, caption with hook, hashtag set and alt text.",
            meta([("platform", json!("instagram")), ("caption_limit", json!(2200))]),
        ),
        _ => return None,
    };
    Some(SubagentDefinition::new(format!("{platform}_writer"), description, prompt).with_metadata(metadata))
}

#[async_trait]
impl Agent for ContentCreatorAgent {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    async fn handle(&self, task: &str, options: &ExecuteOptions) -> Result<Value, AgentError> {
        let lower = task.to_lowercase();
        let result = if lower.contains("repurpose") || lower.contains("adapt") {
            let targets = options
                .param("target_platforms")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            let repurposed = self
                .repurpose(
                    options.param_str("source_content").unwrap_or_default(),
                    options.param_str("source_platform"),
                    targets,
                )
                .await?;
            serde_json::to_value(repurposed)
        } else {
            let platform = self.detect_platform(task);
            let content_type = options.param_str("content_type").unwrap_or("post");
            serde_json::to_value(self.create(&platform, task, content_type).await?)
        };
        result.map_err(|e| AgentError::Execution(e.to_string()))
    }

    fn default_system_prompt(&self) -> Option<String> {
        let status = |configured: bool| if configured { "Available" } else { "Not configured" };
        let mut prompt = format!(
            "You are an autonomous Content Creator Agent specializing in multi-platform content.\n\n\
             **Your Capabilities:**\n\
             - Memory: {}\n\
             - Governance: {}\n\
             - Enabled Platforms: {}\n\
             - Voice Mode: {:?}\n\n\
             **Content Philosophy:**\n\
             1. Voice Consistency: Learn from approved content in memory\n\
             2. Platform Optimization: Adapt format, length, tone per platform\n\
             3. Value First: Every piece must provide clear value\n\
             4. Quality > Quantity: Better to delay than publish mediocre content\n\n\
             Content submitted for approval so far: {}\n",
            status(self.base.memory().is_some()),
            status(self.base.governance().is_some()),
            self.config.enabled_platforms.join(", "),
            self.config.brand_voice_mode,
            self.proposed_count(),
        );
        let catalogue = self.base.subagents().delegation_prompt();
        if !catalogue.is_empty() {
            prompt.push('\n');
            prompt.push_str(&catalogue);
        }
        Some(prompt)
    }
}
