//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=mock`）。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::core::{AgentError, AgentSettings, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::llm::{AnthropicReasoner, AnthropicSettings, MockReasoner, ReasoningProvider};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub governance: GovernanceSection,
    pub runtime: RuntimeSection,
}

/// [agent] 段：原型、名称、模型与自动审批策略
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// research / content / reporting / generic
    pub agent_type: String,
    pub agent_name: Option<String>,
    pub model: String,
    pub auto_approve: bool,
    pub confidence_threshold: f64,
    pub max_retries: u32,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            agent_type: "generic".to_string(),
            agent_name: None,
            model: DEFAULT_MODEL.to_string(),
            auto_approve: false,
            confidence_threshold: 0.8,
            max_retries: 3,
        }
    }
}

/// [llm] 段：后端选择与连接参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// anthropic / mock
    pub provider: String,
    /// 未设置时读取 ANTHROPIC_API_KEY
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    pub max_tokens: u32,
    /// 单次请求超时（秒）
    pub request_timeout: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            api_key: None,
            base_url: None,
            api_version: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: 60,
        }
    }
}

impl LlmSection {
    /// 配置中的 key 优先，其次环境变量；空串视为未设置
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// [governance] 段：审批等待（秒）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GovernanceSection {
    pub approval_timeout: u64,
    pub poll_interval: u64,
}

impl Default for GovernanceSection {
    fn default() -> Self {
        Self {
            approval_timeout: 3600,
            poll_interval: 5,
        }
    }
}

/// [runtime] 段：循环节奏（秒）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    pub check_interval: u64,
    pub delay_between_tasks: u64,
    pub pending_task_limit: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            check_interval: 60,
            delay_between_tasks: 5,
            pending_task_limit: 10,
        }
    }
}

impl AppConfig {
    pub fn to_agent_settings(&self) -> AgentSettings {
        AgentSettings {
            model: self.agent.model.clone(),
            auto_approve: self.agent.auto_approve,
            confidence_threshold: self.agent.confidence_threshold.clamp(0.0, 1.0),
            max_retries: self.agent.max_retries,
            max_tokens: self.llm.max_tokens,
            approval_timeout: Duration::from_secs(self.governance.approval_timeout),
            poll_interval: Duration::from_secs(self.governance.poll_interval),
            pending_task_limit: self.runtime.pending_task_limit,
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.runtime.check_interval)
    }

    pub fn delay_between_tasks(&self) -> Duration {
        Duration::from_secs(self.runtime.delay_between_tasks)
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default", "default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path.filter(|p| p.exists()) {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 根据 [llm] 段选择推理后端；anthropic 缺少 API key 时直接报错
pub fn create_reasoner_from_config(cfg: &AppConfig) -> Result<Arc<dyn ReasoningProvider>, AgentError> {
    match cfg.llm.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::warn!("Using Mock reasoner");
            Ok(Arc::new(MockReasoner::new()))
        }
        "anthropic" => {
            let api_key = cfg.llm.resolve_api_key().ok_or_else(|| {
                AgentError::Configuration(
                    "Anthropic API key not set (llm.api_key or ANTHROPIC_API_KEY)".to_string(),
                )
            })?;
            let mut settings = AnthropicSettings::new(api_key);
            if let Some(base_url) = &cfg.llm.base_url {
                settings.base_url = base_url.trim_end_matches('/').to_string();
            }
            if let Some(version) = &cfg.llm.api_version {
                settings.api_version = version.clone();
            }
            settings.request_timeout = Duration::from_secs(cfg.llm.request_timeout);
            tracing::info!("Using Anthropic reasoner ({})", cfg.agent.model);
            Ok(Arc::new(AnthropicReasoner::new(settings)?))
        }
        other => Err(AgentError::Configuration(format!("Unknown llm provider: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let file = write_config(
            r#"
[agent]
agent_type = "research"
auto_approve = true
confidence_threshold = 0.9

[llm]
provider = "mock"
max_tokens = 2048

[governance]
approval_timeout = 30
poll_interval = 1

[runtime]
pending_task_limit = 3
"#,
        );
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.agent.agent_type, "research");
        assert_eq!(cfg.llm.provider, "mock");

        let settings = cfg.to_agent_settings();
        assert!(settings.auto_approve);
        assert_eq!(settings.confidence_threshold, 0.9);
        assert_eq!(settings.max_tokens, 2048);
        assert_eq!(settings.approval_timeout, Duration::from_secs(30));
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.pending_task_limit, 3);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = load_config(Some(PathBuf::from("/nonexistent/hive.toml"))).unwrap();
        assert_eq!(cfg.governance.approval_timeout, 3600);
        assert_eq!(cfg.runtime.pending_task_limit, 10);
        assert_eq!(cfg.to_agent_settings().model, DEFAULT_MODEL);
    }

    #[test]
    fn test_mock_provider_builds() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".into();
        assert_eq!(create_reasoner_from_config(&cfg).unwrap().name(), "mock");
    }

    #[test]
    fn test_anthropic_with_key_builds() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("sk-test".into());
        assert_eq!(create_reasoner_from_config(&cfg).unwrap().name(), "anthropic");
    }

    #[test]
    fn test_anthropic_without_key_fails_fast() {
        if std::env::var("ANTHROPIC_API_KEY").is_ok() {
            return;
        }
        let cfg = AppConfig::default();
        let err = create_reasoner_from_config(&cfg).err().unwrap();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "openai".into();
        assert!(matches!(
            create_reasoner_from_config(&cfg),
            Err(AgentError::Configuration(_))
        ));
    }
}
