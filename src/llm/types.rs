//! 推理请求 / 响应类型
//!
//! 消息序列、工具声明、内容块与会话续接句柄；各推理后端共用同一套结构。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色（与 Messages API 一致，system 单独走 ReasoningRequest::system）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 工具声明：名称、描述、输入 JSON Schema（原样转发给推理后端）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// 推理会话续接句柄。
///
/// 对核心是不透明的：只存储、只转发，从不解析其结构。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次推理调用的完整请求
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReasoningRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// 空列表表示不携带任何工具
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<SessionHandle>,
}

impl ReasoningRequest {
    /// 工具名列表（按声明顺序）
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// 响应内容块
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
}

/// Token 使用统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// 推理响应：内容块 + 可选续接句柄
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReasoningResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub session_handle: Option<SessionHandle>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

impl ReasoningResponse {
    /// 只含一段文本的响应
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            session_handle: None,
            stop_reason: Some("end_turn".to_string()),
            usage: Usage::default(),
        }
    }

    pub fn with_session_handle(mut self, handle: SessionHandle) -> Self {
        self.session_handle = Some(handle);
        self
    }

    /// 拼接全部文本块
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 模型请求的工具调用
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } => Some((name.as_str(), input)),
            ContentBlock::Text { .. } => None,
        })
    }
}
