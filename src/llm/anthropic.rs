//! Anthropic Messages API 推理后端
//!
//! 通过 reqwest 直接调用 `{base_url}/messages`；system / tools / 续接句柄按请求原样映射。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{
    ContentBlock, ReasoningError, ReasoningProvider, ReasoningRequest, ReasoningResponse,
    SessionHandle, Usage,
};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic 后端连接参数
#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub base_url: String,
    pub api_version: String,
    pub request_timeout: Duration,
}

impl AnthropicSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_version: ANTHROPIC_VERSION.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct AnthropicReasoner {
    settings: AnthropicSettings,
    client: reqwest::Client,
}

impl AnthropicReasoner {
    pub fn new(settings: AnthropicSettings) -> Result<Self, ReasoningError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ReasoningError::Transport(e.to_string()))?;
        Ok(Self { settings, client })
    }
}

/// 请求体：system 为空时不发送，tools 为空时不发送
pub(crate) fn build_body(request: &ReasoningRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| json!({ "role": m.role, "content": m.content }))
        .collect();

    let mut body = json!({
        "model": request.model,
        "max_tokens": request.max_tokens,
        "messages": messages,
    });

    if let Some(system) = &request.system {
        body["system"] = json!(system);
    }
    if !request.tools.is_empty() {
        body["tools"] = json!(request
            .tools
            .iter()
            .map(|t| json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.input_schema,
            }))
            .collect::<Vec<_>>());
    }
    if let Some(handle) = &request.resume {
        body["resume"] = json!(handle.as_str());
    }
    body
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    content: Vec<ApiBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
    session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl From<ApiResponse> for ReasoningResponse {
    fn from(api: ApiResponse) -> Self {
        let content = api
            .content
            .into_iter()
            .filter_map(|block| match block {
                ApiBlock::Text { text } => Some(ContentBlock::Text { text }),
                ApiBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse { id, name, input }),
                ApiBlock::Other => None,
            })
            .collect();
        ReasoningResponse {
            content,
            session_handle: api.session_id.map(SessionHandle::new),
            stop_reason: api.stop_reason,
            usage: api.usage,
        }
    }
}

#[async_trait]
impl ReasoningProvider for AnthropicReasoner {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn reason(&self, request: ReasoningRequest) -> Result<ReasoningResponse, ReasoningError> {
        let url = format!("{}/messages", self.settings.base_url.trim_end_matches('/'));
        let body = build_body(&request);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", &self.settings.api_version)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Timeout
                } else {
                    ReasoningError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Parse(e.to_string()))?;

        let resp = ReasoningResponse::from(api);
        tracing::debug!(
            input_tokens = resp.usage.input_tokens,
            output_tokens = resp.usage.output_tokens,
            "Anthropic response received"
        );
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, ToolSpec};

    #[test]
    fn test_build_body_maps_everything() {
        let req = ReasoningRequest {
            model: "claude-sonnet-4-5".into(),
            messages: vec![Message::user("ctx"), Message::user("task")],
            max_tokens: 128,
            system: Some("be brief".into()),
            tools: vec![ToolSpec::new("search", "find", json!({"type": "object"}))],
            resume: Some(SessionHandle::new("sess-1")),
        };
        let body = build_body(&req);
        assert_eq!(body["model"], "claude-sonnet-4-5");
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["messages"][1]["content"], "task");
        assert_eq!(body["tools"][0]["name"], "search");
        assert_eq!(body["resume"], "sess-1");
    }

    #[test]
    fn test_build_body_minimal() {
        let req = ReasoningRequest {
            model: "m".into(),
            messages: vec![Message::user("task")],
            max_tokens: 8,
            system: None,
            tools: vec![],
            resume: None,
        };
        let body = build_body(&req);
        assert!(body.get("system").is_none());
        assert!(body.get("tools").is_none());
        assert!(body.get("resume").is_none());
    }

    #[test]
    fn test_api_response_conversion() {
        let raw = json!({
            "content": [
                {"type": "text", "text": "hello"},
                {"type": "thinking", "thinking": "..."},
                {"type": "tool_use", "id": "tu_1", "name": "search", "input": {"q": "x"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 4},
            "session_id": "abc"
        });
        let api: ApiResponse = serde_json::from_value(raw).unwrap();
        let resp = ReasoningResponse::from(api);
        assert_eq!(resp.content.len(), 2);
        assert_eq!(resp.text_content(), "hello");
        assert_eq!(resp.session_handle, Some(SessionHandle::new("abc")));
        assert_eq!(resp.usage.output_tokens, 4);
    }
}
