//! Mock 推理后端（用于测试与离线运行，无需 API）
//!
//! 默认回显最后一条 User 消息；可预置脚本化响应 / 错误，并记录收到的每个请求。

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::llm::{ReasoningError, ReasoningProvider, ReasoningRequest, ReasoningResponse, Role};

/// Mock 后端：脚本队列耗尽后回显
#[derive(Debug, Default)]
pub struct MockReasoner {
    script: Mutex<VecDeque<Result<ReasoningResponse, ReasoningError>>>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl MockReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个脚本化响应（按 FIFO 消费）
    pub fn push_response(&self, response: ReasoningResponse) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(response));
    }

    /// 追加一个脚本化错误
    pub fn push_error(&self, error: ReasoningError) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
    }

    pub fn with_response(self, response: ReasoningResponse) -> Self {
        self.push_response(response);
        self
    }

    pub fn with_error(self, error: ReasoningError) -> Self {
        self.push_error(error);
        self
    }

    /// 已收到的请求快照
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_request(&self) -> Option<ReasoningRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ReasoningProvider for MockReasoner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn reason(&self, request: ReasoningRequest) -> Result<ReasoningResponse, ReasoningError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_else(|| "(no input)".to_string());

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match scripted {
            Some(result) => result,
            None => Ok(ReasoningResponse::text(format!("Echo from Mock: {last_user}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    fn request(text: &str) -> ReasoningRequest {
        ReasoningRequest {
            model: "mock-model".into(),
            messages: vec![Message::user(text)],
            max_tokens: 64,
            system: None,
            tools: vec![],
            resume: None,
        }
    }

    #[tokio::test]
    async fn test_mock_echoes_then_follows_script() {
        let mock = MockReasoner::new().with_error(ReasoningError::Timeout);
        assert_eq!(mock.reason(request("one")).await, Err(ReasoningError::Timeout));

        let resp = mock.reason(request("two")).await.unwrap();
        assert_eq!(resp.text_content(), "Echo from Mock: two");
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.last_request().unwrap().messages[0].content, "two");
    }
}
