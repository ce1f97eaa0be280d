//! 推理服务抽象
//!
//! 失败以字符串返回，由 Reasoner 决定是否走离线回退表。

use async_trait::async_trait;

use crate::llm::Message;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}
