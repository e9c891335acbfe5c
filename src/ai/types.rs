use async_trait::async_trait;
use std::fmt;

/// 账号配置快照：在分发给并发 worker 之前从数据库记录中拷贝出来
#[derive(Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl fmt::Debug for AccountSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSnapshot")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("no valid API endpoint for model {0}")]
    NoEndpoint(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("all {0} endpoint(s) failed")]
    AllEndpointsFailed(usize),
}

#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// 返回首个成功响应的 message content
    async fn complete(
        &self,
        account: &AccountSnapshot,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError>;
}
