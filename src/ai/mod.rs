pub mod capability;
pub mod client;
pub mod endpoints;
pub mod types;

pub use capability::ModelClass;
pub use client::ModelClient;
pub use endpoints::build_chat_completion_endpoints;
pub use types::{AccountSnapshot, ChatCompleter, LlmError};

use crate::config::ModelSettings;

pub(crate) fn build_llm_http_client(settings: &ModelSettings) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();

    if let Ok(raw) = std::env::var("LLM_PROXY") {
        let t = raw.trim();
        if !t.is_empty() {
            let url = if t.contains("://") {
                t.to_string()
            } else {
                format!("socks5h://{}", t)
            };
            let proxy = reqwest::Proxy::all(&url).map_err(|e| LlmError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }

    // 自建兼容网关常见自签证书
    if settings.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().map_err(|e| LlmError::Http(e.to_string()))
}
