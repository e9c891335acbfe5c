use crate::ai::build_llm_http_client;
use crate::ai::capability::ModelClass;
use crate::ai::endpoints::build_chat_completion_endpoints;
use crate::ai::types::{AccountSnapshot, ChatCompleter, LlmError};
use crate::config::ModelSettings;
use crate::decision::truncate_chars;
use async_trait::async_trait;
use log::{error, warn};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct ModelClient {
    client: reqwest::Client,
    settings: ModelSettings,
}

impl ModelClient {
    pub fn new(settings: ModelSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_llm_http_client(&settings)?,
            settings,
        })
    }

    pub fn with_http_client(client: reqwest::Client, settings: ModelSettings) -> Self {
        Self { client, settings }
    }

    /// 单个候选地址：Ok(Some) 为成功；Ok(None) 为非 200 或空 choices，调用方继续下一个
    async fn try_endpoint(
        &self,
        endpoint: &str,
        api_key: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<Option<String>, LlmError> {
        let resp = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if status != StatusCode::OK {
            warn!(
                "LLM 调用失败 [{}]: {} - {}",
                endpoint,
                status.as_u16(),
                truncate_chars(&raw, 200)
            );
            return Ok(None);
        }

        let v: Value = serde_json::from_str(&raw).map_err(|e| {
            LlmError::InvalidResponse(format!(
                "json parse failed: {e}, raw={}",
                truncate_chars(&raw, 200)
            ))
        })?;

        match v.get("choices").and_then(|c| c.as_array()) {
            Some(choices) if !choices.is_empty() => Ok(Some(extract_content(&choices[0]))),
            _ => {
                warn!(
                    "LLM 调用失败 [{}]: 200 但 choices 为空 - {}",
                    endpoint,
                    truncate_chars(&raw, 200)
                );
                Ok(None)
            }
        }
    }
}

/// 按模型能力构造请求体
pub fn build_payload(model: &str, system_prompt: &str, user_prompt: &str, max_tokens: u32) -> Value {
    let class = ModelClass::classify(model);
    let mut body = serde_json::json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": user_prompt}
        ]
    });
    if let Some(t) = class.temperature() {
        body["temperature"] = serde_json::json!(t);
    }
    body[class.token_limit_field()] = serde_json::json!(max_tokens);
    body
}

/// message.content 可能是字符串或分段数组；缺失时按空串处理
fn extract_content(choice: &Value) -> String {
    match choice.get("message").and_then(|m| m.get("content")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|it| {
                it.get("text")
                    .and_then(|x| x.as_str())
                    .or_else(|| it.as_str())
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

#[async_trait]
impl ChatCompleter for ModelClient {
    async fn complete(
        &self,
        account: &AccountSnapshot,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        let endpoints = build_chat_completion_endpoints(&account.base_url, &account.model);
        if endpoints.is_empty() {
            error!("模型 {} 没有可用的 API 地址", account.model);
            return Err(LlmError::NoEndpoint(account.model.clone()));
        }

        let class = ModelClass::classify(&account.model);
        let timeout = class.timeout(&self.settings);
        let body = build_payload(
            &account.model,
            system_prompt,
            user_prompt,
            self.settings.max_output_tokens,
        );

        for endpoint in &endpoints {
            match self
                .try_endpoint(endpoint, &account.api_key, &body, timeout)
                .await
            {
                Ok(Some(content)) => return Ok(content),
                Ok(None) => continue,
                Err(e) => {
                    error!("LLM 调用异常 [{}]: {}", endpoint, e);
                    continue;
                }
            }
        }

        Err(LlmError::AllEndpointsFailed(endpoints.len()))
    }
}
