use crate::config::ModelSettings;
use std::time::Duration;

/// 推理模型标识（小写子串匹配）
pub const REASONING_MODEL_MARKERS: &[&str] = &[
    "gpt-5",
    "o1-preview",
    "o1-mini",
    "o1-",
    "o3-",
    "o4-",
    "deepseek-r1",
    "deepseek-reasoner",
    "qwq",
    "qwen-plus-thinking",
    "qwen-max-thinking",
    "claude-4",
    "claude-sonnet-4-5",
    "gemini-2.5",
    "gemini-3",
];

/// 非推理但使用 max_completion_tokens 的新一代模型
pub const NEW_GENERATION_MARKERS: &[&str] = &["gpt-4o"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelClass {
    Reasoning,
    NewGeneration,
    Legacy,
}

impl ModelClass {
    pub fn classify(model: &str) -> Self {
        let lower = model.to_lowercase();
        if REASONING_MODEL_MARKERS.iter().any(|m| lower.contains(m)) {
            ModelClass::Reasoning
        } else if NEW_GENERATION_MARKERS.iter().any(|m| lower.contains(m)) {
            ModelClass::NewGeneration
        } else {
            ModelClass::Legacy
        }
    }

    pub fn is_reasoning(self) -> bool {
        self == ModelClass::Reasoning
    }

    /// 推理模型不接受 temperature
    pub fn temperature(self) -> Option<f64> {
        match self {
            ModelClass::Reasoning => None,
            _ => Some(0.7),
        }
    }

    pub fn token_limit_field(self) -> &'static str {
        match self {
            ModelClass::Legacy => "max_tokens",
            _ => "max_completion_tokens",
        }
    }

    pub fn timeout(self, settings: &ModelSettings) -> Duration {
        if self.is_reasoning() {
            settings.reasoning_timeout
        } else {
            settings.standard_timeout
        }
    }
}
