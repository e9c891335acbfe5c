use log::warn;
use std::time::Duration;

pub const DEFAULT_MAX_WORKERS: usize = 20;
pub const DEFAULT_MAX_TOKENS: u32 = 5000;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a systematic trading assistant. Analyze the market data and make trading decisions.";

/// 模型请求相关参数
#[derive(Clone, Debug)]
pub struct ModelSettings {
    pub max_output_tokens: u32,
    pub standard_timeout: Duration,
    pub reasoning_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: DEFAULT_MAX_TOKENS,
            standard_timeout: Duration::from_secs(120),
            reasoning_timeout: Duration::from_secs(240),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    pub max_workers: usize,
    pub default_system_prompt: String,
    pub model: ModelSettings,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: ModelSettings::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_workers = env_parse("BACKTEST_MAX_WORKERS", defaults.max_workers);
        let default_system_prompt = std::env::var("BACKTEST_DEFAULT_SYSTEM_PROMPT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.default_system_prompt);

        let model = ModelSettings {
            max_output_tokens: env_parse("LLM_MAX_TOKENS", defaults.model.max_output_tokens),
            standard_timeout: Duration::from_secs(env_parse(
                "LLM_TIMEOUT_SECS",
                defaults.model.standard_timeout.as_secs(),
            )),
            reasoning_timeout: Duration::from_secs(env_parse(
                "LLM_REASONING_TIMEOUT_SECS",
                defaults.model.reasoning_timeout.as_secs(),
            )),
            accept_invalid_certs: env_parse("LLM_ACCEPT_INVALID_CERTS", false),
        };

        Self {
            max_workers,
            default_system_prompt,
            model,
        }
        .normalized()
    }

    /// 并发数至少为 1，超时为 0 时回落到默认值
    pub fn normalized(mut self) -> Self {
        if self.max_workers == 0 {
            warn!("BACKTEST_MAX_WORKERS=0 无效，按 1 处理");
            self.max_workers = 1;
        }
        let defaults = ModelSettings::default();
        if self.model.standard_timeout.is_zero() {
            warn!("LLM_TIMEOUT_SECS=0 无效，使用默认值");
            self.model.standard_timeout = defaults.standard_timeout;
        }
        if self.model.reasoning_timeout.is_zero() {
            warn!("LLM_REASONING_TIMEOUT_SECS=0 无效，使用默认值");
            self.model.reasoning_timeout = defaults.reasoning_timeout;
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!("环境变量 {}={} 无法解析，使用默认值", key, raw);
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_clamped() {
        let cfg = ExecutorConfig {
            max_workers: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(cfg.max_workers, 1);
    }

    #[test]
    fn zero_timeouts_fall_back_to_defaults() {
        let cfg = ExecutorConfig {
            model: ModelSettings {
                standard_timeout: Duration::ZERO,
                reasoning_timeout: Duration::ZERO,
                ..Default::default()
            },
            ..Default::default()
        }
        .normalized();
        assert_eq!(cfg.model.standard_timeout, Duration::from_secs(120));
        assert_eq!(cfg.model.reasoning_timeout, Duration::from_secs(240));
    }

    #[test]
    fn defaults_match_batch_limits() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.max_workers, 20);
        assert_eq!(cfg.model.max_output_tokens, 5000);
        assert_eq!(cfg.model.standard_timeout, Duration::from_secs(120));
        assert_eq!(cfg.model.reasoning_timeout, Duration::from_secs(240));
    }
}
