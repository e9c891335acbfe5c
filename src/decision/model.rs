use crate::decision::{truncate_chars, MAX_RAW_CHARS};
use serde_json::{Map, Value};

pub const REASONING_KEY: &str = "_reasoning";

/// 从模型输出中解析出的单条决策（不单独落库，字段会拷贝到 item 上）
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    fields: Map<String, Value>,
}

impl Decision {
    /// 附加原始响应作为 reasoning（截断到 2000 字符）
    pub(crate) fn with_reasoning(mut fields: Map<String, Value>, raw: &str) -> Self {
        fields.insert(
            REASONING_KEY.to_string(),
            Value::String(truncate_chars(raw, MAX_RAW_CHARS)),
        );
        Self { fields }
    }

    pub fn operation(&self) -> Option<&str> {
        self.fields.get("operation").and_then(|v| v.as_str())
    }

    /// operation 存在但既不是字符串也不是 null
    pub fn has_invalid_operation(&self) -> bool {
        matches!(self.fields.get("operation"), Some(v) if !v.is_string() && !v.is_null())
    }

    pub fn symbol(&self) -> Option<&str> {
        self.fields.get("symbol").and_then(|v| v.as_str())
    }

    /// `target_portion_of_balance`，兼容数字与数字字符串
    pub fn target_portion(&self) -> Option<f64> {
        match self.fields.get("target_portion_of_balance")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.fields.get(REASONING_KEY).and_then(|v| v.as_str())
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}
