use crate::decision::model::Decision;
use crate::decision::truncate_chars;
use log::warn;
use serde_json::{Map, Value};

/// 二次解析前的字符替换表：空白控制符 -> 空格，排版引号/破折号 -> ASCII
pub const CHAR_SUBSTITUTIONS: &[(char, char)] = &[
    ('\n', ' '),
    ('\r', ' '),
    ('\t', ' '),
    ('\u{201C}', '"'),  // “
    ('\u{201D}', '"'),  // ”
    ('\u{2018}', '\''), // ‘
    ('\u{2019}', '\''), // ’
    ('\u{2013}', '-'),  // –
    ('\u{2014}', '-'),  // —
    ('\u{2011}', '-'),  // non-breaking hyphen
];

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty response")]
    Empty,
    #[error("malformed json: {0}")]
    Malformed(String),
    #[error("unexpected decision structure: {0}")]
    UnexpectedShape(&'static str),
}

/// 解析模型输出为决策：
/// 代码块提取 -> 直接解析 -> 字符归一化后重试 -> 结构识别
pub fn parse_decision(raw: &str) -> Result<Decision, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let body = extract_fenced(trimmed);
    let value = parse_with_fallback(body)?;
    resolve_shape(value, raw)
}

/// 优先取 ```json 代码块，否则取第一对 ``` 之间的内容
pub fn extract_fenced(text: &str) -> &str {
    let inner = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else if let Some((_, rest)) = text.split_once("```") {
        rest
    } else {
        return text;
    };
    inner.split_once("```").map(|(b, _)| b).unwrap_or(inner).trim()
}

pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            CHAR_SUBSTITUTIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

fn parse_with_fallback(body: &str) -> Result<Value, ParseError> {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        return Ok(v);
    }

    let cleaned = normalize(body);
    serde_json::from_str::<Value>(&cleaned).map_err(|e| {
        let snippet = truncate_chars(&cleaned, 200);
        warn!("回测响应 JSON 解析失败: {}...", snippet);
        ParseError::Malformed(e.to_string())
    })
}

fn resolve_shape(value: Value, raw: &str) -> Result<Decision, ParseError> {
    match value {
        Value::Object(map) if matches!(map.get("decisions"), Some(Value::Array(_))) => {
            match first_object(map.get("decisions")) {
                Some(first) => Ok(Decision::with_reasoning(first, raw)),
                None => unexpected("object with empty or non-object decisions"),
            }
        }
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(first)) => Ok(Decision::with_reasoning(first, raw)),
            Some(_) => unexpected("array of non-objects"),
            None => unexpected("empty array"),
        },
        Value::Object(map) if map.contains_key("operation") => {
            Ok(Decision::with_reasoning(map, raw))
        }
        Value::Object(_) => unexpected("object without operation"),
        Value::String(_) => unexpected("string"),
        Value::Number(_) => unexpected("number"),
        Value::Bool(_) => unexpected("bool"),
        Value::Null => unexpected("null"),
    }
}

fn first_object(decisions: Option<&Value>) -> Option<Map<String, Value>> {
    match decisions?.as_array()?.first()? {
        Value::Object(m) => Some(m.clone()),
        _ => None,
    }
}

fn unexpected(shape: &'static str) -> Result<Decision, ParseError> {
    warn!("决策结构不符合预期: {}", shape);
    Err(ParseError::UnexpectedShape(shape))
}
