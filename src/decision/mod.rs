pub mod model;
pub mod parser;

pub use model::Decision;
pub use parser::{parse_decision, ParseError};

/// 原始响应 / reasoning 最大保留字符数
pub const MAX_RAW_CHARS: usize = 2000;

/// 按字符（而非字节）截断
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("买入买入买入", 2), "买入");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
