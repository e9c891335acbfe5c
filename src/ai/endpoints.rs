use reqwest::Url;

const COMPLETIONS_PATH: &str = "/chat/completions";
const GOOGLE_GENAI_HOST: &str = "generativelanguage.googleapis.com";

/// 根据 base_url 推导候选的 chat/completions 地址（按顺序尝试）。
/// 返回空列表表示配置无效，不应发起任何请求。
pub fn build_chat_completion_endpoints(base_url: &str, model: &str) -> Vec<String> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Vec::new();
    }
    let url = match Url::parse(base) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => u,
        _ => return Vec::new(),
    };

    if base.ends_with(COMPLETIONS_PATH) {
        return vec![base.to_string()];
    }

    let mut out = Vec::new();

    // Gemini 的 OpenAI 兼容层挂在 /openai 下
    let is_google = url.host_str() == Some(GOOGLE_GENAI_HOST);
    if is_google && model.to_lowercase().contains("gemini") && !base.ends_with("/openai") {
        out.push(format!("{base}/openai{COMPLETIONS_PATH}"));
    }

    if has_version_suffix(&url) || base.ends_with("/openai") {
        out.push(format!("{base}{COMPLETIONS_PATH}"));
    } else {
        out.push(format!("{base}/v1{COMPLETIONS_PATH}"));
        out.push(format!("{base}{COMPLETIONS_PATH}"));
    }

    out.dedup();
    out
}

/// 路径最后一段形如 v1 / v1beta / v4
fn has_version_suffix(url: &Url) -> bool {
    let last = url
        .path_segments()
        .and_then(|segs| segs.filter(|s| !s.is_empty()).last());
    match last {
        Some(seg) => {
            let mut chars = seg.chars();
            chars.next() == Some('v') && chars.next().map_or(false, |c| c.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_base_appends_completions() {
        assert_eq!(
            build_chat_completion_endpoints("https://api.openai.com/v1/", "gpt-4o"),
            vec!["https://api.openai.com/v1/chat/completions"]
        );
        assert_eq!(
            build_chat_completion_endpoints("https://open.bigmodel.cn/api/paas/v4", "glm-4"),
            vec!["https://open.bigmodel.cn/api/paas/v4/chat/completions"]
        );
    }

    #[test]
    fn unversioned_base_tries_v1_first() {
        assert_eq!(
            build_chat_completion_endpoints("https://api.deepseek.com", "deepseek-chat"),
            vec![
                "https://api.deepseek.com/v1/chat/completions",
                "https://api.deepseek.com/chat/completions",
            ]
        );
    }

    #[test]
    fn full_completions_url_is_used_as_is() {
        assert_eq!(
            build_chat_completion_endpoints("https://proxy.local/x/chat/completions", "m"),
            vec!["https://proxy.local/x/chat/completions"]
        );
    }

    #[test]
    fn gemini_gets_openai_shim_first() {
        assert_eq!(
            build_chat_completion_endpoints(
                "https://generativelanguage.googleapis.com/v1beta",
                "gemini-2.5-flash"
            ),
            vec![
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                "https://generativelanguage.googleapis.com/v1beta/chat/completions",
            ]
        );
    }

    #[test]
    fn invalid_base_yields_nothing() {
        assert!(build_chat_completion_endpoints("", "gpt-4o").is_empty());
        assert!(build_chat_completion_endpoints("   ", "gpt-4o").is_empty());
        assert!(build_chat_completion_endpoints("not a url", "gpt-4o").is_empty());
        assert!(build_chat_completion_endpoints("ftp://host/v1", "gpt-4o").is_empty());
    }
}
