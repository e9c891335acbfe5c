use crate::ai::{AccountSnapshot, ChatCompleter};
use crate::backtest::model::{CompletedItem, ItemInput, ItemOutcome};
use crate::decision::{parse_decision, truncate_chars, MAX_RAW_CHARS};
use futures::FutureExt;
use log::{error, warn};
use std::panic::AssertUnwindSafe;

pub struct ItemProcessor;

impl ItemProcessor {
    /// 处理单条明细，永远返回一个结果；内部 panic 也会被转换成失败结果
    pub async fn process<C: ChatCompleter + ?Sized>(
        client: &C,
        account: &AccountSnapshot,
        system_prompt: &str,
        item: &ItemInput,
    ) -> ItemOutcome {
        let fut = Self::process_inner(client, account, system_prompt, item);
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                error!("处理明细 [{}] 异常: {}", item.item_id, msg);
                ItemOutcome::failed(msg, None)
            }
        }
    }

    async fn process_inner<C: ChatCompleter + ?Sized>(
        client: &C,
        account: &AccountSnapshot,
        system_prompt: &str,
        item: &ItemInput,
    ) -> ItemOutcome {
        let response = match client
            .complete(account, system_prompt, &item.modified_prompt)
            .await
        {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => return ItemOutcome::failed("LLM call failed - no response", None),
            Err(e) => {
                warn!("明细 [{}] 调用模型失败: {}", item.item_id, e);
                return ItemOutcome::failed(format!("LLM call failed - no response ({e})"), None);
            }
        };

        let decision = match parse_decision(&response) {
            Ok(d) => d,
            Err(e) => {
                warn!("明细 [{}] 决策解析失败: {}", item.item_id, e);
                return ItemOutcome::failed("Failed to parse decision", Some(&response));
            }
        };

        if decision.has_invalid_operation() {
            warn!("明细 [{}] operation 类型无效", item.item_id);
            return ItemOutcome::failed("invalid operation type", Some(&response));
        }

        let (decision_changed, change_type) =
            detect_change(item.original_operation.as_deref(), decision.operation());

        ItemOutcome::Completed(CompletedItem {
            operation: decision.operation().map(str::to_string),
            symbol: decision.symbol().map(str::to_string),
            target_portion: decision.target_portion(),
            reasoning: Some(
                decision
                    .reasoning()
                    .map(str::to_string)
                    .unwrap_or_else(|| truncate_chars(&response, MAX_RAW_CHARS)),
            ),
            decision_json: decision.to_json(),
            decision_changed,
            change_type,
        })
    }
}

/// 忽略大小写比较操作；不同则 change_type 为 "{原}_to_{新}"
pub fn detect_change(original: Option<&str>, new: Option<&str>) -> (bool, Option<String>) {
    let orig = original.unwrap_or("").to_lowercase();
    let new = new.unwrap_or("").to_lowercase();
    if orig == new {
        (false, None)
    } else {
        (true, Some(format!("{orig}_to_{new}")))
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("unexpected error: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("unexpected error: {s}")
    } else {
        "unexpected error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::LlmError;
    use crate::backtest::model::MAX_ERROR_CHARS;
    use async_trait::async_trait;

    enum Script {
        Reply(&'static str),
        Fail,
        Panic,
    }

    struct ScriptedCompleter(Script);

    #[async_trait]
    impl ChatCompleter for ScriptedCompleter {
        async fn complete(
            &self,
            _account: &AccountSnapshot,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> Result<String, LlmError> {
            match &self.0 {
                Script::Reply(s) => Ok(s.to_string()),
                Script::Fail => Err(LlmError::AllEndpointsFailed(2)),
                Script::Panic => panic!("{}", "x".repeat(800)),
            }
        }
    }

    fn account() -> AccountSnapshot {
        AccountSnapshot {
            api_key: "k".to_string(),
            base_url: "https://api.example.com/v1".to_string(),
            model: "gpt-4".to_string(),
        }
    }

    fn item(original: Option<&str>) -> ItemInput {
        ItemInput {
            item_id: 1,
            task_id: 1,
            modified_prompt: "what if BTC drops 10%".to_string(),
            original_operation: original.map(str::to_string),
        }
    }

    async fn run(script: Script, original: Option<&str>) -> ItemOutcome {
        ItemProcessor::process(&ScriptedCompleter(script), &account(), "sys", &item(original)).await
    }

    #[tokio::test]
    async fn changed_decision_is_labelled() {
        let raw = r#"```json
{"operation":"Buy","symbol":"BTC","target_portion_of_balance":0.3}
```"#;
        match run(Script::Reply(raw), Some("hold")).await {
            ItemOutcome::Completed(c) => {
                assert_eq!(c.operation.as_deref(), Some("Buy"));
                assert_eq!(c.symbol.as_deref(), Some("BTC"));
                assert_eq!(c.target_portion, Some(0.3));
                assert!(c.decision_changed);
                assert_eq!(c.change_type.as_deref(), Some("hold_to_buy"));
                assert_eq!(c.reasoning.as_deref(), Some(raw));
                assert!(c.decision_json.contains("\"_reasoning\""));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn same_operation_ignores_case() {
        match run(Script::Reply(r#"{"operation":"BUY"}"#), Some("buy")).await {
            ItemOutcome::Completed(c) => {
                assert!(!c.decision_changed);
                assert_eq!(c.change_type, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_string_operation_fails_item() {
        let raw = r#"{"operation": 5}"#;
        assert_eq!(
            run(Script::Reply(raw), Some("hold")).await,
            ItemOutcome::failed("invalid operation type", Some(raw))
        );
    }

    #[tokio::test]
    async fn null_operation_counts_as_empty() {
        match run(Script::Reply(r#"{"operation": null}"#), None).await {
            ItemOutcome::Completed(c) => {
                assert_eq!(c.operation, None);
                assert!(!c.decision_changed);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_operations_are_equal() {
        assert_eq!(detect_change(None, Some("")), (false, None));
        assert_eq!(
            detect_change(None, Some("sell")),
            (true, Some("_to_sell".to_string()))
        );
    }

    #[tokio::test]
    async fn empty_reply_is_no_response() {
        assert_eq!(
            run(Script::Reply(""), None).await,
            ItemOutcome::failed("LLM call failed - no response", None)
        );
    }

    #[tokio::test]
    async fn client_error_becomes_failure() {
        match run(Script::Fail, None).await {
            ItemOutcome::Failed(f) => {
                assert!(f.error.starts_with("LLM call failed - no response"));
                assert_eq!(f.raw_response, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn unparseable_reply_keeps_raw_response() {
        match run(Script::Reply("I would rather not say."), Some("buy")).await {
            ItemOutcome::Failed(f) => {
                assert_eq!(f.error, "Failed to parse decision");
                assert_eq!(f.raw_response.as_deref(), Some("I would rather not say."));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn panic_is_contained_and_truncated() {
        match run(Script::Panic, None).await {
            ItemOutcome::Failed(f) => {
                assert!(f.error.starts_with("unexpected error"));
                assert_eq!(f.error.chars().count(), MAX_ERROR_CHARS);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
