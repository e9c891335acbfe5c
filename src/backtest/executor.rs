use crate::ai::{AccountSnapshot, ChatCompleter};
use crate::backtest::model::{ExecutorError, ItemInput, ItemOutcome, TaskProgress, TaskRunOutcome};
use crate::backtest::processor::ItemProcessor;
use crate::config::ExecutorConfig;
use crate::storage::repository::{AccountRepository, PromptBacktestRepository};
use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub const ACCOUNT_NOT_FOUND: &str = "Account not found";

/// 回测任务执行器：每次调用自带一个按 max_workers 限流的 worker 池
pub struct PromptBacktestExecutor<C: ChatCompleter> {
    db: Arc<DatabaseConnection>,
    client: Arc<C>,
    config: ExecutorConfig,
}

impl<C: ChatCompleter + 'static> PromptBacktestExecutor<C> {
    pub fn new(db: Arc<DatabaseConnection>, client: Arc<C>, config: ExecutorConfig) -> Self {
        Self {
            db,
            client,
            config: config.normalized(),
        }
    }

    /// 执行一个回测任务，阻塞直到全部明细处理完毕或任务被标记失败
    pub async fn execute_task(&self, task_id: i32) -> Result<TaskRunOutcome, ExecutorError> {
        let db = self.db.as_ref();
        info!(
            "🚀 开始回测任务 [{}]，并发 {}",
            task_id, self.config.max_workers
        );

        let Some(task) = PromptBacktestRepository::find_task(db, task_id).await? else {
            error!("回测任务 [{}] 不存在", task_id);
            return Ok(TaskRunOutcome::NotFound);
        };

        if !PromptBacktestRepository::start_task(db, task_id).await? {
            warn!(
                "回测任务 [{}] 当前状态为 {}，跳过执行",
                task_id, task.status
            );
            return Ok(TaskRunOutcome::Skipped(task.status));
        }

        let Some(account) = AccountRepository::find_by_id(db, task.account_id).await? else {
            error!(
                "回测任务 [{}] 的账号 [{}] 不存在",
                task_id, task.account_id
            );
            PromptBacktestRepository::fail_task(db, task_id, ACCOUNT_NOT_FOUND).await?;
            return Ok(TaskRunOutcome::AccountMissing);
        };

        let system_prompt: Arc<str> = AccountRepository::resolve_system_prompt(db, account.id)
            .await?
            .unwrap_or_else(|| self.config.default_system_prompt.clone())
            .into();

        // 只把纯值快照交给 worker
        let snapshot = Arc::new(AccountSnapshot {
            api_key: account.api_key,
            base_url: account.base_url,
            model: account.model,
        });

        let items: Vec<ItemInput> = PromptBacktestRepository::pending_items(db, task_id)
            .await?
            .into_iter()
            .map(|it| ItemInput {
                item_id: it.id,
                task_id,
                modified_prompt: it.modified_prompt,
                original_operation: it.original_operation,
            })
            .collect();
        info!("回测任务 [{}] 待处理明细 {} 条", task_id, items.len());

        self.dispatch(items, snapshot, system_prompt).await;

        PromptBacktestRepository::complete_task(db, task_id).await?;

        // 重新读取，拿到 worker 写入后的最新计数
        let (completed, failed) = PromptBacktestRepository::find_task(db, task_id)
            .await?
            .map(|t| (t.completed_count, t.failed_count))
            .unwrap_or_default();
        info!(
            "✓ 回测任务 [{}] 完成: 成功 {}，失败 {}",
            task_id, completed, failed
        );

        Ok(TaskRunOutcome::Completed { completed, failed })
    }

    pub async fn progress(&self, task_id: i32) -> Result<Option<TaskProgress>, ExecutorError> {
        Ok(PromptBacktestRepository::task_progress(self.db.as_ref(), task_id).await?)
    }

    async fn dispatch(
        &self,
        items: Vec<ItemInput>,
        account: Arc<AccountSnapshot>,
        system_prompt: Arc<str>,
    ) {
        let limit = self.config.max_workers;

        let mut running = stream::iter(items.into_iter().map(|item| {
            let db = self.db.clone();
            let client = self.client.clone();
            let account = account.clone();
            let system_prompt = system_prompt.clone();
            let item_id = item.item_id;
            let task_id = item.task_id;

            let handle = tokio::spawn(async move {
                let outcome =
                    ItemProcessor::process(client.as_ref(), &account, &system_prompt, &item).await;
                persist_outcome(&db, item.item_id, item.task_id, &outcome).await;
            });
            async move { (item_id, task_id, handle.await) }
        }))
        .buffer_unordered(limit);

        while let Some((item_id, task_id, joined)) = running.next().await {
            if let Err(e) = joined {
                // 正常情况下不会走到这里，processor 已兜底
                error!("明细 [{}] worker 异常退出: {}", item_id, e);
                let outcome = ItemOutcome::failed(format!("worker aborted: {e}"), None);
                persist_outcome(&self.db, item_id, task_id, &outcome).await;
            }
        }
    }
}

async fn persist_outcome(db: &DatabaseConnection, item_id: i32, task_id: i32, outcome: &ItemOutcome) {
    match PromptBacktestRepository::save_item_outcome(db, item_id, task_id, outcome).await {
        Ok(true) => {}
        Ok(false) => warn!("明细 [{}] 已不是 pending，忽略重复写入", item_id),
        Err(e) => error!("明细 [{}] 结果写入失败: {}", item_id, e),
    }
}
