use crate::backtest::model::{ItemOutcome, ItemStatus, TaskProgress, TaskStatus};
use crate::storage::entity::prompt_backtest_item::{
    self, ActiveModel as ItemActiveModel, Entity as PromptBacktestItem,
};
use crate::storage::entity::prompt_backtest_task::{
    self, ActiveModel as TaskActiveModel, Entity as PromptBacktestTask,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

#[derive(Debug, Clone)]
pub struct NewItem {
    pub modified_prompt: String,
    pub original_operation: Option<String>,
}

pub struct PromptBacktestRepository;

impl PromptBacktestRepository {
    /// 创建任务及其全部 pending 明细
    pub async fn create_task(
        db: &DatabaseConnection,
        account_id: i32,
        items: Vec<NewItem>,
    ) -> Result<i32, DbErr> {
        let now = Utc::now().timestamp();
        let txn = db.begin().await?;

        let task = TaskActiveModel {
            account_id: Set(account_id),
            status: Set(TaskStatus::Pending.as_str().to_string()),
            total_count: Set(items.len() as i32),
            completed_count: Set(0),
            failed_count: Set(0),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for item in items {
            ItemActiveModel {
                task_id: Set(task.id),
                modified_prompt: Set(item.modified_prompt),
                original_operation: Set(item.original_operation),
                status: Set(ItemStatus::Pending.as_str().to_string()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(task.id)
    }

    pub async fn find_task(
        db: &DatabaseConnection,
        task_id: i32,
    ) -> Result<Option<prompt_backtest_task::Model>, DbErr> {
        PromptBacktestTask::find_by_id(task_id).one(db).await
    }

    /// pending -> running；返回 false 表示任务不在 pending 状态
    pub async fn start_task(db: &DatabaseConnection, task_id: i32) -> Result<bool, DbErr> {
        let now = Utc::now().timestamp();
        let res = PromptBacktestTask::update_many()
            .col_expr(
                prompt_backtest_task::Column::Status,
                Expr::value(TaskStatus::Running.as_str()),
            )
            .col_expr(prompt_backtest_task::Column::StartedAt, Expr::value(now))
            .filter(prompt_backtest_task::Column::Id.eq(task_id))
            .filter(prompt_backtest_task::Column::Status.eq(TaskStatus::Pending.as_str()))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    pub async fn fail_task(
        db: &DatabaseConnection,
        task_id: i32,
        message: &str,
    ) -> Result<(), DbErr> {
        let now = Utc::now().timestamp();
        PromptBacktestTask::update_many()
            .col_expr(
                prompt_backtest_task::Column::Status,
                Expr::value(TaskStatus::Failed.as_str()),
            )
            .col_expr(
                prompt_backtest_task::Column::ErrorMessage,
                Expr::value(message.to_string()),
            )
            .col_expr(prompt_backtest_task::Column::FinishedAt, Expr::value(now))
            .filter(prompt_backtest_task::Column::Id.eq(task_id))
            .filter(prompt_backtest_task::Column::Status.is_in([
                TaskStatus::Pending.as_str(),
                TaskStatus::Running.as_str(),
            ]))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn complete_task(db: &DatabaseConnection, task_id: i32) -> Result<(), DbErr> {
        let now = Utc::now().timestamp();
        PromptBacktestTask::update_many()
            .col_expr(
                prompt_backtest_task::Column::Status,
                Expr::value(TaskStatus::Completed.as_str()),
            )
            .col_expr(prompt_backtest_task::Column::FinishedAt, Expr::value(now))
            .filter(prompt_backtest_task::Column::Id.eq(task_id))
            .filter(prompt_backtest_task::Column::Status.eq(TaskStatus::Running.as_str()))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn pending_items(
        db: &DatabaseConnection,
        task_id: i32,
    ) -> Result<Vec<prompt_backtest_item::Model>, DbErr> {
        PromptBacktestItem::find()
            .filter(prompt_backtest_item::Column::TaskId.eq(task_id))
            .filter(prompt_backtest_item::Column::Status.eq(ItemStatus::Pending.as_str()))
            .order_by_asc(prompt_backtest_item::Column::Id)
            .all(db)
            .await
    }

    pub async fn items_for_task(
        db: &DatabaseConnection,
        task_id: i32,
    ) -> Result<Vec<prompt_backtest_item::Model>, DbErr> {
        PromptBacktestItem::find()
            .filter(prompt_backtest_item::Column::TaskId.eq(task_id))
            .order_by_asc(prompt_backtest_item::Column::Id)
            .all(db)
            .await
    }

    /// 写入单条结果并原子累加任务计数（同一事务）。
    /// 只有 pending 的明细会被更新；重复写入返回 false 且不累加计数。
    pub async fn save_item_outcome(
        db: &DatabaseConnection,
        item_id: i32,
        task_id: i32,
        outcome: &ItemOutcome,
    ) -> Result<bool, DbErr> {
        use prompt_backtest_item::Column as C;

        let now = Utc::now().timestamp();
        let txn = db.begin().await?;

        let update = PromptBacktestItem::update_many()
            .col_expr(C::UpdatedAt, Expr::value(now))
            .filter(C::Id.eq(item_id))
            .filter(C::Status.eq(ItemStatus::Pending.as_str()));

        let (update, counter) = match outcome {
            ItemOutcome::Completed(c) => (
                update
                    .col_expr(C::Status, Expr::value(ItemStatus::Completed.as_str()))
                    .col_expr(C::NewOperation, Expr::value(c.operation.clone()))
                    .col_expr(C::NewSymbol, Expr::value(c.symbol.clone()))
                    .col_expr(C::NewTargetPortion, Expr::value(c.target_portion))
                    .col_expr(C::NewReasoning, Expr::value(c.reasoning.clone()))
                    .col_expr(C::NewDecisionJson, Expr::value(Some(c.decision_json.clone())))
                    .col_expr(C::DecisionChanged, Expr::value(Some(c.decision_changed)))
                    .col_expr(C::ChangeType, Expr::value(c.change_type.clone())),
                prompt_backtest_task::Column::CompletedCount,
            ),
            ItemOutcome::Failed(f) => (
                update
                    .col_expr(C::Status, Expr::value(ItemStatus::Failed.as_str()))
                    .col_expr(C::ErrorMessage, Expr::value(Some(f.error.clone())))
                    .col_expr(C::RawResponse, Expr::value(f.raw_response.clone())),
                prompt_backtest_task::Column::FailedCount,
            ),
        };

        let res = update.exec(&txn).await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        // 原子 +1，不依赖内存中的旧计数
        PromptBacktestTask::update_many()
            .col_expr(counter, Expr::col(counter).add(1))
            .filter(prompt_backtest_task::Column::Id.eq(task_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    pub async fn task_progress(
        db: &DatabaseConnection,
        task_id: i32,
    ) -> Result<Option<TaskProgress>, DbErr> {
        let Some(task) = Self::find_task(db, task_id).await? else {
            return Ok(None);
        };
        let total = PromptBacktestItem::find()
            .filter(prompt_backtest_item::Column::TaskId.eq(task_id))
            .count(db)
            .await? as usize;
        let pending = PromptBacktestItem::find()
            .filter(prompt_backtest_item::Column::TaskId.eq(task_id))
            .filter(prompt_backtest_item::Column::Status.eq(ItemStatus::Pending.as_str()))
            .count(db)
            .await? as usize;

        Ok(Some(TaskProgress {
            task_id,
            status: task.status,
            total,
            completed: task.completed_count.max(0) as usize,
            failed: task.failed_count.max(0) as usize,
            pending,
        }))
    }
}
