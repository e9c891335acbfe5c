use crate::decision::{truncate_chars, MAX_RAW_CHARS};
use serde::{Deserialize, Serialize};

/// 单条错误信息最大保留字符数
pub const MAX_ERROR_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }
}

/// 分发给 worker 的单条输入（纯值，不带数据库记录）
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub item_id: i32,
    pub task_id: i32,
    pub modified_prompt: String,
    pub original_operation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedItem {
    pub operation: Option<String>,
    pub symbol: Option<String>,
    pub target_portion: Option<f64>,
    pub reasoning: Option<String>,
    pub decision_json: String,
    pub decision_changed: bool,
    pub change_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub error: String,
    pub raw_response: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Completed(CompletedItem),
    Failed(FailedItem),
}

impl ItemOutcome {
    /// 构造失败结果，错误截断到 500 字符，原始响应截断到 2000 字符
    pub fn failed(error: impl AsRef<str>, raw_response: Option<&str>) -> Self {
        ItemOutcome::Failed(FailedItem {
            error: truncate_chars(error.as_ref(), MAX_ERROR_CHARS),
            raw_response: raw_response.map(|r| truncate_chars(r, MAX_RAW_CHARS)),
        })
    }
}

/// 供轮询方查询的任务进度
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskProgress {
    pub task_id: i32,
    pub status: String,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
}

/// 一次执行的结局
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRunOutcome {
    NotFound,
    /// 任务不在 pending 状态，不重复执行
    Skipped(String),
    AccountMissing,
    Completed { completed: i32, failed: i32 },
}

#[derive(thiserror::Error, Debug)]
pub enum ExecutorError {
    #[error("storage error: {0}")]
    Db(#[from] sea_orm::DbErr),
}
