use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "prompt_backtest_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub task_id: i32,
    pub modified_prompt: String,
    pub original_operation: Option<String>,
    pub status: String, // pending/completed/failed

    // 回测结果，仅 completed 时写入
    #[sea_orm(nullable)]
    pub new_operation: Option<String>,
    #[sea_orm(nullable)]
    pub new_symbol: Option<String>,
    #[sea_orm(nullable)]
    pub new_target_portion: Option<f64>,
    #[sea_orm(nullable)]
    pub new_reasoning: Option<String>,
    #[sea_orm(nullable)]
    pub new_decision_json: Option<String>,
    #[sea_orm(nullable)]
    pub decision_changed: Option<bool>,
    #[sea_orm(nullable)]
    pub change_type: Option<String>,

    // 失败时的错误与原始响应
    pub error_message: Option<String>,
    #[sea_orm(nullable)]
    pub raw_response: Option<String>,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
