use anyhow::Context;
use log::{error, info};
use promptbt::ai::ModelClient;
use promptbt::backtest::{PromptBacktestExecutor, TaskRunOutcome};
use promptbt::config::ExecutorConfig;
use promptbt::storage;
use std::sync::Arc;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("promptbt", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error)
        .parse_env("RUST_LOG")
        .init();

    let task_ids = std::env::args()
        .skip(1)
        .map(|a| {
            a.parse::<i32>()
                .with_context(|| format!("无效的任务 ID: {}", a))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if task_ids.is_empty() {
        anyhow::bail!("用法: promptbt <task_id>...");
    }

    let config = ExecutorConfig::from_env();
    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://promptbt.db?mode=rwc".to_string());
    let db = storage::establish_connection(&db_url)
        .await
        .with_context(|| format!("数据库连接失败: {}", db_url))?;

    let client = ModelClient::new(config.model.clone())?;
    let executor = PromptBacktestExecutor::new(Arc::new(db), Arc::new(client), config);

    for task_id in task_ids {
        match executor.execute_task(task_id).await {
            Ok(TaskRunOutcome::Completed { completed, failed }) => {
                info!("任务 [{}] 结束: 成功 {}，失败 {}", task_id, completed, failed)
            }
            Ok(other) => info!("任务 [{}] 未执行: {:?}", task_id, other),
            Err(e) => error!("任务 [{}] 执行出错: {}", task_id, e),
        }
        if let Ok(Some(p)) = executor.progress(task_id).await {
            println!("{}", serde_json::to_string(&p)?);
        }
    }

    Ok(())
}
