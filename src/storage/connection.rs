use crate::storage::entity::{
    account, account_prompt_binding, prompt_backtest_item, prompt_backtest_task, prompt_template,
};
use log::info;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use std::time::Duration;

pub async fn establish_connection(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let in_memory = db_url.contains(":memory:");
    let mut opt = ConnectOptions::new(db_url.to_owned());
    opt.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);
    if in_memory {
        // 内存库每个连接各自独立，只能保留一个连接
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(10)
            .min_connections(2)
            .idle_timeout(Duration::from_secs(60));
    }

    let db = Database::connect(opt).await?;

    if !in_memory {
        // 启用 WAL 模式，worker 并发写入结果时读不阻塞
        let _ = db
            .execute(sea_orm::Statement::from_string(
                sea_orm::DatabaseBackend::Sqlite,
                "PRAGMA journal_mode=WAL;".to_string(),
            ))
            .await?;
    }

    create_table(&db, account::Entity).await?;
    create_table(&db, prompt_template::Entity).await?;
    create_table(&db, account_prompt_binding::Entity).await?;
    create_table(&db, prompt_backtest_task::Entity).await?;
    create_table(&db, prompt_backtest_item::Entity).await?;

    // 按任务取 pending 明细是最热的查询
    db.execute(sea_orm::Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_prompt_backtest_items_task_status ON prompt_backtest_items(task_id, status);"
            .to_string(),
    ))
    .await?;

    info!("Database connection established and tables initialized.");

    Ok(db)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = builder.build(schema.create_table_from_entity(entity).if_not_exists());
    db.execute(stmt).await?;
    Ok(())
}
