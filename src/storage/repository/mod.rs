pub mod account_repo;
pub mod backtest_repo;

pub use account_repo::AccountRepository;
pub use backtest_repo::{NewItem, PromptBacktestRepository};
