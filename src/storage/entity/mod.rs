pub mod account;
pub mod account_prompt_binding;
pub mod prompt_backtest_item;
pub mod prompt_backtest_task;
pub mod prompt_template;

pub use account::Entity as Account;
pub use account_prompt_binding::Entity as AccountPromptBinding;
pub use prompt_backtest_item::Entity as PromptBacktestItem;
pub use prompt_backtest_task::Entity as PromptBacktestTask;
pub use prompt_template::Entity as PromptTemplate;
