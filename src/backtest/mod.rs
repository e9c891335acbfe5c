pub mod executor;
pub mod model;
pub mod processor;

pub use executor::PromptBacktestExecutor;
pub use model::{ExecutorError, ItemOutcome, TaskProgress, TaskRunOutcome};
pub use processor::ItemProcessor;
