pub mod ai;
pub mod backtest;
pub mod config;
pub mod decision;
pub mod storage;
