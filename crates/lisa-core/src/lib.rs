pub mod config;
pub mod errors;
pub mod execution_log;
pub mod model;
pub mod perf;
pub mod run;
pub mod storage;
pub mod suite;
pub mod vm;
