// 运行流程模块
pub mod args;
pub mod batch;
pub mod config;
pub mod console;
pub mod error;
pub mod keys;
pub mod prompt;
pub mod runlog;
pub mod script;
pub mod session;

pub use batch::{BatchExecutor, PendingBatch, RunEnd, RunSummary};
pub use console::{ConsoleReporter, JsonReporter, Reporter, Severity};
pub use session::{RunSession, open_connection};
