//! NGL 工具集
//!
//! 提供日志初始化等在各 crate 之间共享的通用工具。

pub mod init_log;

pub use init_log::{init_log, init_test_log};
