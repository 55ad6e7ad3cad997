//! Stdout logging using env_logger
//!
//! Lines look like `INFO:self_approver::engine:Pull Request #1 approved`.
//! The level defaults to `info` and follows `RUST_LOG` when set.

use env_logger::{Builder, Env};
use std::io::Write;

/// Initialize logging for the process
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{}:{}",
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        })
        .init();
}
