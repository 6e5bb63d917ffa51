pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod schema;
pub mod ui;

use log::LevelFilter;
use std::{env, sync::OnceLock};

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::SalesError;
pub use pipeline::{AnalysisSummary, CleanOutcome};
pub use ui::{LogUi, Phase, SilentUi, Ui, UiApp};

static LOGGER: OnceLock<()> = OnceLock::new();

/// Info level for this crate unless `RUST_LOG` says otherwise
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_report", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}
