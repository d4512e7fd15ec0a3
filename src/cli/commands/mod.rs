//! CLI command implementations.

mod ask;
mod config;
mod ingest;
mod list;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use ingest::{run_append, run_ingest};
pub use list::run_list;
pub use serve::{router, run_serve, AppState};
