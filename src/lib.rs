pub mod config;
pub mod duck;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod table;

pub use config::Config;
pub use pipeline::{run, RunSummary};
