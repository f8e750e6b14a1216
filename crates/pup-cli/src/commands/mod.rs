//! CLI subcommand implementations.

pub mod delete;
pub mod dismiss;
pub mod events;
pub mod history;
pub mod log;
pub mod patterns;
pub mod status;
pub mod streak;
pub mod timeline;
pub mod util;
