//! CLI command handling

pub mod dashboard;
pub mod fetch;
pub mod hook;
pub mod output;
pub mod setup;
pub mod sources;
pub mod uninstall;

pub use dashboard::*;
pub use fetch::*;
pub use hook::*;
pub use output::*;
pub use setup::*;
pub use sources::*;
pub use uninstall::*;
