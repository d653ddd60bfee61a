//! Command implementations for the CLI.

mod device;
mod export;
mod feed;
mod query;
mod submit;

pub use device::{cmd_create, cmd_info, cmd_list};
pub use export::cmd_export;
pub use feed::cmd_feed;
pub use query::{cmd_filled, cmd_get, cmd_latest};
pub use submit::cmd_submit;
