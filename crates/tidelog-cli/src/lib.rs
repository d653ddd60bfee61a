//! Command-line interface for the tidelog minute store.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `create` | Register a device and print its id |
//! | `submit` | Write the reading for the current minute |
//! | `get` | Show the reading at one minute of a day |
//! | `latest` | Show the most recent reading |
//! | `filled` | Count the written minutes of a day |
//! | `list` | List all devices |
//! | `info` | Display device metadata |
//! | `export` | Write one day of readings as CSV |
//! | `feed` | Show recent write notifications |
//!
//! # Configuration
//!
//! Settings are read from `~/.config/tidelog/config.toml` (or platform equivalent):
//!
//! ```toml
//! [storage]
//! path = "/var/lib/tidelog/data.db"
//!
//! [identity]
//! caller = "0xfarm-operator"
//! writers = ["0xfield-tech"]
//! ```
//!
//! # Environment Variables
//!
//! - `TIDELOG_CALLER`: caller identity (overridden by `--caller`)
//! - `TIDELOG_DATABASE`: database path (overridden by `--database`)
//! - `TIDELOG_CONFIG`: configuration file (overridden by `--config`)
//! - `RUST_LOG`: log filter when neither `--verbose` nor `--quiet` is given
//!
//! # Examples
//!
//! ```bash
//! tidelog create --name pond-3
//! tidelog submit --device 1 --temperature 27.53 --ph 7.2 --oxygen 6.8 --salinity 35
//! tidelog latest --device 1 --json
//! tidelog export --device 1 --day 19000 > pond-3.csv
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
