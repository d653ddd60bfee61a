//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tidelog_types::calendar::date_to_day;
use tidelog_types::{DeviceId, Parts};
use time::{Date, Month};

#[derive(Parser)]
#[command(name = "tidelog")]
#[command(author, version, about = "Minute-resolution sensor log for aquaculture devices", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: <config dir>/tidelog/config.toml)
    #[arg(long, global = true, env = "TIDELOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, overriding `storage.path` from the config
    #[arg(long, global = true, env = "TIDELOG_DATABASE")]
    pub database: Option<PathBuf>,

    /// Caller identity, overriding `identity.caller` from the config
    #[arg(long, global = true, env = "TIDELOG_CALLER")]
    pub caller: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Reusable device selection argument
#[derive(Debug, Clone, Copy, Args)]
pub struct DeviceArg {
    /// Device id
    #[arg(short, long, value_parser = parse_device_id)]
    pub device: DeviceId,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new device
    Create {
        /// Device name
        #[arg(short, long)]
        name: String,

        /// Owner identity (default: the caller)
        #[arg(short, long)]
        owner: Option<String>,
    },

    /// Write the reading for the current minute
    Submit {
        #[command(flatten)]
        device: DeviceArg,

        #[command(flatten)]
        values: ReadingArgs,

        /// Timestamp in milliseconds since the Unix epoch (default: now)
        #[arg(long)]
        at: Option<u64>,
    },

    /// Show the reading stored at one minute of a day
    Get {
        #[command(flatten)]
        device: DeviceArg,

        /// Day number since the Unix epoch, or a date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        day: u64,

        /// Minute of the day (0-1439)
        #[arg(short, long)]
        minute: u16,
    },

    /// Show the most recent reading
    Latest {
        #[command(flatten)]
        device: DeviceArg,
    },

    /// Count the written minutes of a day
    Filled {
        #[command(flatten)]
        device: DeviceArg,

        /// Day number since the Unix epoch, or a date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        day: u64,
    },

    /// List all devices
    List,

    /// Display device information
    Info {
        #[command(flatten)]
        device: DeviceArg,
    },

    /// Export the readings of one day as CSV (`--json` is not supported)
    Export {
        #[command(flatten)]
        device: DeviceArg,

        /// Day number since the Unix epoch, or a date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        day: u64,
    },

    /// Show the write-notification feed, newest first
    Feed {
        /// Only show writes to this device
        #[arg(short, long, value_parser = parse_device_id)]
        device: Option<DeviceId>,

        /// Maximum number of entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,
    },
}

/// Measurement values as decimals with at most two fractional digits
#[derive(Debug, Clone, Copy, Args)]
pub struct ReadingArgs {
    /// Water temperature, e.g. 27.53
    #[arg(short, long)]
    pub temperature: Parts,

    /// pH, e.g. 7.2
    #[arg(short, long)]
    pub ph: Parts,

    /// Dissolved oxygen, e.g. 6.8
    #[arg(short, long)]
    pub oxygen: Parts,

    /// Salinity, e.g. 35.0
    #[arg(short, long)]
    pub salinity: Parts,
}

/// Parse a device id
fn parse_device_id(s: &str) -> Result<DeviceId, String> {
    s.parse::<u64>()
        .map(DeviceId)
        .map_err(|_| format!("'{}' is not a valid device id", s))
}

/// Parse a day given as a day number or as a `YYYY-MM-DD` date
fn parse_day(s: &str) -> Result<u64, String> {
    if let Ok(day) = s.parse::<u64>() {
        return Ok(day);
    }

    let invalid = || format!("'{}' is not a day number or YYYY-MM-DD date", s);
    let mut fields = s.splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(invalid());
    };
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let day: u8 = day.parse().map_err(|_| invalid())?;

    let month = Month::try_from(month).map_err(|_| invalid())?;
    let date = Date::from_calendar_date(year, month, day).map_err(|_| invalid())?;
    date_to_day(date).ok_or_else(|| format!("{} is before 1970-01-01", date))
}
