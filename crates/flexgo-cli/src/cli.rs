//! Clap derive structures for the `flexgo` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use flexgo_core::PresetMode;

/// flexgo - control a Flexit GO ventilation unit from the command line
#[derive(Debug, Parser)]
#[command(
    name = "flexgo",
    version,
    about = "Read and control a Flexit GO ventilation unit",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Flexit GO account (e-mail address)
    #[arg(long, short = 'u', env = "FLEXGO_USERNAME", global = true)]
    pub username: Option<String>,

    /// Account password; falls back to the keychain, then a prompt
    #[arg(long, env = "FLEXGO_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Value for the Ocp-Apim-Subscription-Key header
    #[arg(long, env = "FLEXGO_SUBSCRIPTION_KEY", global = true, hide_env_values = true)]
    pub subscription_key: Option<String>,

    /// API base URL
    #[arg(long, env = "FLEXGO_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long, env = "FLEXGO_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Token file (overrides the config)
    #[arg(long, env = "FLEXGO_TOKEN_FILE", global = true)]
    pub token_file: Option<PathBuf>,

    /// Never read or write the OS keychain
    #[arg(long, global = true)]
    pub no_keyring: bool,

    /// Also write logs to this file
    #[arg(long, env = "FLEXGO_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the token
    Login,
    /// Show authentication state and token expiry
    Status,
    /// List plants registered to the account
    Plants,
    /// Read all sensor values
    Sensors,
    /// Show controller identity and health
    Device,
    /// Switch ventilation mode
    SetMode(SetModeArgs),
    /// Set the home temperature setpoint
    SetHomeTemp { celsius: f64 },
    /// Set the away temperature setpoint
    SetAwayTemp { celsius: f64 },
    /// Set how long fireplace mode runs
    SetFireplaceDuration { minutes: u32 },
    /// Set how long boost (timed high) runs
    SetBoostDuration { minutes: u32 },
    /// Set the delay before away mode takes effect
    SetAwayDelay { minutes: u32 },
    /// Turn the electric heater on or off
    Heater { state: Switch },
    /// Hand mode control back to the week calendar
    CalendarActive,
    /// Write the calendar temporary override datapoint
    CalendarOverride { value: String },
    /// Delete the stored password and token
    Forget,
}

#[derive(Debug, Args)]
pub struct SetModeArgs {
    /// HOME, AWAY, AWAY_DELAYED, HIGH, HIGH_ONTIMER or FIREPLACE
    #[arg(value_parser = parse_mode)]
    pub mode: PresetMode,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

fn parse_mode(raw: &str) -> Result<PresetMode, String> {
    raw.parse()
}
