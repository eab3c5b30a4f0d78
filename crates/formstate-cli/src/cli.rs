//! CLI argument definitions for the `formstate` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "formstate",
    version,
    about = "Replay form sessions against a form definition",
    long_about = "Load a form definition (initial values, rules, labels) and replay a\n\
                  scripted session of change, blur and submit events against it.\n\
                  Prints every step, the final field states and the form status."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow raw field values in trace output.
    ///
    /// Values typed into forms often hold personal data, so they are
    /// redacted unless this flag is given.
    #[arg(long = "log-values", global = true)]
    pub log_values: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a scripted session and print the resulting form state.
    Run(RunArgs),

    /// Load a definition, compile its rules and validate the initial values.
    Check(CheckArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Form definition (JSON).
    #[arg(value_name = "DEFINITION")]
    pub definition: PathBuf,

    /// Session script (JSON array of steps).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Print the final status as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Form definition (JSON).
    #[arg(value_name = "DEFINITION")]
    pub definition: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
