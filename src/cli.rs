use crate::config::Config;
use crate::ics::LineEnding;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// icstrim - Trim iCalendar files down to the events inside a date window
#[derive(Debug, Parser)]
#[command(name = "icstrim")]
#[command(
    about = "Trim iCalendar files down to the events inside a date window",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Command to execute (if not specified, trims the input directory)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: TrimArgs,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigActions {
    /// Print the effective configuration
    Show,

    /// Print the default configuration file path
    Path,
}

/// Flags that override the configuration file.
#[derive(Debug, Default, Args)]
pub struct TrimArgs {
    /// Directory to read calendar files from
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Directory to write trimmed files to
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Window start (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub start: Option<String>,

    /// Window end, inclusive (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub end: Option<String>,

    /// Drop recurring events that fall outside the window
    #[arg(long)]
    pub drop_recurring: bool,

    /// Fail on unknown time zones instead of ignoring the zone
    #[arg(long)]
    pub strict_time_zones: bool,

    /// Keep events missing END:VEVENT instead of failing the file
    #[arg(long)]
    pub flush_unterminated: bool,

    /// Line terminator for output files (crlf, lf)
    #[arg(long)]
    pub line_ending: Option<LineEnding>,

    /// Log a line for every kept or removed event
    #[arg(long, short)]
    pub verbose: bool,
}

impl TrimArgs {
    /// Layer the command-line flags over `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.files.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            config.files.output_dir = output.clone();
        }
        if let Some(start) = &self.start {
            config.window.start = Some(start.clone());
        }
        if let Some(end) = &self.end {
            config.window.end = Some(end.clone());
        }
        if let Some(line_ending) = self.line_ending {
            config.files.line_ending = line_ending;
        }
        if self.drop_recurring {
            config.trim.keep_recurring_events = false;
        }
        if self.strict_time_zones {
            config.trim.ignore_invalid_time_zones = false;
        }
        if self.flush_unterminated {
            config.trim.flush_unterminated_events = true;
        }
        if self.verbose {
            config.trim.verbose_logs = true;
        }
    }
}
