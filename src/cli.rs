// File: ./src/cli.rs
//! Command-line arguments and logging setup shared by the binary.
use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;

pub const DEBUG_ENV: &str = "NEXTACT_DEBUG";

/// nextact - surface the next actions of your Markdown notes
#[derive(Parser, Debug)]
#[command(name = "nextact")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    NEXTACT_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Use a different directory for config
    #[arg(short = 'r', long, global = true)]
    pub root: Option<PathBuf>,

    /// Root directory of the notes (overrides the config file)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub today: Option<chrono::NaiveDate>,

    /// Enable debug logging on stderr
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the next actions, highest priority first (default)
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Complete a task; recurring tasks move to their next start date
    Done {
        /// Document path or name, e.g. `Projects/House.md` or `house`
        document: String,
        /// Task text, or a unique part of it
        task: String,
    },

    /// Reopen a completed task
    Undo {
        /// Document path or name
        document: String,
        /// Task text, or a unique part of it
        task: String,
    },

    /// Show when a recurrence rule fires next
    Next {
        /// Rule as written inside @recur(...), e.g. `monthly,day=last`
        rule: String,

        /// Anchor date (defaults to today)
        #[arg(long)]
        anchor: Option<chrono::NaiveDate>,
    },

    /// Show the config file path and effective settings
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,
    },
}

impl Cli {
    pub fn debug_enabled(&self) -> bool {
        self.debug
            || std::env::var(DEBUG_ENV)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
    }
}

/// Logs to stderr: warnings by default, everything from this crate in debug mode.
pub fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("nextact")
        .build();
    // A logger may already be installed when embedded; keep it.
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["nextact"]).unwrap();
        assert_eq!(cli.command, None);
        assert!(!cli.debug);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nextact",
            "done",
            "house",
            "Paint the hallway",
            "--today",
            "2024-03-01",
            "--vault",
            "/notes",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Done {
                document: "house".to_string(),
                task: "Paint the hallway".to_string()
            })
        );
        assert_eq!(cli.today, chrono::NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(cli.vault, Some(PathBuf::from("/notes")));
    }

    #[test]
    fn test_invalid_date_rejected() {
        assert!(Cli::try_parse_from(["nextact", "--today", "2024-02-30"]).is_err());
    }
}
