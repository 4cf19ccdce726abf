use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{ConfigOverrides, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "jd-preview")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Preview spreadsheets and extract structured fields from job descriptions")]
#[command(after_help = "EXAMPLES:\n  \
    jd-preview sheets jobs.xlsx\n  \
    jd-preview extract jobs.xlsx --sheet Open --column \"Job Description\"\n  \
    jd-preview text \"Senior Rust engineer, remote, 6 months\"")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to a RON configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Base URL of the extraction API, e.g. http://localhost:8000/api/v1/
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Directory for downloaded result spreadsheets
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    pub write_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a spreadsheet and list its sheets
    Sheets {
        file: PathBuf,
    },
    /// Extract fields from one column of a sheet
    Extract {
        file: PathBuf,
        /// Sheet id or name
        #[arg(long)]
        sheet: String,
        /// Zero-based column index or exact header text
        #[arg(long)]
        column: String,
        /// Rows to show in the preview
        #[arg(long)]
        rows: Option<usize>,
        /// Keep the results on the service instead of downloading them
        #[arg(long)]
        no_download: bool,
    },
    /// Extract fields from a single job description
    Text {
        jd: String,
    },
    /// Check that the extraction service is up
    Health,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        let row_window = match &self.command {
            Some(Command::Extract { rows, .. }) => *rows,
            _ => None,
        };
        ConfigOverrides {
            server: self.server.clone(),
            output_dir: self.out.clone(),
            row_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_arguments_parse() {
        let cli = Cli::try_parse_from([
            "jd-preview",
            "extract",
            "jobs.xlsx",
            "--sheet",
            "Open",
            "--column",
            "2",
            "--rows",
            "10",
            "--out",
            "results",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.row_window, Some(10));
        assert_eq!(overrides.output_dir, Some(PathBuf::from("results")));
        match cli.command {
            Some(Command::Extract {
                sheet,
                column,
                no_download,
                ..
            }) => {
                assert_eq!(sheet, "Open");
                assert_eq!(column, "2");
                assert!(!no_download);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["jd-preview", "-v", "-q", "health"]).is_err());
    }

    #[test]
    fn write_config_needs_no_command() {
        let cli = Cli::try_parse_from(["jd-preview", "--write-config"]).unwrap();
        assert!(cli.write_config);
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }
}
