use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Rebuild and diagnose the local development stack
#[derive(Parser, Debug)]
#[command(
    name = "devstack",
    about = "Rebuild and diagnose the local development stack",
    version,
    author,
    long_about = "devstack regenerates schemas, rebuilds every binary, regenerates configuration \
                  and restarts the running stack in dependency order. Failed steps are saved \
                  so `devstack diagnose` can match their output against known failure patterns."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "FILE", help = "Settings file (defaults to ./devstack.yaml)")]
    pub settings: Option<PathBuf>,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Rebuild the stack",
        long_about = "Regenerates schemas, rebuilds binaries, regenerates configuration and \
                      restarts running services. Steps whose dependencies failed are skipped; \
                      independent steps always run.\n\n\
                      Examples:\n  \
                      devstack rebuild\n  \
                      devstack rebuild --concurrent\n  \
                      devstack rebuild --format json"
    )]
    Rebuild(RebuildArgs),

    #[command(
        about = "Explain the failures of a saved rebuild",
        long_about = "Loads a saved rebuild report (the latest by default) and matches each \
                      failed step's output against the known failure patterns.\n\n\
                      Examples:\n  \
                      devstack diagnose\n  \
                      devstack diagnose --all\n  \
                      devstack diagnose ~/.local/share/devstack/reports/rebuild-20250101T120000.000Z.json"
    )]
    Diagnose(DiagnoseArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RebuildArgs {
    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,

    #[arg(long, help = "Build the independent binaries concurrently")]
    pub concurrent: bool,

    #[arg(long, help = "Report every restarted service")]
    pub verbose_restart: bool,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "How long to wait for the API service to become ready"
    )]
    pub ready_timeout: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct DiagnoseArgs {
    #[arg(value_name = "REPORT", help = "Saved report file (defaults to the latest run)")]
    pub report: Option<PathBuf>,

    #[arg(short = 'a', long, help = "Show every matching pattern, not just the best")]
    pub all: bool,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
