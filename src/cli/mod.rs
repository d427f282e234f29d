pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, DiagnoseArgs, OutputFormatArg, RebuildArgs};
pub use output::{OutputFormat, OutputFormatter};
