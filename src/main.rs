use devstack::cli::commands::{CliArgs, Commands, DiagnoseArgs, RebuildArgs};
use devstack::cli::output::{OutputFormat, OutputFormatter};
use devstack::diagnostics::{
    diagnose_report, DiagnosisMode, FileDiagnosticStore, PatternMatcher, StoreError,
};
use devstack::pipeline::{ExecutionPolicy, PipelineConfig, RebuildPipeline, StackLayout};
use devstack::progress::LoggingHandler;
use devstack::report::RebuildReport;
use devstack::services::{DockerLifecycle, ShellBuilder, ShellConfigGenerator};
use devstack::settings::Settings;
use devstack::util::logging::{init_logging, parse_level, LoggingConfig};
use devstack::{NAME, VERSION};

use clap::Parser;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};

const EXIT_FAILED: i32 = 1;
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    let settings = Settings::load(args.settings.as_deref());
    init_logging_from_args(&args, settings.as_ref().ok());

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let settings = match settings {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("\nCheck devstack.yaml and the DEVSTACK_* environment variables.");
            process::exit(EXIT_FAILED);
        }
    };

    let exit_code = match &args.command {
        Commands::Rebuild(rebuild_args) => handle_rebuild(rebuild_args, settings).await,
        Commands::Diagnose(diagnose_args) => handle_diagnose(diagnose_args, &settings),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, settings: Option<&Settings>) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        settings
            .map(|s| parse_level(&s.log_level))
            .unwrap_or(Level::INFO)
    };

    let config = LoggingConfig::from_env();
    let use_json = args.log_json || config.use_json;
    init_logging(LoggingConfig { level, ..config }.json(use_json));
}

fn report_store(settings: &Settings) -> Result<FileDiagnosticStore, StoreError> {
    match &settings.report_dir {
        Some(dir) => Ok(FileDiagnosticStore::new(dir.clone())),
        None => FileDiagnosticStore::default_dir().map(FileDiagnosticStore::new),
    }
}

async fn handle_rebuild(args: &RebuildArgs, settings: Arc<Settings>) -> i32 {
    info!(workspace = %settings.workspace.display(), "Preparing rebuild");

    let lifecycle = match DockerLifecycle::connect(settings.clone()) {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            error!("Failed to initialize service lifecycle: {}", e);
            eprintln!("\nPossible solutions:");
            eprintln!("  - Ensure the Docker daemon is running");
            eprintln!("  - Check DOCKER_HOST if you use a remote daemon");
            return EXIT_FAILED;
        }
    };

    let store = match report_store(&settings) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to locate report directory: {}", e);
            eprintln!("\nSet report_dir in devstack.yaml or DEVSTACK_REPORT_DIR.");
            return EXIT_FAILED;
        }
    };
    debug!("Reports are saved to {}", store.dir().display());

    let mut config =
        PipelineConfig::from_settings(&settings).with_verbose_restart(args.verbose_restart);
    if args.concurrent {
        config = config.with_policy(ExecutionPolicy::Concurrent);
    }
    if let Some(secs) = args.ready_timeout {
        config = config.with_ready_timeout(Duration::from_secs(secs));
    }

    let pipeline = RebuildPipeline::new(
        Arc::new(ShellBuilder::new(settings.clone())),
        Arc::new(lifecycle),
        Arc::new(ShellConfigGenerator::new(settings.clone())),
        Arc::new(store),
    )
    .with_progress(Arc::new(LoggingHandler))
    .with_layout(StackLayout::from_settings(&settings))
    .with_config(config);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling rebuild");
            signal_token.cancel();
        }
    });

    let formatter = OutputFormatter::new(args.format.into());
    match pipeline.run(cancel).await {
        Ok(report) => {
            info!(run = %report.run_id, "Rebuild succeeded");
            print_report(&formatter, &report);
            0
        }
        Err(e) => {
            let code = if e.is_cancelled() {
                EXIT_CANCELLED
            } else {
                EXIT_FAILED
            };
            match e.report() {
                Some(report) => {
                    warn!("{}", e);
                    print_report(&formatter, report);
                }
                None => error!("Rebuild aborted: {}", e),
            }
            code
        }
    }
}

fn print_report(formatter: &OutputFormatter, report: &RebuildReport) {
    match formatter.format_report(report) {
        Ok(output) => println!("{}", output),
        Err(e) => error!("Failed to format rebuild report: {}", e),
    }
}

fn handle_diagnose(args: &DiagnoseArgs, settings: &Settings) -> i32 {
    let store = match report_store(settings) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to locate report directory: {}", e);
            return EXIT_FAILED;
        }
    };

    let loaded = match &args.report {
        Some(path) => {
            debug!("Loading report from {}", path.display());
            store.load(path)
        }
        None => store.latest(),
    };
    let report = match loaded {
        Ok(report) => report,
        Err(StoreError::NotFound(dir)) => {
            error!("No saved rebuild reports in {}", dir.display());
            eprintln!("\nRun `devstack rebuild` first.");
            return EXIT_FAILED;
        }
        Err(e) => {
            error!("Failed to load report: {}", e);
            return EXIT_FAILED;
        }
    };

    let matcher = match PatternMatcher::with_builtin_catalog() {
        Ok(matcher) => matcher,
        Err(e) => {
            error!("Failed to build pattern catalog: {}", e);
            return EXIT_FAILED;
        }
    };

    let mode = if args.all {
        DiagnosisMode::All
    } else {
        DiagnosisMode::Best
    };
    let diagnosed = diagnose_report(&matcher, &report, mode);
    info!(
        run = %report.run_id,
        failed_steps = diagnosed.len(),
        "Diagnosed saved report"
    );

    let format: OutputFormat = args.format.into();
    match OutputFormatter::new(format).format_diagnoses(&report, &diagnosed) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format diagnoses: {}", e);
            EXIT_FAILED
        }
    }
}
