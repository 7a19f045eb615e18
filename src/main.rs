//! cfnforge - CloudFormation template generator
//!
//! This is the main entry point for the cfnforge CLI.

mod cli;

use anyhow::Result;
use cfnforge::config::Config;
use cfnforge::error::Error;
use cli::output::OutputFormatter;
use cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    if let Err(err) = run(&cli) {
        OutputFormatter::new(!cli.no_color).error(&format!("{:#}", err));
        std::process::exit(exit_code(&err));
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Load configuration
    let config = Config::load(cli.config.as_ref())?;

    // Initialize logging based on verbosity
    init_logging(cli.verbosity(), &config.logging.log_level);

    cli.execute(&config)
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8, configured: &str) {
    let filter = match verbosity {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}

/// Exit status for a failed run
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::exit_code)
        .unwrap_or(1)
}
