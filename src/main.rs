use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use ttth::cli::{self, Cli, Command};
use ttth::config::{load_config_from, config_dir_path, AppConfig};

fn main() {
    if let Err(e) = real_main() {
        eprintln!("ttth: {}", e);
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config_from(cli.config_dir.clone().unwrap_or_else(config_dir_path));
    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| config.log_level.clone());

    // the window logs to a file, management commands to the terminal
    let _guard = match &cli.command {
        Command::Run { .. } => init_file_logging(&config, &level)?,
        _ => init_console_logging(&level),
    };

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config_dir = %config.config_dir.display(),
        "ttth starting"
    );

    match cli.command {
        Command::Run { minimized } => run(config, minimized),
        command => cli::execute(command, &config, &mut std::io::stdout().lock()),
    }
}

#[cfg(feature = "webview")]
fn run(config: AppConfig, minimized: bool) -> Result<(), Box<dyn std::error::Error>> {
    ttth::app::run(config, minimized)
}

#[cfg(not(feature = "webview"))]
fn run(_config: AppConfig, _minimized: bool) -> Result<(), Box<dyn std::error::Error>> {
    Err("this build has no window; rebuild with `--features webview`".into())
}

fn init_console_logging(level: &str) -> Option<WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    None
}

fn init_file_logging(
    config: &AppConfig,
    level: &str,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("ttth")
        .filename_suffix("log")
        .max_log_files(7)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    Ok(Some(guard))
}
