use framescrub::cli::{Args, Command};
use framescrub::config;
use framescrub::runner;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

fn main() -> Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Initialize logger based on --log flag
    if let Some(log_path_opt) = &args.log_file {
        // File logging with specified verbosity level
        let log_path = match log_path_opt {
            Some(path) => path.clone(),
            None => {
                if let Err(e) = config::ensure_dirs(&path_config) {
                    eprintln!("Warning: Failed to create application directories: {}", e);
                }
                config::config_file(config::LOG_FILE, &path_config)
            }
        };

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }

    info!("framescrub {} starting", env!("CARGO_PKG_VERSION"));
    debug!(
        "Config path: {}",
        config::config_file(config::SCENE_FILE, &path_config).display()
    );
    if let Command::Run(run) = &args.command {
        debug!("Run: {} ticks at {} Hz, {} scripted intents", run.ticks, run.fps, run.at.len());
    }

    runner::run_app(args)
}
