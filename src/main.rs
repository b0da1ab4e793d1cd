//! RPC Transport Bench - Main CLI Application
//!
//! Benchmarks echo RPC latency over HTTP/2 and HTTP/3 across a matrix of
//! emulated network conditions.

use clap::Parser;
use rpc_transport_bench::{
    app::App,
    cli::Cli,
    config::{display_config_summary, load_config, EnvManager},
    error::{AppError, Result},
};
use std::process;

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();
    let use_color = !cli.no_color;

    if let Err(e) = run_application(cli) {
        eprintln!("{}", e.format_for_console(use_color));
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

fn run_application(cli: Cli) -> Result<()> {
    cli.validate().map_err(AppError::config)?;

    if cli.env_help {
        println!("{}", EnvManager::display_env_help());
        return Ok(());
    }

    let show_config = cli.show_config;
    let config = load_config(cli)?;

    if show_config {
        println!("{}", display_config_summary(&config));
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(App::new(config).run())?;
    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) | AppError::Parse(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (see --env-help)");
            eprintln!("  - Test cases are written delay:loss, comma separated (e.g. 0:3,75:3)");
            eprintln!("  - Controller URL must include a scheme (http://host:port)");
        }
        AppError::Controller(_) | AppError::ConditionApply(_) => {
            eprintln!();
            eprintln!("Controller troubleshooting:");
            eprintln!("  - Check that the emulation router is reachable");
            eprintln!("  - Run without --controller-url to record conditions only");
        }
        AppError::Io(_) | AppError::Report(_) => {
            eprintln!();
            eprintln!("Check that the output directory is writable (--output-dir)");
        }
        _ => {}
    }
}
