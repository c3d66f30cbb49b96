mod cli;
mod error_fmt;
mod logging;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::SimulateArgs;

fn load_config(path: &Path) -> eyre::Result<staircase_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
    staircase_config::load_toml(&text)
        .map_err(eyre::Report::new)
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    logging::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    cfg.validate().wrap_err("invalid configuration")?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::SelfCheck => {
            tracing::info!("self-check ok");
            if cli.json {
                println!("{}", serde_json::json!({ "status": "ok" }));
            } else {
                println!("OK");
            }
        }
        Commands::Simulate {
            trials,
            seed,
            threshold,
            spread,
            out,
            protocol,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("failed to install Ctrl-C handler")?;

            let args = SimulateArgs {
                trials,
                seed,
                threshold,
                spread,
                out,
                protocol,
            };
            let output = run::simulate(&cfg, &args, &shutdown)?;
            print_lines(&run::render(&output, cli.json));
        }
        Commands::Estimate { trials } => {
            let output = run::estimate_file(&cfg, &trials)?;
            print_lines(&run::render(&output, cli.json));
        }
    }
    Ok(())
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}
