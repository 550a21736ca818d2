mod command_script;
mod commands;
mod logging;
mod progress;
mod raster;

use std::process;

use anyhow::{anyhow, bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use command_script::CommandScript;
use commands::{Cli, Commands};
use dotenv::dotenv;
use omero_batch_core::config::{load_configuration, AppConfig, InputConfig};
use omero_batch_core::script::parse_arguments;
use omero_batch_core::source::LocalImages;
use omero_batch_core::{BatchRunner, Inputs, RunStatus};
use progress::CliMonitor;
use raster::RasterIo;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Run { arguments }) => {
            if let Err(err) = run_batch(&config, arguments.as_deref()) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::List) => {
            if let Err(err) = run_list(&config) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

/// This binary has no OMERO client: only local input and output are accepted.
fn ensure_local(config: &AppConfig) -> anyhow::Result<()> {
    if let InputConfig::Remote { dataset_id } = config.input {
        bail!(
            "input dataset {} is remote, but this build has no OMERO client",
            dataset_id
        );
    }
    if config.params.output_on_remote {
        bail!("remote output is requested, but this build has no OMERO client");
    }
    Ok(())
}

fn run_batch(config: &AppConfig, arguments: Option<&str>) -> anyhow::Result<()> {
    ensure_local(config)?;

    let command = config
        .script
        .command
        .clone()
        .context("no script command configured (script.command)")?;
    let declared = parse_arguments(&config.script.arguments)?;
    let configured = match arguments {
        Some(arguments) => parse_arguments(arguments)?,
        None => Inputs::new(),
    };

    let script = CommandScript::new(command, config.script.args.clone()).with_declared(declared);
    let runner = BatchRunner::new(
        config.input.clone(),
        config.params.clone(),
        Box::new(RasterIo),
        Box::new(script),
    )
    .with_inputs(configured)
    .with_monitor(Box::new(CliMonitor::new()));

    let report = runner
        .spawn()?
        .join()
        .map_err(|_| anyhow!("batch thread panicked"))?;

    println!();
    info!(
        "{} images: {} processed, {} failed",
        report.total_units,
        format!("{}", report.processed_units).green(),
        format!("{}", report.failed_units).red(),
    );
    if let (true, Some(dir)) = (config.params.output_on_local, &config.params.local_output_dir) {
        info!("Outputs written to {}", dir.display().to_string().cyan());
    }

    match report.status {
        RunStatus::Failed(message) => bail!("batch failed: {}", message),
        RunStatus::Cancelled => {
            info!("{}", "Batch cancelled".yellow());
            Ok(())
        }
        RunStatus::Completed => Ok(()),
    }
}

fn run_list(config: &AppConfig) -> anyhow::Result<()> {
    ensure_local(config)?;
    let InputConfig::Local {
        directory,
        recursive,
        ignore_patterns,
    } = &config.input
    else {
        return Ok(());
    };

    let images = LocalImages::scan(&RasterIo, directory, *recursive, ignore_patterns)?;
    for (path, reason) in images.failures() {
        println!("{} {} ({})", "skip".red(), path.display(), reason);
    }
    let total = images.size();
    for unit in images.into_units() {
        println!("{} {}", unit.progress.dimmed(), unit);
    }
    info!("{} images to process", format!("{}", total).green());
    Ok(())
}
