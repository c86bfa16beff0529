//! Entry point for the PRMS workspace service.
//! Handles CLI parsing, configuration and logging setup, and dispatches to the
//! HTTP server or one of the offline tools.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use tracing_subscriber::{fmt, EnvFilter};

use prms_workspace::config::AppConfig;
use prms_workspace::model_runs::model_run_name;
use prms_workspace::server;
use prms_workspace::timeseries::{add_values_into_json, add_values_into_netcdf, TemperatureUpdate};
use prms_workspace::vegetation::get_veg_map_by_hru;
use prms_workspace::workspace::use_default_model_run;

mod cli;

use cli::{Args, Command};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt().with_env_filter(filter).with_target(true).init();

    let mut config = AppConfig::load(args.config.as_deref())?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.threads {
        runtime_builder.worker_threads(threads);
    }
    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    match args.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen = listen;
            }
            runtime.block_on(server::serve(config))?;
        }
        Command::VegMap { file } => {
            let veg_map = get_veg_map_by_hru(&file)?;
            println!("{}", serde_json::to_string_pretty(&veg_map)?);
        }
        Command::Temperature { file } => {
            println!("{}", add_values_into_json(&file)?);
        }
        Command::Merge {
            file,
            values,
            output,
        } => {
            let contents = fs::read_to_string(&values)
                .with_context(|| format!("Failed to read {}", values.display()))?;
            let update: TemperatureUpdate = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", values.display()))?;
            add_values_into_netcdf(&file, &update, &output)?;
            println!("Saved updated file to {}", output.display());
        }
        Command::ModelRuns { token } => {
            let body = runtime.block_on(model_run_name(&token, &config.model_host))?;
            println!("{body}");
        }
        Command::StageDefault { email } => {
            let staged = use_default_model_run(&config, &email)?;
            println!("{}", serde_json::to_string_pretty(&staged)?);
        }
    }

    Ok(())
}
