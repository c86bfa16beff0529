//! Defines command-line interface options using `clap` for the PRMS workspace service.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Server and tools for PRMS model inputs
#[derive(Parser, Debug)]
#[command(
    version,
    name = "prms-workspace",
    about = "NetCDF, model-run and user workspace service for PRMS modeling"
)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "PRMS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Number of runtime worker threads. Defaults to number of CPU cores.
    #[arg(short = 't', long, env = "PRMS_WORKER_THREADS")]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        /// Listen address, overrides the configuration file
        #[arg(short, long, env = "PRMS_LISTEN_ADDR")]
        listen: Option<String>,
    },

    /// Print the vegetation map of a PRMS parameter file as JSON
    VegMap {
        /// Path to the parameter NetCDF file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the temperature series of a PRMS data file as JSON
    Temperature {
        /// Path to the data NetCDF file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Merge temperature values from a JSON file into a data file and move it
    Merge {
        /// Path to the data NetCDF file to update
        #[arg(short, long)]
        file: PathBuf,

        /// JSON file with a `temperature_values` object
        #[arg(long)]
        values: PathBuf,

        /// Where the updated file is moved to
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List finished model runs visible to an API token
    ModelRuns {
        /// Model API session token
        #[arg(long, env = "PRMS_API_TOKEN")]
        token: String,
    },

    /// Copy the default inputs into a user's workspace
    StageDefault {
        /// Email of the user
        #[arg(long, value_parser = parse_email)]
        email: String,
    },
}

fn parse_email(s: &str) -> Result<String, String> {
    match s.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(s.to_string()),
        _ => Err("Invalid format: Expected '<name>@<domain>'.".to_string()),
    }
}
