// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::path::PathBuf;

use crate::helpers::telemetry::setup_simple_tracing;
use crate::{print_config, simulate};
use anyhow::Result;
use clap::{command, ArgAction, Parser, Subcommand};
use tally_config::{load_config, CoordinatorConfig};
use tally_data::SledDb;
use tracing::{info, instrument, Level};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "A CLI for running the Tally confidential batch aggregation coordinator", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,

    /// Indicate error levels by adding additional `-v` arguments. Eg. `tally -vvv` will give you
    /// trace level output
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true
    )]
    pub verbose: u8,

    /// Silence all output. This argument cannot be used alongside `-v`
    #[arg(
        short,
        long,
        action = ArgAction::SetTrue,
        conflicts_with = "verbose",
        global = true
    )]
    quiet: bool,

    /// The coordinator name (used for logs)
    #[arg(long, global = true)]
    pub name: Option<String>,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,  //
                1 => Level::INFO,  // -v
                2 => Level::DEBUG, // -vv
                _ => Level::TRACE, // -vvv
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn execute(self) -> Result<()> {
        setup_simple_tracing(self.log_level());

        let config = self.load_config()?;
        info!("Config loaded from: {:?}", config.config_file());

        match self.command {
            Commands::Simulate {
                contributions,
                seed,
            } => simulate::execute(&config, contributions, seed).await?,
            Commands::Config => print_config::execute(&config)?,
        }

        SledDb::close_all_connections();

        Ok(())
    }

    pub fn load_config(&self) -> Result<CoordinatorConfig> {
        let mut config = load_config(self.config.clone())?;
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one aggregation round against local stand-in collaborators
    Simulate {
        /// Number of contributions to submit to the open batch
        #[arg(long, default_value_t = 3)]
        contributions: u64,

        /// Seed for the generated contribution values
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the resolved configuration as YAML
    Config,
}
