use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "omero-batch")]
#[command(about = "Run an analysis script over a batch of microscopy images", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the configured script over every input image
    Run {
        /// Script inputs as `name=value,...`, overriding the configured ones
        #[arg(long)]
        arguments: Option<String>,
    },
    /// List the images a run would process, without running anything
    List,
    /// Print configuration values
    PrintConfig,
}
