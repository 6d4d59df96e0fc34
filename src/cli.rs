use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "blocksmith")]
#[command(about = "Turns an introspected library object graph into visual programming blocks")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Where to write it (defaults to Blocksmith.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Report every node the walker visits
    Examine {
        /// Graph snapshot to read
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also descend into members named by the traversal sentinel
        #[arg(long)]
        force_show_everything: bool,

        /// Print host identities next to each path
        #[arg(long)]
        show_ids: bool,
    },

    /// Generate block definitions and the toolbox
    Generate {
        /// Graph snapshot to read
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a JSON summary of the walked model
    Summary {
        /// Graph snapshot to read
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path } => {
                engine.init(path).await
            }
            Commands::Examine { graph, output, force_show_everything, show_ids } => {
                engine.examine(graph, output, force_show_everything, show_ids).await
            }
            Commands::Generate { graph, output } => {
                engine.generate(graph, output).await
            }
            Commands::Summary { graph, output } => {
                engine.summary(graph, output).await
            }
        }
    }
}
