use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "alembic")]
#[command(author, version, about = "File conversion service with asynchronous job orchestration")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the conversion server
    Start {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Convert a single file locally
    Convert {
        /// Input file
        #[arg(required = true)]
        input: PathBuf,

        /// Output file; its extension determines the target format
        #[arg(required = true)]
        output: PathBuf,

        /// Target format, overriding the output extension
        #[arg(long)]
        to: Option<String>,

        /// Quality setting for media conversion (CRF)
        #[arg(long)]
        quality: Option<u32>,

        /// Resolution for document rasterization
        #[arg(long)]
        dpi: Option<u32>,
    },

    /// List supported formats per backend family
    Formats,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
