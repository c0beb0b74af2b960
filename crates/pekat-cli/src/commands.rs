//! Subcommand definitions.

use clap::{Args, Subcommand};
use pekat_core::ResultKind;
use std::path::PathBuf;

/// What to do once the analyzer is up.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze encoded image files (PNG, JPEG, ...)
    Analyze {
        /// Image files to analyze, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Analyze a file of raw RGB pixels (width * height * 3 bytes)
    AnalyzeRaw {
        /// Raw pixel file
        file: PathBuf,

        /// Image width in pixels
        #[arg(long)]
        width: u32,

        /// Image height in pixels
        #[arg(long)]
        height: u32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Check that the server is ready, then shut it down
    Ping,
}

/// Options shared by the analyze commands.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Result to request: context, annotated_image or heatmap
    #[arg(long, default_value_t = ResultKind::Context)]
    pub kind: ResultKind,

    /// Free-form string forwarded to the server's processing flow
    #[arg(long)]
    pub data: Option<String>,

    /// Directory for returned images (not saved when omitted)
    #[arg(long)]
    pub out: Option<PathBuf>,
}
