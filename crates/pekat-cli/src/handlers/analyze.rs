//! Analyze command handlers.
//!
//! Context goes to stdout. Returned images are written to
//! `<out>/<stem>.<kind>.png` when `--out` is given.

use pekat_core::{AnalysisResult, ResultKind};
use pekat_runtime::Analyzer;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::commands::OutputArgs;
use crate::error::CliError;

/// Analyze encoded image files one after another.
///
/// Stops at the first failing file.
pub async fn execute(
    analyzer: &Analyzer,
    files: &[PathBuf],
    output: &OutputArgs,
) -> Result<(), CliError> {
    let labelled = files.len() > 1;
    for file in files {
        let result = analyzer
            .analyze_file(file, output.kind, output.data.as_deref())
            .await?;
        report(file, &result, output, labelled).await?;
    }
    Ok(())
}

/// Analyze a file of raw RGB pixels.
pub async fn execute_raw(
    analyzer: &Analyzer,
    file: &Path,
    width: u32,
    height: u32,
    output: &OutputArgs,
) -> Result<(), CliError> {
    let pixels = tokio::fs::read(file).await?;
    let result = analyzer
        .analyze_raw(pixels, width, height, output.kind, output.data.as_deref())
        .await?;
    report(file, &result, output, false).await
}

async fn report(
    source: &Path,
    result: &AnalysisResult,
    output: &OutputArgs,
    labelled: bool,
) -> Result<(), CliError> {
    if let Some(context) = result.context() {
        if labelled {
            println!("{}: {context}", source.display());
        } else {
            println!("{context}");
        }
    }

    match (result.image(), output.out.as_deref()) {
        (Some(image), Some(dir)) => {
            let path = save_image(dir, source, result.kind(), image).await?;
            info!(path = %path.display(), bytes = image.len(), "Saved result image");
        }
        (Some(_), None) => {
            info!(source = %source.display(), "Result image not saved, pass --out to keep it");
        }
        (None, _) if result.kind().returns_image() => {
            warn!(source = %source.display(), kind = %result.kind(), "Server returned no image");
        }
        (None, _) => {}
    }
    Ok(())
}

/// File name for a result image: `<stem>.<kind>.png`.
pub fn output_path(dir: &Path, source: &Path, kind: ResultKind) -> PathBuf {
    let stem = source
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    dir.join(format!("{stem}.{kind}.png"))
}

/// Write a result image next to the others in `dir`, creating it if needed.
pub async fn save_image(
    dir: &Path,
    source: &Path,
    kind: ResultKind,
    image: &[u8],
) -> Result<PathBuf, CliError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = output_path(dir, source, kind);
    tokio::fs::write(&path, image).await?;
    Ok(path)
}
