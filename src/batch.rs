//! Directory-level trimming.
//!
//! Reads every calendar file in a directory, trims each one on the blocking
//! pool, and writes the results under the same file names in the output
//! directory. Files are independent: a failure in one is reported and the rest
//! carry on.

use crate::ics::{TrimOptions, TrimStats, trim_with_stats};
use crate::window::TrimWindow;
use anyhow::{Context, Result, anyhow};
use futures::future::join_all;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where to read from and write to.
#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extension: String,
}

/// Per-file outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
    pub stats: TrimStats,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// List regular files directly inside `dir` whose extension matches,
/// ignoring case. Sorted by path.
pub fn find_calendar_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Trim every calendar file in `paths.input_dir` into `paths.output_dir`.
pub async fn trim_directory(
    paths: &BatchPaths,
    window: TrimWindow,
    options: TrimOptions,
) -> Result<BatchReport> {
    let files = find_calendar_files(&paths.input_dir, &paths.extension)?;
    info!(
        "Found {} .{} file(s) in {}",
        files.len(),
        paths.extension,
        paths.input_dir.display()
    );

    tokio::fs::create_dir_all(&paths.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory {}",
                paths.output_dir.display()
            )
        })?;

    let tasks = files
        .into_iter()
        .map(|path| trim_file(path, &paths.output_dir, window, options));
    let results = join_all(tasks).await;

    let mut report = BatchReport::default();
    for (path, result) in results {
        match result {
            Ok((target, stats)) => {
                info!(
                    "{}: kept {} event(s), removed {} ({} recurring kept)",
                    path.display(),
                    stats.kept,
                    stats.removed,
                    stats.recurring_kept
                );
                report.stats.merge(&stats);
                report.written.push(target);
            }
            Err(err) => {
                error!("Skipping {}: {:#}", path.display(), err);
                report.failed.push((path, err));
            }
        }
    }

    Ok(report)
}

async fn trim_file(
    path: PathBuf,
    output_dir: &Path,
    window: TrimWindow,
    options: TrimOptions,
) -> (PathBuf, Result<(PathBuf, TrimStats)>) {
    let result = trim_file_inner(&path, output_dir, window, options).await;
    (path, result)
}

async fn trim_file_inner(
    path: &Path,
    output_dir: &Path,
    window: TrimWindow,
    options: TrimOptions,
) -> Result<(PathBuf, TrimStats)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    debug!("Trimming {} ({} bytes)", path.display(), content.len());
    let trimmed = tokio::task::spawn_blocking(move || trim_with_stats(&content, &window, &options))
        .await
        .context("Trim task panicked")??;

    let target = output_dir.join(file_name);
    tokio::fs::write(&target, trimmed.content)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;

    Ok((target, trimmed.stats))
}
