use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::types::HistoryRecord;

/// Load history from a JSON array / JSON Lines file, or from every `*.json`
/// and `*.jsonl` file below a directory. Records are returned oldest first;
/// records sharing a timestamp keep their file order.
pub fn load(path: &Path) -> Result<Vec<HistoryRecord>> {
    let meta = fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;

    let mut records = if meta.is_dir() {
        let files = discover_files(path);
        tracing::debug!(dir = %path.display(), files = files.len(), "discovered history files");
        files
            .par_iter()
            .map(|file| match parse_file(file) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        file = %file.display(),
                        error = %format!("{e:#}"),
                        "skipping history file"
                    );
                    Vec::new()
                }
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    } else {
        parse_file(path)?
    };

    records.sort_by_key(|r| r.timestamp);
    Ok(records)
}

fn discover_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == "json" || ext == "jsonl")
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn parse_file(path: &Path) -> Result<Vec<HistoryRecord>> {
    let data = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    parse_history(&data).with_context(|| format!("invalid history in {}", path.display()))
}

/// Parse a JSON array of records, or one record per line. Bad lines are
/// skipped; a bad array is an error.
pub fn parse_history(data: &str) -> Result<Vec<HistoryRecord>> {
    if data.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(data)?);
    }

    let mut records = Vec::new();
    for (n, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryRecord>(line) {
            Ok(r) => records.push(r),
            Err(e) => tracing::warn!(line = n + 1, error = %e, "skipping history line"),
        }
    }
    Ok(records)
}
