use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::types::RawRecord;

/// Supplies the full batch of raw cost rows for one analysis.
pub trait CostSource {
    fn name(&self) -> &str;
    fn load(&self) -> Result<Vec<RawRecord>>;
}

/// Cost exports on disk: a single `.json`/`.jsonl` file, or a directory
/// searched recursively for them.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl CostSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self) -> Result<Vec<RawRecord>> {
        let files = discover_files(&self.root)?;
        debug!(files = files.len(), root = %self.root.display(), "parsing cost exports");

        // Parse in parallel; collecting keeps path order.
        let batches: Vec<Vec<RawRecord>> = files
            .par_iter()
            .map(|path| parse_file(path))
            .collect::<Result<_>>()?;

        let records: Vec<RawRecord> = batches.into_iter().flatten().collect();
        info!(records = records.len(), source = self.name(), "loaded cost records");
        Ok(records)
    }
}

fn is_cost_export(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "json" || ext == "jsonl")
}

pub(crate) fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        anyhow::bail!("input path does not exist: {}", root.display());
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_cost_export(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

fn parse_file(path: &Path) -> Result<Vec<RawRecord>> {
    if path.extension().is_some_and(|ext| ext == "jsonl") {
        parse_jsonl(path)
    } else {
        parse_json_array(path)
    }
}

fn parse_json_array(path: &Path) -> Result<Vec<RawRecord>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("invalid cost export {}", path.display()))
}

fn parse_jsonl(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: RawRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid cost record", path.display(), idx + 1))?;
        records.push(record);
    }

    Ok(records)
}
