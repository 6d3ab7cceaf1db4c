//! Input directory scanning.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extensions of files the importer reads, with or without a trailing `.gz`.
/// Plain `.json` is left out, input directories often carry metadata as JSON.
const EXTENSIONS: &[&str] = &["geojsonl", "geojsons", "geojsonseq", "ndjson"];

/// TIGER file names: tl_{year}_{5 digit county FIPS}_{layer}
fn fips_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^tl_\d{4}_(\d{5})_").expect("valid FIPS regex"))
}

/// List importable files at the top level of `dir`, sorted by name.
pub fn scan_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    info!("Scanning {} for input files", dir.display());

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        if !is_supported(path) {
            debug!("Skipping {}", path.display());
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    info!("Found {} input files", files.len());
    Ok(files)
}

/// Whether the file has a readable extension
pub fn is_supported(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);

    EXTENSIONS
        .iter()
        .any(|ext| name.len() > ext.len() + 1 && name.ends_with(&format!(".{}", ext)))
}

/// Whether the file is gzip compressed
pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// File name without any extension, "tl_2016_01001_addrfeat.geojsonl.gz" -> "tl_2016_01001_addrfeat"
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    name.split('.').next().unwrap_or(name).to_string()
}

/// County FIPS code encoded in a TIGER file name
pub fn fips_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    fips_regex()
        .captures(name)
        .map(|captures| captures[1].to_string())
}
