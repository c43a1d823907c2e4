//! Line-oriented persistence of the final sets.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::CidrfoldError;
use crate::normalizer::normalize;
use crate::set::LogicalSet;

/// Write `contents` to `path` via a temp file in the same directory and an
/// atomic rename. Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", parent_dir))?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", parent_dir))?;
    temp_file.write_all(contents)?;
    temp_file.as_file().sync_all()?;

    temp_file
        .persist(path)
        .map_err(|e| CidrfoldError::Output(format!("{:?}: {}", path, e.error)))?;
    Ok(())
}

/// Write a set as canonical CIDRs, one per line.
pub fn write_set(path: &Path, set: &LogicalSet) -> Result<()> {
    write_atomic(path, set.render().as_bytes())
        .with_context(|| format!("Failed to write set to {:?}", path))?;
    debug!("Wrote {} ranges to {:?}", set.len(), path);
    Ok(())
}

/// Read a previously written set back. Unparseable lines are skipped.
pub fn read_set(path: &Path) -> Result<LogicalSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read set file: {:?}", path))?;
    Ok(parse_lines(&content))
}

/// Normalize every non-blank line of `content`, skipping rejects.
pub fn parse_lines(content: &str) -> LogicalSet {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match normalize(line) {
            Ok(range) => Some(range),
            Err(e) => {
                warn!("Skipping line {:?}: {}", line, e);
                None
            }
        })
        .collect()
}
