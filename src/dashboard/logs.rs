use std::fs;
use std::io;
use std::path::Path;

/// Last `limit` non-empty lines of the log file, oldest first. A missing file has no lines.
pub fn tail_lines(path: &Path, limit: usize) -> io::Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let start = lines.len().saturating_sub(limit);

    Ok(lines[start..].iter().map(|line| line.to_string()).collect())
}
