//! Configuration language: file discovery, scanning, and parsing

pub mod lexer;
pub mod parser;

pub use parser::{parse_file, Attribute, Block, SourceFile};

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Conventional configuration file name
pub const DEFAULT_FILENAME: &str = "cascade.cas.hcl";

/// Check whether a file name participates in configuration
pub fn is_config_file(name: &str) -> bool {
    name.ends_with(".cas") || name.ends_with(".cas.hcl")
}

/// Configuration files in a directory, sorted by name
///
/// Sorting makes error reporting deterministic; merge semantics do not
/// depend on file order.
pub fn config_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::io(format!("reading directory {}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| Error::io(format!("reading directory {}: {}", dir.display(), e)))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if is_config_file(name) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse every configuration file in a directory
pub fn parse_dir(dir: &Path) -> Result<Vec<SourceFile>> {
    let mut parsed = Vec::new();
    for path in config_files(dir)? {
        let src = std::fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("reading {}: {}", path.display(), e)))?;
        parsed.push(parse_file(path.display().to_string(), &src)?);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_config_file() {
        assert!(is_config_file("cascade.cas.hcl"));
        assert!(is_config_file("globals.cas"));
        assert!(is_config_file("anything.cas.hcl"));
        assert!(!is_config_file("main.tf"));
        assert!(!is_config_file("cascade.hcl"));
        assert!(!is_config_file("notes.txt"));
    }
}
