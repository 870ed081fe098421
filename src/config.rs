use crate::error::Result;
use crate::mutator::MutationLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for a mutation run. Loaded from JSON, then overridden by CLI
/// flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Highest mutator level to apply
    pub level: MutationLevel,
    /// Keep only the first mutation of every expression
    pub one_mutant: bool,
    /// 1-indexed lines to leave alone, keyed by file path
    pub skip_lines: HashMap<String, Vec<usize>>,
    /// Where mutant folders are created (current directory if unset)
    pub output_dir: Option<PathBuf>,
}

impl MutationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn skip_lines_for(&self, file: &str) -> Option<&Vec<usize>> {
        self.skip_lines.get(file)
    }
}

/// Reads a `{ "path": [line, ...] }` skip file
pub fn read_skip_lines(path: &Path) -> Result<HashMap<String, Vec<usize>>> {
    let content = fs::read_to_string(path)?;
    let map: HashMap<String, Vec<usize>> = serde_json::from_str(&content)?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config: MutationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MutationConfig::default());
        assert_eq!(config.level, MutationLevel::Standard);
        assert!(!config.one_mutant);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"{{"level": "basic", "one_mutant": true, "skip_lines": {{"src/a.chain": [2, 5]}}}}"#
        )
        .unwrap();

        let config = MutationConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.level, MutationLevel::Basic);
        assert!(config.one_mutant);
        assert_eq!(config.skip_lines_for("src/a.chain"), Some(&vec![2, 5]));
        assert!(config.skip_lines_for("src/b.chain").is_none());
    }

    #[test]
    fn test_read_skip_lines() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"{{"x.chain": [1]}}"#).unwrap();

        let map = read_skip_lines(temp_file.path()).unwrap();
        assert_eq!(map["x.chain"], vec![1]);
    }

    #[test]
    fn test_bad_level_is_rejected() {
        let result: std::result::Result<MutationConfig, _> =
            serde_json::from_str(r#"{"level": "extreme"}"#);
        assert!(result.is_err());
    }
}
