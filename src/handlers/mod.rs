pub mod clear;
pub mod index;
pub mod search;
pub mod stats;

pub use clear::DeleteFilingArgs;
pub use index::IndexFilingArgs;
pub use search::SearchFilingArgs;

use crate::{Config, Error, FilingRetriever, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone)]
pub struct ToolHandlers {
    config: Config,
    retriever: Arc<FilingRetriever>,
}

impl ToolHandlers {
    pub fn new(config: Config, retriever: Arc<FilingRetriever>) -> Self {
        Self { config, retriever }
    }
}

pub fn ensure_absolute_path(path: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(path);

    if path_buf.is_absolute() {
        Ok(path_buf)
    } else {
        let current_dir = std::env::current_dir()?;
        let absolute = current_dir.join(path_buf);

        tracing::warn!(
            "Relative path provided: '{}', resolved to absolute: '{}'",
            path,
            absolute.display()
        );

        Ok(absolute)
    }
}

pub fn validate_filing_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::InvalidInput(format!(
            "Path does not exist: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(Error::InvalidInput(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Trimmed, non-empty ticker
pub(crate) fn normalize_ticker(ticker: &str) -> Option<String> {
    let ticker = ticker.trim();
    (!ticker.is_empty()).then(|| ticker.to_uppercase())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" nvda "), Some("NVDA".to_string()));
        assert_eq!(normalize_ticker("   "), None);
    }

    #[test]
    fn test_validate_filing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_filing_path(dir.path()).is_err());
        assert!(validate_filing_path(&dir.path().join("missing.txt")).is_err());

        let file = dir.path().join("filing.txt");
        std::fs::write(&file, "text").unwrap();
        assert!(validate_filing_path(&file).is_ok());
    }
}
