//! File system paths for the identity stack.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Manages file system paths for persisted identity state.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.opsboard)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.opsboard`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".opsboard"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (`<base>/config.json`).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the durable credential store path (`<base>/credentials.json`).
    pub fn credentials_file(&self) -> PathBuf {
        self.base_dir.join("credentials.json")
    }

    /// Ensure the base directory exists.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_dir() {
        let paths = Paths::with_base_dir(PathBuf::from("/tmp/opsboard-test"));
        assert_eq!(paths.base_dir(), &PathBuf::from("/tmp/opsboard-test"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/opsboard-test/config.json")
        );
        assert_eq!(
            paths.credentials_file(),
            PathBuf::from("/tmp/opsboard-test/credentials.json")
        );
    }
}
