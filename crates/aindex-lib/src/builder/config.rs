//! Build configuration for index construction

use crate::constants::{is_valid_k, DEFAULT_MAX_TF};
use crate::error::{AindexError, Result};

/// Configuration parameters for building the position index.
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
    /// K-mer width (13 or 23)
    pub k: usize,

    /// Per-k-mer cap on stored posting-list length. TF counts are exact;
    /// position lists are clipped to this many slots.
    pub max_tf: u32,

    /// Number of threads for the parallel phases (0 = all available cores)
    pub num_threads: usize,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        Self {
            k: crate::constants::LARGE_K,
            max_tf: DEFAULT_MAX_TF,
            num_threads: 0,
        }
    }
}

impl BuildConfiguration {
    /// Create a configuration for the given k-mer width.
    pub fn new(k: usize) -> Result<Self> {
        let config = Self {
            k,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_k(self.k) {
            return Err(AindexError::UnsupportedK(self.k));
        }
        if self.max_tf < 2 {
            return Err(AindexError::inconsistent(format!(
                "max_tf must be at least 2, got {}",
                self.max_tf
            )));
        }
        Ok(())
    }

    /// Log configuration parameters via tracing.
    pub fn print(&self) {
        tracing::info!("Build Configuration:");
        tracing::info!("  k = {}", self.k);
        tracing::info!("  max_tf = {}", self.max_tf);
        if self.num_threads == 0 {
            tracing::info!("  num_threads = all available cores");
        } else {
            tracing::info!("  num_threads = {}", self.num_threads);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuildConfiguration::default();
        assert_eq!(config.k, 23);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_config() {
        assert!(BuildConfiguration::new(13).is_ok());
        assert!(BuildConfiguration::new(23).is_ok());
        assert!(BuildConfiguration::new(21).is_err());
    }

    #[test]
    fn test_validate_max_tf() {
        let config = BuildConfiguration {
            max_tf: 1,
            ..BuildConfiguration::default()
        };
        assert!(config.validate().is_err());
    }
}
