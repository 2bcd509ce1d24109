//! Engine configuration
//!
//! The active [`Config`] is thread-local. [`with_config`] installs an
//! override for the duration of a closure and restores the previous value on
//! exit, including when the closure panics.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;

/// Tunables consulted by the operator engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keep products of two explicit matrices lazy instead of multiplying
    /// the arrays eagerly
    pub lazy_matrix_matrix_matmul: bool,
    /// Minimum number of rows before sparse products run on the rayon pool
    pub parallel_min_rows: usize,
}

impl Config {
    /// Toggle lazy explicit matrix products
    pub fn with_lazy_matrix_matrix_matmul(mut self, lazy: bool) -> Self {
        self.lazy_matrix_matrix_matmul = lazy;
        self
    }

    /// Set the row threshold for parallel sparse products
    pub fn with_parallel_min_rows(mut self, rows: usize) -> Self {
        self.parallel_min_rows = rows;
        self
    }

    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lazy_matrix_matrix_matmul: false,
            parallel_min_rows: 4096,
        }
    }
}

thread_local! {
    static ACTIVE: RefCell<Config> = RefCell::new(Config::default());
}

/// The configuration active on this thread
pub fn current() -> Config {
    ACTIVE.with(|cfg| *cfg.borrow())
}

/// Replace the configuration of this thread
pub fn set(config: Config) {
    ACTIVE.with(|cfg| *cfg.borrow_mut() = config);
}

/// Run `f` with `config` active, restoring the previous configuration after
pub fn with_config<R>(config: Config, f: impl FnOnce() -> R) -> R {
    struct Restore(Config);

    impl Drop for Restore {
        fn drop(&mut self) {
            set(self.0);
        }
    }

    let _restore = Restore(current());
    set(config);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!(!cfg.lazy_matrix_matrix_matmul);
        assert_eq!(cfg.parallel_min_rows, 4096);
    }

    #[test]
    fn test_builder() {
        let cfg = Config::default()
            .with_lazy_matrix_matrix_matmul(true)
            .with_parallel_min_rows(16);
        assert!(cfg.lazy_matrix_matrix_matmul);
        assert_eq!(cfg.parallel_min_rows, 16);
    }

    #[test]
    fn test_json_partial() {
        let cfg = Config::from_json_str(r#"{ "parallel_min_rows": 10 }"#).unwrap();
        assert_eq!(cfg.parallel_min_rows, 10);
        assert!(!cfg.lazy_matrix_matrix_matmul);

        assert!(Config::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_scoped_override() {
        let lazy = Config::default().with_lazy_matrix_matrix_matmul(true);
        let inside = with_config(lazy, || current().lazy_matrix_matrix_matmul);
        assert!(inside);
        assert!(!current().lazy_matrix_matrix_matmul);
    }

    #[test]
    fn test_override_restored_after_panic() {
        let lazy = Config::default().with_lazy_matrix_matrix_matmul(true);
        let result = std::panic::catch_unwind(|| {
            with_config(lazy, || panic!("boom"));
        });
        assert!(result.is_err());
        assert!(!current().lazy_matrix_matrix_matmul);
    }
}
