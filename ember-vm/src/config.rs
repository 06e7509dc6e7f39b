//! VM-wide configuration: the module search path and resource ceilings
//! (spec §4.K, §5 "Shared resources"). Gathered here so the CLI can build one
//! from environment variables and flags without the VM needing to know how
//! it was constructed.

use std::path::PathBuf;

/// `KSCRIPT_PATH`-style search list plus the VM limits a host may want to
/// cap (spec §5: an embedder running untrusted scripts still gets a finite
/// call stack rather than one that grows until the process is killed).
#[derive(Debug, Clone)]
pub struct Config {
    pub module_paths: Vec<PathBuf>,
    pub max_call_depth: usize,
    pub max_stack_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            module_paths: Vec::new(),
            max_call_depth: 1024,
            max_stack_depth: 64 * 1024,
        }
    }
}

impl Config {
    pub fn with_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_paths.push(path.into());
        self
    }

    /// Parse `EMBER_PATH`-style `:`-separated search directories (spec §6
    /// "the host may provide" CLI/embed wiring).
    pub fn module_paths_from_env(var: &str) -> Vec<PathBuf> {
        std::env::var(var)
            .ok()
            .map(|v| std::env::split_paths(&v).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_search_paths_and_finite_ceilings() {
        let cfg = Config::default();
        assert!(cfg.module_paths.is_empty());
        assert!(cfg.max_call_depth > 0);
        assert!(cfg.max_stack_depth > 0);
    }

    #[test]
    fn with_module_path_appends() {
        let cfg = Config::default().with_module_path("/opt/ember/lib");
        assert_eq!(cfg.module_paths, vec![PathBuf::from("/opt/ember/lib")]);
    }
}
