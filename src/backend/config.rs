//! Runtime configuration
//!
//! Both structs have sensible defaults and can be overridden from the
//! environment, which is how hosts tune the engine without recompiling.

use std::env;
use std::num::NonZeroUsize;

const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(size) => size,
    None => unreachable!(),
};

/// Execution limits shared by the interpreter and the bytecode executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Maximum nesting of function calls on one thread
    pub max_call_depth: usize,
    /// Emit a trace event per executed instruction
    pub trace: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            trace: false,
        }
    }
}

impl ExecConfig {
    /// Defaults overridden by `HOTPATH_MAX_CALL_DEPTH` and `HOTPATH_TRACE`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_call_depth: env_parse("HOTPATH_MAX_CALL_DEPTH").unwrap_or(defaults.max_call_depth),
            trace: env_flag("HOTPATH_TRACE").unwrap_or(defaults.trace),
        }
    }
}

/// Specializer switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecializerConfig {
    /// When false every function runs interpreted
    pub enabled: bool,
    /// Log the disassembly of every loaded unit at debug level
    pub log_disassembly: bool,
    /// Functions whose compile result is kept; least recently used go first
    pub cache_size: NonZeroUsize,
}

impl Default for SpecializerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_disassembly: false,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl SpecializerConfig {
    /// Defaults overridden by `HOTPATH_SPECIALIZE`, `HOTPATH_LOG_DISASSEMBLY`
    /// and `HOTPATH_CACHE_SIZE`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("HOTPATH_SPECIALIZE").unwrap_or(defaults.enabled),
            log_disassembly: env_flag("HOTPATH_LOG_DISASSEMBLY")
                .unwrap_or(defaults.log_disassembly),
            cache_size: env_parse("HOTPATH_CACHE_SIZE")
                .and_then(NonZeroUsize::new)
                .unwrap_or(defaults.cache_size),
        }
    }
}

fn env_parse(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|s| parse_flag(&s))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let exec = ExecConfig::default();
        assert_eq!(exec.max_call_depth, 1000);
        assert!(!exec.trace);
        let specializer = SpecializerConfig::default();
        assert!(specializer.enabled);
        assert_eq!(specializer.cache_size.get(), 4096);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" On "), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
