//! Runtime abstraction for process-level lookups.
//!
//! Configuration loading goes through this trait so it can be driven by a
//! `MockRuntime` in tests instead of the real process environment.

mod env;

use std::env as std_env;

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;
}

/// Like `env_var`, but treats unset, empty and non-unicode values as absent.
pub fn env_opt<R: Runtime + ?Sized>(runtime: &R, key: &str) -> Option<String> {
    runtime.env_var(key).ok().filter(|v| !v.trim().is_empty())
}

pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }
}
