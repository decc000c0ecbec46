#![forbid(unsafe_code)]

//! Runtime configuration for hook scopes.
//!
//! Defaults are usable as-is. Environment overrides:
//!
//! ```text
//! CACHED_STATE_MAX_RENDER_PASSES   Upper bound on render passes per Scope::render (>= 1)
//! CACHED_STATE_TRACE_RECONCILE     Trace every reconciliation (1/true/yes/on, 0/false/no/off)
//! ```

use std::env;

use crate::error::{ReactiveError, Result};

pub const ENV_MAX_RENDER_PASSES: &str = "CACHED_STATE_MAX_RENDER_PASSES";
pub const ENV_TRACE_RECONCILE: &str = "CACHED_STATE_TRACE_RECONCILE";

/// Default bound on render passes before a scope is considered stuck.
pub const DEFAULT_MAX_RENDER_PASSES: usize = 50;

/// Configuration for [`Scope`](crate::runtime::Scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum render passes a single `Scope::render` may take while setters
    /// and reconciliations keep requesting re-renders.
    /// Default: 50.
    pub max_render_passes: usize,

    /// Emit a TRACE event for every reconciliation, including no-ops.
    /// Resets are always logged.
    /// Default: false.
    pub trace_reconcile: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_render_passes: DEFAULT_MAX_RENDER_PASSES,
            trace_reconcile: false,
        }
    }
}

impl RuntimeConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_overrides(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn with_max_render_passes(mut self, passes: usize) -> Self {
        self.max_render_passes = passes.max(1);
        self
    }

    #[must_use]
    pub fn with_trace_reconcile(mut self, enabled: bool) -> Self {
        self.trace_reconcile = enabled;
        self
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_MAX_RENDER_PASSES) {
            let passes = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ReactiveError::invalid_config(ENV_MAX_RENDER_PASSES, raw.as_str()))?;
            self = self.with_max_render_passes(passes);
        }
        if let Some(raw) = lookup(ENV_TRACE_RECONCILE) {
            let enabled = parse_flag(&raw)
                .ok_or_else(|| ReactiveError::invalid_config(ENV_TRACE_RECONCILE, raw.as_str()))?;
            self.trace_reconcile = enabled;
        }
        Ok(self)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
