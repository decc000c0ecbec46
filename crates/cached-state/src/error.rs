#![forbid(unsafe_code)]

//! Errors raised at the host-integration seams.
//!
//! The holder itself ([`CachedState`](crate::CachedState)) has no failure
//! modes. Everything here comes from driving it: flushing effects at the
//! wrong time, runaway re-renders, or writing through a detached setter.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReactiveError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    #[error("setter target was unmounted")]
    Detached,

    #[error("effects cannot be flushed while a render pass is open")]
    FlushDuringRender,

    #[error("effect queue flushed from inside an effect")]
    ReentrantFlush,

    #[error("scope did not settle after {passes} render passes")]
    UpdateDepthExceeded { passes: usize },

    #[error("hook #{index} changed between renders (expected {expected}, found {found})")]
    HookOrderMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },
}

impl ReactiveError {
    #[must_use]
    pub fn invalid_config(key: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key,
            value: value.into(),
        }
    }

    /// Whether the error reflects a bug in the calling component rather than
    /// a lifecycle race.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, Self::Detached)
    }
}
