#![forbid(unsafe_code)]

//! Locally overridable mirrors of externally supplied values.
//!
//! A component receives a value from its owner on every render but wants to
//! let the user edit a local copy. The copy should survive re-renders that
//! pass the same value again, and snap back when the owner supplies a new
//! one. This crate provides that behavior:
//!
//! - [`CachedState`]: the holder. Keeps the local value plus the last
//!   external value it saw, and reconciles the two on request.
//! - [`Equivalence`]: shallow change detection. [`ValueEq`] compares with
//!   `PartialEq`, [`PtrEq`] compares shared handles by identity.
//! - [`Scope`] / [`Hooks`]: a render/commit/effect cycle with
//!   [`Hooks::use_cached_state`], which returns `(value, setter)`.
//! - [`Observable`] / [`Mirror`]: change-observer integration for hosts
//!   without a render loop.
//! - [`EffectQueue`]: the post-commit scheduler both drivers use.
//!
//! # Invariants
//!
//! 1. The local value is the most recent of: the last consumer write, or the
//!    last external value that differed from the previously seen one.
//! 2. Reconciliation never runs while a render pass is open.
//! 3. Equality is shallow. Mutating a shared value in place, without handing
//!    over a new value, is not detected.
//!
//! # Example
//!
//! ```
//! use cached_state::Scope;
//!
//! let mut scope = Scope::default();
//!
//! let (value, setter) = scope.render(|hooks| hooks.use_cached_state("A")).unwrap();
//! assert_eq!(value, "A");
//!
//! setter.set("B");
//! let (value, _) = scope.render(|hooks| hooks.use_cached_state("A")).unwrap();
//! assert_eq!(value, "B");
//!
//! let (value, _) = scope.render(|hooks| hooks.use_cached_state("C")).unwrap();
//! assert_eq!(value, "C");
//! ```

pub mod binding;
pub mod cached;
pub mod config;
pub mod effects;
pub mod equivalence;
pub mod error;
pub mod observable;
pub mod runtime;

pub use binding::Mirror;
pub use cached::{CachedState, Reconciled};
pub use config::RuntimeConfig;
pub use effects::{EffectQueue, RenderGuard};
pub use equivalence::{Equivalence, PtrEq, SharedHandle, ValueEq};
pub use error::{ReactiveError, Result};
pub use observable::{Observable, Subscription};
pub use runtime::{Hooks, Scope, Setter};
