#![forbid(unsafe_code)]

//! Shallow change-detection strategies.
//!
//! A [`CachedState`](crate::CachedState) decides whether the external value
//! changed by asking its [`Equivalence`] strategy. Both strategies here are
//! shallow:
//!
//! - [`ValueEq`] uses `PartialEq`. Intended for plain values (integers,
//!   strings, small `Copy` structs) where comparing contents is cheap and
//!   is what "the same value" means.
//! - [`PtrEq`] uses identity. Two shared handles (`Rc`, `Arc`, `&T`) are
//!   equivalent only when they point at the same allocation. Contents are
//!   never inspected, so two handles to equal-but-distinct values count as
//!   a change.
//!
//! Neither strategy sees mutation through interior mutability: if an
//! `Rc<RefCell<U>>` is mutated in place and handed back, the handle is the
//! same allocation and no reconciliation happens.
//!
//! `ValueEq` inherits `PartialEq` quirks as-is. For floats, `NaN` is never
//! equal to itself, so an external `NaN` resets the local value every cycle.

use std::rc::Rc;
use std::sync::Arc;

/// Change-detection strategy used during reconciliation.
pub trait Equivalence<T: ?Sized> {
    /// Whether `a` and `b` should be treated as the same external value.
    fn equivalent(a: &T, b: &T) -> bool;
}

/// `PartialEq`-based comparison. The default strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueEq;

impl<T: PartialEq + ?Sized> Equivalence<T> for ValueEq {
    #[inline]
    fn equivalent(a: &T, b: &T) -> bool {
        a == b
    }
}

/// Identity comparison for shared handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PtrEq;

impl<T: SharedHandle + ?Sized> Equivalence<T> for PtrEq {
    #[inline]
    fn equivalent(a: &T, b: &T) -> bool {
        a.same_allocation(b)
    }
}

/// A handle whose identity is the allocation it points at.
pub trait SharedHandle {
    /// `true` when both handles point at the same allocation. Metadata such
    /// as slice length or vtable is ignored.
    fn same_allocation(&self, other: &Self) -> bool;
}

impl<U: ?Sized> SharedHandle for Rc<U> {
    #[inline]
    fn same_allocation(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<U: ?Sized> SharedHandle for Arc<U> {
    #[inline]
    fn same_allocation(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<U: ?Sized> SharedHandle for &U {
    #[inline]
    fn same_allocation(&self, other: &Self) -> bool {
        std::ptr::addr_eq(*self as *const U, *other as *const U)
    }
}

impl<H: SharedHandle> SharedHandle for Option<H> {
    fn same_allocation(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_allocation(b),
            (None, None) => true,
            _ => false,
        }
    }
}
