//! Crate-level error types
//!
//! The engine itself never fails a tick; the only fallible surface is the
//! best-effort weight persistence, whose error type lives with the store.

pub use crate::engine::learning::store::StoreError;

pub type Result<T> = std::result::Result<T, StoreError>;
