//! Public facade crate for `termpipe`.
//!
//! This crate intentionally contains no IO or provider-specific logic.
//! It re-exports the backend-agnostic types/traits from `termpipe-core`.

pub use termpipe_core::*;
