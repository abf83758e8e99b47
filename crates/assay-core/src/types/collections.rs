//! Fast hash collections used across the engine.
//!
//! Lookups only; anything that reaches a report is sorted first.

pub use rustc_hash::{FxHashMap, FxHashSet};
