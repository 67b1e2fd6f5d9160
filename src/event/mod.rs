//! Canonical event model and wire-dialect normalization.
//!
//! [`CanonicalEvent`] is the closed tagged-union representation all
//! downstream logic consumes. [`EventNormalizer`] absorbs both wire dialects
//! (structured and legacy) into it.

mod canonical;
mod normalizer;
mod payloads;

pub use canonical::{
    CanonicalEvent, ErrorInfo, EventPayload, Interrupt, NodeStatus, NodeUpdateInfo, TaskProgress,
    TaskStatus,
};
pub use normalizer::{Dialect, EventNormalizer};
