//! Shared state between a provider's two loops.
//!
//! `PendingQueue` is the only cross-task structure in the pipeline: the
//! receive loop appends raw frames, the purge loop swaps the backlog out
//! wholesale. Nothing else is shared between the loops.

pub mod pending;

pub use pending::PendingQueue;
