//! Process bootstrapping helpers for the worker binary.

pub mod tracing;
