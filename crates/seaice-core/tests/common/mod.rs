//! Shared helpers for seaice-core integration tests

pub mod fixtures;
