//! Shared helpers for event sources.

pub mod filter;

pub use filter::PathFilter;
