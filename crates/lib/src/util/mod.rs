//! Shared utilities.

pub mod path;

#[cfg(test)]
pub mod testutil;
