//! Batch derivative generator for the pre-commit hook.
//!
//! Reads the staged changeset, generates the derivatives of every staged
//! original that are missing (or stale, with content-hash freshness), and
//! stages them in one call.

mod changeset;
mod generator;

#[cfg(test)]
mod tests;

pub use changeset::{ChangeSet, GitIndex};
pub use generator::{BatchGenerator, BatchOptions, BatchReport};
