//! Command-line interface module.

mod args;
pub mod variants;

pub use args::{Cli, Commands};
