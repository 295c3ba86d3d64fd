//! CLI command implementations for pixgate.
//!
//! - [`serve`] - HTTP request handler plus scheduled retention sweeps
//! - [`sweep`] - One retention pass, then exit
//! - [`validate`] - Check a config file without starting anything

pub mod serve;
pub mod sweep;
pub mod validate;
