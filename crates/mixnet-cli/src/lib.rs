//! Mixnet command-line front end.
//!
//! The `mixnet` binary is a thin shell over two modules exposed here so they
//! can be tested in isolation: TOML configuration and the HTTP endpoint.

pub mod config;
pub mod server;
