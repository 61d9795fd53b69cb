// Library root: re-exports all modules so integration tests and the
// pipeline binaries can access the crate's public API.

pub mod bank;
pub mod config;
pub mod dataset;
pub mod model;
pub mod predict;
pub mod server;
pub mod source;
pub mod train;
