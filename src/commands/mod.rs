//! Command layer behind the `svcgate` binary.

pub mod config;
mod health;
mod request;

pub use config::load_config;
pub use health::health;
pub use request::request;
