#[cfg(feature = "cli")]
pub mod runner;
pub mod services;
