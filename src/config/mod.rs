#[cfg(feature = "cli")]
pub mod cli;
pub mod seed_config;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::Cli;
pub use seed_config::SeedCatalog;
pub use toml_config::AppConfig;
