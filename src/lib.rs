pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use app::runner::CommandRunner;
#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::{memory::InMemoryStore, storage::LocalStorage};
pub use app::services::{SeedSummary, Services};
pub use config::{AppConfig, SeedCatalog};
pub use crate::core::{catalog::CatalogService, enrollment::EnrollmentService};
pub use domain::model::EnrollmentPolicy;
pub use domain::rules::{can_assign_course_to_teacher, can_enroll, CourseAssignment};
pub use utils::error::{GestorError, RejectionReason, Result};
