use crate::config::SeedCatalog;
use crate::core::catalog::CatalogService;
use crate::core::enrollment::EnrollmentService;
use crate::core::locks::KeyedLocks;
use crate::domain::model::{EnrollmentPolicy, NewCourse};
use crate::domain::ports::CatalogRepository;
use crate::utils::error::{GestorError, RejectionReason, Result};
use crate::utils::validation::Validate;
use serde::Serialize;
use std::sync::Arc;

/// Catalog and enrollment services wired to one repository, sharing the
/// per-student locks.
pub struct Services<R: CatalogRepository> {
    pub catalog: CatalogService<R>,
    pub enrollments: EnrollmentService<R>,
    repo: Arc<R>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub teachers_created: usize,
    pub students_created: usize,
    pub courses_created: usize,
    pub enrollments_created: usize,
    pub skipped: usize,
}

impl<R: CatalogRepository> Services<R> {
    pub fn new(repo: Arc<R>, policy: EnrollmentPolicy) -> Self {
        let student_locks = Arc::new(KeyedLocks::new());
        Self {
            catalog: CatalogService::new(repo.clone(), policy)
                .with_student_locks(student_locks.clone()),
            enrollments: EnrollmentService::new(repo.clone(), policy)
                .with_student_locks(student_locks),
            repo,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Applies a seed file through the services, so every rule holds for
    /// seeded data. Entries that already exist are skipped; a rule violation
    /// aborts the seed.
    pub async fn apply_seed(&self, seed: &SeedCatalog) -> Result<SeedSummary> {
        seed.validate()?;
        let mut summary = SeedSummary::default();

        for person in &seed.teachers {
            if self.repo.find_teacher_by_email(&person.email).await?.is_some() {
                summary.skipped += 1;
                continue;
            }
            self.catalog
                .register_teacher(&person.name, &person.email)
                .await?;
            summary.teachers_created += 1;
        }

        for person in &seed.students {
            if self.repo.find_student_by_email(&person.email).await?.is_some() {
                summary.skipped += 1;
                continue;
            }
            self.catalog
                .register_student(&person.name, &person.email)
                .await?;
            summary.students_created += 1;
        }

        for course in &seed.courses {
            if self.repo.find_course_by_name(&course.name).await?.is_some() {
                summary.skipped += 1;
                continue;
            }
            let teacher = self
                .repo
                .find_teacher_by_email(&course.teacher)
                .await?
                .ok_or(RejectionReason::TeacherNotFound)?;
            self.catalog
                .create_course(NewCourse {
                    name: course.name.clone(),
                    description: course.description.clone(),
                    teacher_id: teacher.id,
                })
                .await?;
            summary.courses_created += 1;
        }

        for entry in &seed.enrollments {
            let student = self
                .repo
                .find_student_by_email(&entry.student)
                .await?
                .ok_or(RejectionReason::StudentNotFound)?;
            let course = self
                .repo
                .find_course_by_name(&entry.course)
                .await?
                .ok_or(RejectionReason::CourseNotFound)?;

            // already held: skip before the cap check can reject it
            let held = self
                .repo
                .active_enrollments_for_student(student.id)
                .await?
                .iter()
                .any(|e| e.enrollment.course_id == course.id);
            if held {
                summary.skipped += 1;
                continue;
            }

            match self.enrollments.enroll(student.id, course.id).await {
                Ok(_) => summary.enrollments_created += 1,
                Err(GestorError::Rejected(RejectionReason::DuplicateEnrollment)) => {
                    summary.skipped += 1
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "🌱 Seed applied: {} teachers, {} students, {} courses, {} enrollments ({} skipped)",
            summary.teachers_created,
            summary.students_created,
            summary.courses_created,
            summary.enrollments_created,
            summary.skipped
        );
        Ok(summary)
    }
}
