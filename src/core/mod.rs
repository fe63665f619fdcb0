pub mod catalog;
pub mod enrollment;
pub mod locks;
pub mod report;

pub use crate::domain::model::{
    Course, CourseId, Enrollment, EnrollmentId, EnrollmentPolicy, ResolvedCourse,
    ResolvedEnrollment, Student, StudentId, Teacher, TeacherId,
};
pub use crate::domain::ports::{CatalogRepository, Storage};
pub use crate::utils::error::Result;

use crate::domain::ports::constraints;
use crate::utils::error::{GestorError, RejectionReason, StoreError};

/// Turns a store constraint violation, or a relation that vanished between
/// check and write, into the business rejection it stands for.
/// Any other error passes through unchanged.
pub(crate) fn translate_store_error(err: GestorError) -> GestorError {
    let reason = match &err {
        GestorError::StoreError(StoreError::UniqueViolation { constraint })
        | GestorError::StoreError(StoreError::Restricted { constraint }) => match *constraint {
            constraints::ACTIVE_ENROLLMENT => Some(RejectionReason::DuplicateEnrollment),
            constraints::COURSE_NAME => Some(RejectionReason::DuplicateCourseName),
            constraints::STUDENT_EMAIL | constraints::TEACHER_EMAIL => {
                Some(RejectionReason::DuplicateEmail)
            }
            constraints::COURSE_ACTIVE_ENROLLMENTS => {
                Some(RejectionReason::CourseHasActiveEnrollments)
            }
            _ => None,
        },
        GestorError::StoreError(StoreError::MissingRelation { relation, .. }) => match *relation {
            "student" => Some(RejectionReason::StudentNotFound),
            "course" => Some(RejectionReason::CourseNotFound),
            "teacher" => Some(RejectionReason::TeacherNotFound),
            _ => None,
        },
        _ => None,
    };

    match reason {
        Some(reason) => {
            tracing::warn!("Store constraint mapped to rejection: {}", reason.code());
            GestorError::Rejected(reason)
        }
        None => err,
    }
}
