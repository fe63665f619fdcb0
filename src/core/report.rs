use crate::domain::ports::CatalogRepository;
use crate::utils::error::{GestorError, Result, StoreError};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct EnrollmentRow<'a> {
    enrollment_id: u64,
    student_id: u64,
    student_name: &'a str,
    student_email: &'a str,
    course_id: u64,
    course_name: &'a str,
    credits: u32,
    teacher_name: &'a str,
    status: String,
    enrolled_at: String,
    cancelled_at: String,
}

/// Full enrollment history, active and cancelled, as CSV.
pub async fn enrollment_report_csv<R: CatalogRepository + ?Sized>(repo: &R) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let enrollments = repo.list_enrollments().await?;

    for enrollment in &enrollments {
        let student = repo.get_student(enrollment.student_id).await?.ok_or_else(|| {
            StoreError::MissingRelation {
                relation: "student",
                id: enrollment.id.to_string(),
            }
        })?;
        let course = repo.get_course(enrollment.course_id).await?.ok_or_else(|| {
            StoreError::MissingRelation {
                relation: "course",
                id: enrollment.id.to_string(),
            }
        })?;

        writer.serialize(EnrollmentRow {
            enrollment_id: enrollment.id.0,
            student_id: student.id.0,
            student_name: &student.name,
            student_email: &student.email,
            course_id: course.course.id.0,
            course_name: &course.course.name,
            credits: course.course.credits,
            teacher_name: &course.teacher.name,
            status: enrollment.status.to_string(),
            enrolled_at: enrollment.enrolled_at.to_rfc3339(),
            cancelled_at: enrollment
                .cancelled_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| GestorError::IoError(e.into_error()))?;
    tracing::debug!("Enrollment report built with {} rows", enrollments.len());
    String::from_utf8(bytes).map_err(|e| StoreError::Corrupted {
        reason: format!("report is not valid UTF-8: {}", e),
    }
    .into())
}
