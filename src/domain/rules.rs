//! Pure enrollment and course-assignment rules. Nothing here touches storage.

use crate::domain::model::{EnrollmentPolicy, ResolvedCourse, ResolvedEnrollment, Student};
use crate::utils::error::RejectionReason;

/// Evaluates whether `student` may form a new enrollment in `course`.
///
/// Rules are checked in a fixed order and the first failing one is reported:
/// student exists and is active, course exists, enrollment cap, duplicate
/// enrollment, teacher conflict. Cancelled entries in `enrollments` are ignored.
pub fn can_enroll(
    student: Option<&Student>,
    course: Option<&ResolvedCourse>,
    enrollments: &[ResolvedEnrollment],
    policy: &EnrollmentPolicy,
) -> Result<(), RejectionReason> {
    let _student = student
        .filter(|s| s.active)
        .ok_or(RejectionReason::StudentNotFound)?;
    let course = course.ok_or(RejectionReason::CourseNotFound)?;

    let active_count = enrollments
        .iter()
        .filter(|e| e.enrollment.is_active())
        .count();
    if active_count >= policy.max_active_enrollments {
        return Err(RejectionReason::EnrollmentCapExceeded);
    }

    check_course_availability(course, enrollments)
}

/// Duplicate and teacher-conflict checks only, without the student or cap checks.
pub fn check_course_availability(
    course: &ResolvedCourse,
    enrollments: &[ResolvedEnrollment],
) -> Result<(), RejectionReason> {
    let mut active = enrollments.iter().filter(|e| e.enrollment.is_active());

    if active
        .clone()
        .any(|e| e.enrollment.course_id == course.course.id)
    {
        return Err(RejectionReason::DuplicateEnrollment);
    }

    if active.any(|e| e.teacher.id == course.teacher.id) {
        return Err(RejectionReason::TeacherConflict);
    }

    Ok(())
}

pub fn is_course_available(course: &ResolvedCourse, enrollments: &[ResolvedEnrollment]) -> bool {
    check_course_availability(course, enrollments).is_ok()
}

/// How a course is being attached to a teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseAssignment {
    /// A brand new course.
    New,
    /// An existing course moving to another teacher.
    Reassignment,
    /// An existing course keeping its teacher.
    Unchanged,
}

/// Teacher capacity guard.
///
/// `current_course_count` is the number of courses the target teacher holds
/// right now, not counting the course being assigned.
pub fn can_assign_course_to_teacher(
    current_course_count: usize,
    assignment: CourseAssignment,
    policy: &EnrollmentPolicy,
) -> Result<(), RejectionReason> {
    match assignment {
        CourseAssignment::Unchanged => Ok(()),
        CourseAssignment::New | CourseAssignment::Reassignment => {
            if teacher_has_capacity(current_course_count, policy) {
                Ok(())
            } else {
                Err(RejectionReason::TeacherCapacityExceeded)
            }
        }
    }
}

pub fn teacher_has_capacity(current_course_count: usize, policy: &EnrollmentPolicy) -> bool {
    current_course_count < policy.max_courses_per_teacher
}
