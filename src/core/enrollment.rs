use crate::core::locks::KeyedLocks;
use crate::core::translate_store_error;
use crate::domain::model::{
    CourseId, EnrollmentId, EnrollmentPolicy, EnrollmentStatus, ResolvedCourse,
    ResolvedEnrollment, Student, StudentId,
};
use crate::domain::ports::CatalogRepository;
use crate::domain::rules;
use crate::utils::error::{RejectionReason, Result};
use chrono::Utc;
use std::sync::Arc;

/// Enrollment transition service: enroll, cancel and the read-only
/// projections built on the same rules.
pub struct EnrollmentService<R: CatalogRepository> {
    repo: Arc<R>,
    policy: EnrollmentPolicy,
    student_locks: Arc<KeyedLocks<StudentId>>,
}

impl<R: CatalogRepository> EnrollmentService<R> {
    pub fn new(repo: Arc<R>, policy: EnrollmentPolicy) -> Self {
        Self {
            repo,
            policy,
            student_locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Shares per-student locks with another service working on the same store.
    pub fn with_student_locks(mut self, locks: Arc<KeyedLocks<StudentId>>) -> Self {
        self.student_locks = locks;
        self
    }

    async fn active_student(&self, student_id: StudentId) -> Result<Student> {
        self.repo
            .get_student(student_id)
            .await?
            .filter(|s| s.active)
            .ok_or_else(|| RejectionReason::StudentNotFound.into())
    }

    /// Dry-run of `enroll`: evaluates every rule without writing anything.
    pub async fn check(&self, student_id: StudentId, course_id: CourseId) -> Result<()> {
        let student = self.repo.get_student(student_id).await?;
        let course = self.repo.get_course(course_id).await?;
        let enrollments = self.repo.active_enrollments_for_student(student_id).await?;

        rules::can_enroll(student.as_ref(), course.as_ref(), &enrollments, &self.policy)?;
        Ok(())
    }

    pub async fn enroll(&self, student_id: StudentId, course_id: CourseId) -> Result<EnrollmentId> {
        let _guard = self.student_locks.lock(student_id).await;

        if let Err(e) = self.check(student_id, course_id).await {
            if let Some(reason) = e.rejection() {
                tracing::warn!(
                    "Enrollment of student {} in course {} rejected: {}",
                    student_id,
                    course_id,
                    reason.code()
                );
            }
            return Err(e);
        }

        let enrollment = self
            .repo
            .insert_enrollment(student_id, course_id, Utc::now())
            .await
            .map_err(translate_store_error)?;

        tracing::info!(
            "✅ Student {} enrolled in course {} (enrollment {})",
            student_id,
            course_id,
            enrollment.id
        );
        Ok(enrollment.id)
    }

    /// Soft-cancels an active enrollment. Missing and already cancelled
    /// enrollments both yield `EnrollmentNotFound`.
    pub async fn cancel(&self, enrollment_id: EnrollmentId) -> Result<()> {
        let student_id = match self.repo.get_enrollment(enrollment_id).await? {
            Some(enrollment) => enrollment.student_id,
            None => return Err(RejectionReason::EnrollmentNotFound.into()),
        };
        let _guard = self.student_locks.lock(student_id).await;

        // re-read under the lock
        let mut enrollment = self
            .repo
            .get_enrollment(enrollment_id)
            .await?
            .filter(|e| e.is_active())
            .ok_or(RejectionReason::EnrollmentNotFound)?;

        enrollment.status = EnrollmentStatus::Cancelled;
        enrollment.cancelled_at = Some(Utc::now());
        self.repo.update_enrollment(enrollment).await?;

        tracing::info!(
            "Enrollment {} of student {} cancelled",
            enrollment_id,
            student_id
        );
        Ok(())
    }

    /// Cancels the student's active enrollment in `course_id`.
    pub async fn cancel_for_course(&self, student_id: StudentId, course_id: CourseId) -> Result<()> {
        let enrollment = self
            .repo
            .active_enrollments_for_student(student_id)
            .await?
            .into_iter()
            .find(|e| e.enrollment.course_id == course_id)
            .ok_or(RejectionReason::EnrollmentNotFound)?;
        self.cancel(enrollment.enrollment.id).await
    }

    /// Courses the student could still enroll in: everything minus courses
    /// already held minus courses of teachers the student already has.
    /// The enrollment cap is not applied here.
    pub async fn list_available_courses(&self, student_id: StudentId) -> Result<Vec<ResolvedCourse>> {
        self.active_student(student_id).await?;
        let enrollments = self.repo.active_enrollments_for_student(student_id).await?;

        let available = self
            .repo
            .list_courses()
            .await?
            .into_iter()
            .filter(|course| rules::is_course_available(course, &enrollments))
            .collect();
        Ok(available)
    }

    pub async fn student_enrollments(&self, student_id: StudentId) -> Result<Vec<ResolvedEnrollment>> {
        if self.repo.get_student(student_id).await?.is_none() {
            return Err(RejectionReason::StudentNotFound.into());
        }
        self.repo.active_enrollments_for_student(student_id).await
    }

    /// Students holding an active enrollment in the course.
    pub async fn course_roster(&self, course_id: CourseId) -> Result<Vec<Student>> {
        if self.repo.get_course(course_id).await?.is_none() {
            return Err(RejectionReason::CourseNotFound.into());
        }

        let mut roster = Vec::new();
        for enrollment in self.repo.enrollments_for_course(course_id).await? {
            if !enrollment.is_active() {
                continue;
            }
            if let Some(student) = self.repo.get_student(enrollment.student_id).await? {
                roster.push(student);
            }
        }
        roster.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roster)
    }

    /// Roster of the course without the given student.
    pub async fn classmates(&self, student_id: StudentId, course_id: CourseId) -> Result<Vec<Student>> {
        if self.repo.get_student(student_id).await?.is_none() {
            return Err(RejectionReason::StudentNotFound.into());
        }
        let roster = self.course_roster(course_id).await?;
        Ok(roster.into_iter().filter(|s| s.id != student_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::model::{NewCourse, NewStudent, NewTeacher, COURSE_CREDITS};
    use crate::utils::error::GestorError;

    struct Fixture {
        service: EnrollmentService<InMemoryStore>,
        repo: Arc<InMemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let repo = Arc::new(InMemoryStore::new());
            Self {
                service: EnrollmentService::new(repo.clone(), EnrollmentPolicy::default()),
                repo,
            }
        }

        async fn student(&self, name: &str) -> StudentId {
            self.repo
                .insert_student(
                    NewStudent {
                        name: name.to_string(),
                        email: format!("{}@uni.edu", name.to_lowercase()),
                    },
                    Utc::now(),
                )
                .await
                .unwrap()
                .id
        }

        async fn course(&self, name: &str, teacher_email: &str) -> CourseId {
            let teacher = match self.repo.find_teacher_by_email(teacher_email).await.unwrap() {
                Some(t) => t,
                None => self
                    .repo
                    .insert_teacher(NewTeacher {
                        name: teacher_email.to_string(),
                        email: teacher_email.to_string(),
                    })
                    .await
                    .unwrap(),
            };
            self.repo
                .insert_course(
                    NewCourse {
                        name: name.to_string(),
                        description: String::new(),
                        teacher_id: teacher.id,
                    },
                    COURSE_CREDITS,
                )
                .await
                .unwrap()
                .id
        }
    }

    fn reason(result: Result<impl std::fmt::Debug>) -> Option<RejectionReason> {
        result.err().and_then(|e: GestorError| e.rejection())
    }

    #[tokio::test]
    async fn test_enroll_unknown_ids() {
        let fx = Fixture::new();
        let s = fx.student("Ana").await;
        let c = fx.course("Cálculo", "t1@uni.edu").await;

        assert_eq!(
            reason(fx.service.enroll(StudentId(99), c).await),
            Some(RejectionReason::StudentNotFound)
        );
        assert_eq!(
            reason(fx.service.enroll(s, CourseId(99)).await),
            Some(RejectionReason::CourseNotFound)
        );
    }

    #[tokio::test]
    async fn test_inactive_student_cannot_enroll() {
        let fx = Fixture::new();
        let s = fx.student("Ana").await;
        let c = fx.course("Cálculo", "t1@uni.edu").await;
        let mut student = fx.repo.get_student(s).await.unwrap().unwrap();
        student.active = false;
        fx.repo.update_student(student).await.unwrap();

        assert_eq!(
            reason(fx.service.enroll(s, c).await),
            Some(RejectionReason::StudentNotFound)
        );
        assert_eq!(
            reason(fx.service.list_available_courses(s).await),
            Some(RejectionReason::StudentNotFound)
        );
    }

    #[tokio::test]
    async fn test_duplicate_does_not_create_second_record() {
        let fx = Fixture::new();
        let s = fx.student("Ana").await;
        let c = fx.course("Cálculo", "t1@uni.edu").await;

        fx.service.enroll(s, c).await.unwrap();
        assert_eq!(
            reason(fx.service.enroll(s, c).await),
            Some(RejectionReason::DuplicateEnrollment)
        );
        assert_eq!(fx.repo.list_enrollments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_is_soft_and_not_repeatable() {
        let fx = Fixture::new();
        let s = fx.student("Ana").await;
        let c = fx.course("Cálculo", "t1@uni.edu").await;
        let id = fx.service.enroll(s, c).await.unwrap();

        fx.service.cancel(id).await.unwrap();
        let stored = fx.repo.get_enrollment(id).await.unwrap().unwrap();
        assert_eq!(stored.status, EnrollmentStatus::Cancelled);
        assert!(stored.cancelled_at.is_some());

        assert_eq!(
            reason(fx.service.cancel(id).await),
            Some(RejectionReason::EnrollmentNotFound)
        );
        assert_eq!(
            reason(fx.service.cancel(EnrollmentId(404)).await),
            Some(RejectionReason::EnrollmentNotFound)
        );

        // the freed pair can be enrolled again
        let again = fx.service.enroll(s, c).await.unwrap();
        assert_ne!(again, id);
    }

    #[tokio::test]
    async fn test_cancel_for_course() {
        let fx = Fixture::new();
        let s = fx.student("Ana").await;
        let c = fx.course("Cálculo", "t1@uni.edu").await;

        assert_eq!(
            reason(fx.service.cancel_for_course(s, c).await),
            Some(RejectionReason::EnrollmentNotFound)
        );
        fx.service.enroll(s, c).await.unwrap();
        fx.service.cancel_for_course(s, c).await.unwrap();
        assert!(fx.service.student_enrollments(s).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_available_courses_excludes_held_and_same_teacher() {
        let fx = Fixture::new();
        let s = fx.student("Ana").await;
        let a = fx.course("A", "t1@uni.edu").await;
        let _b = fx.course("B", "t1@uni.edu").await;
        let c = fx.course("C", "t2@uni.edu").await;

        assert_eq!(fx.service.list_available_courses(s).await.unwrap().len(), 3);

        fx.service.enroll(s, a).await.unwrap();
        let available: Vec<CourseId> = fx
            .service
            .list_available_courses(s)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.course.id)
            .collect();
        assert_eq!(available, vec![c]);
    }

    #[tokio::test]
    async fn test_roster_and_classmates_only_count_active() {
        let fx = Fixture::new();
        let ana = fx.student("Ana").await;
        let luis = fx.student("Luis").await;
        let eva = fx.student("Eva").await;
        let c = fx.course("Cálculo", "t1@uni.edu").await;

        fx.service.enroll(ana, c).await.unwrap();
        fx.service.enroll(luis, c).await.unwrap();
        let eva_enrollment = fx.service.enroll(eva, c).await.unwrap();
        fx.service.cancel(eva_enrollment).await.unwrap();

        let roster: Vec<String> = fx
            .service
            .course_roster(c)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(roster, vec!["Ana", "Luis"]);

        let classmates = fx.service.classmates(ana, c).await.unwrap();
        assert_eq!(classmates.len(), 1);
        assert_eq!(classmates[0].id, luis);

        assert_eq!(
            reason(fx.service.course_roster(CourseId(77)).await),
            Some(RejectionReason::CourseNotFound)
        );
    }
}
