use crate::core::locks::KeyedLocks;
use crate::core::translate_store_error;
use crate::domain::model::{
    Course, CourseId, CourseSummary, CourseUpdate, EnrollmentPolicy, NewCourse, NewStudent,
    NewTeacher, Student, StudentId, Teacher, TeacherId, COURSE_CREDITS,
};
use crate::domain::ports::CatalogRepository;
use crate::domain::rules::{self, CourseAssignment};
use crate::utils::error::{RejectionReason, Result};
use crate::utils::validation::{validate_email, validate_name};
use chrono::Utc;
use std::sync::Arc;

/// Administrative operations on students, teachers and courses.
pub struct CatalogService<R: CatalogRepository> {
    repo: Arc<R>,
    policy: EnrollmentPolicy,
    teacher_locks: Arc<KeyedLocks<TeacherId>>,
    student_locks: Arc<KeyedLocks<StudentId>>,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: Arc<R>, policy: EnrollmentPolicy) -> Self {
        Self {
            repo,
            policy,
            teacher_locks: Arc::new(KeyedLocks::new()),
            student_locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub fn with_student_locks(mut self, locks: Arc<KeyedLocks<StudentId>>) -> Self {
        self.student_locks = locks;
        self
    }

    // ---- students ----

    pub async fn register_student(&self, name: &str, email: &str) -> Result<Student> {
        validate_name("name", name)?;
        validate_email("email", email)?;
        if self.repo.find_student_by_email(email).await?.is_some() {
            return Err(RejectionReason::DuplicateEmail.into());
        }

        let student = self
            .repo
            .insert_student(
                NewStudent {
                    name: name.trim().to_string(),
                    email: email.trim().to_string(),
                },
                Utc::now(),
            )
            .await
            .map_err(translate_store_error)?;
        tracing::info!("Registered student {} ({})", student.id, student.email);
        Ok(student)
    }

    pub async fn update_student(&self, id: StudentId, name: &str, email: &str) -> Result<Student> {
        validate_name("name", name)?;
        validate_email("email", email)?;
        let mut student = self
            .repo
            .get_student(id)
            .await?
            .ok_or(RejectionReason::StudentNotFound)?;

        student.name = name.trim().to_string();
        student.email = email.trim().to_string();
        self.repo
            .update_student(student.clone())
            .await
            .map_err(translate_store_error)?;
        Ok(student)
    }

    pub async fn set_student_active(&self, id: StudentId, active: bool) -> Result<Student> {
        let _guard = self.student_locks.lock(id).await;
        let mut student = self
            .repo
            .get_student(id)
            .await?
            .ok_or(RejectionReason::StudentNotFound)?;

        student.active = active;
        self.repo.update_student(student.clone()).await?;
        tracing::info!("Student {} active = {}", id, active);
        Ok(student)
    }

    /// Deletes the student together with its whole enrollment history.
    pub async fn remove_student(&self, id: StudentId) -> Result<()> {
        let _guard = self.student_locks.lock(id).await;
        if self.repo.get_student(id).await?.is_none() {
            return Err(RejectionReason::StudentNotFound.into());
        }
        self.repo.delete_student(id).await?;
        tracing::info!("Removed student {}", id);
        Ok(())
    }

    pub async fn students(&self) -> Result<Vec<Student>> {
        self.repo.list_students().await
    }

    // ---- teachers ----

    pub async fn register_teacher(&self, name: &str, email: &str) -> Result<Teacher> {
        validate_name("name", name)?;
        validate_email("email", email)?;
        if self.repo.find_teacher_by_email(email).await?.is_some() {
            return Err(RejectionReason::DuplicateEmail.into());
        }

        let teacher = self
            .repo
            .insert_teacher(NewTeacher {
                name: name.trim().to_string(),
                email: email.trim().to_string(),
            })
            .await
            .map_err(translate_store_error)?;
        tracing::info!("Registered teacher {} ({})", teacher.id, teacher.email);
        Ok(teacher)
    }

    pub async fn update_teacher(&self, id: TeacherId, name: &str, email: &str) -> Result<Teacher> {
        validate_name("name", name)?;
        validate_email("email", email)?;
        let mut teacher = self
            .repo
            .get_teacher(id)
            .await?
            .ok_or(RejectionReason::TeacherNotFound)?;

        teacher.name = name.trim().to_string();
        teacher.email = email.trim().to_string();
        self.repo
            .update_teacher(teacher.clone())
            .await
            .map_err(translate_store_error)?;
        Ok(teacher)
    }

    /// Deletes the teacher and its courses, unless one of them has active enrollments.
    pub async fn remove_teacher(&self, id: TeacherId) -> Result<()> {
        let _guard = self.teacher_locks.lock(id).await;
        if self.repo.get_teacher(id).await?.is_none() {
            return Err(RejectionReason::TeacherNotFound.into());
        }
        self.repo
            .delete_teacher(id)
            .await
            .map_err(translate_store_error)?;
        tracing::info!("Removed teacher {} and its courses", id);
        Ok(())
    }

    pub async fn teachers(&self) -> Result<Vec<Teacher>> {
        self.repo.list_teachers().await
    }

    /// Teachers that can still take another course.
    pub async fn teachers_with_capacity(&self) -> Result<Vec<Teacher>> {
        let mut available = Vec::new();
        for teacher in self.repo.list_teachers().await? {
            let count = self.repo.count_courses_for_teacher(teacher.id).await?;
            if rules::teacher_has_capacity(count, &self.policy) {
                available.push(teacher);
            }
        }
        Ok(available)
    }

    // ---- courses ----

    pub async fn create_course(&self, course: NewCourse) -> Result<Course> {
        validate_name("name", &course.name)?;
        let _guard = self.teacher_locks.lock(course.teacher_id).await;

        if self.repo.get_teacher(course.teacher_id).await?.is_none() {
            return Err(RejectionReason::TeacherNotFound.into());
        }
        if self.repo.find_course_by_name(&course.name).await?.is_some() {
            return Err(RejectionReason::DuplicateCourseName.into());
        }
        let count = self.repo.count_courses_for_teacher(course.teacher_id).await?;
        if let Err(reason) =
            rules::can_assign_course_to_teacher(count, CourseAssignment::New, &self.policy)
        {
            tracing::warn!(
                "Course '{}' rejected for teacher {}: {}",
                course.name,
                course.teacher_id,
                reason.code()
            );
            return Err(reason.into());
        }

        let created = self
            .repo
            .insert_course(
                NewCourse {
                    name: course.name.trim().to_string(),
                    description: course.description.trim().to_string(),
                    teacher_id: course.teacher_id,
                },
                COURSE_CREDITS,
            )
            .await
            .map_err(translate_store_error)?;
        tracing::info!(
            "✅ Created course {} '{}' for teacher {}",
            created.id,
            created.name,
            created.teacher_id
        );
        Ok(created)
    }

    pub async fn update_course(&self, id: CourseId, update: CourseUpdate) -> Result<Course> {
        if let Some(name) = &update.name {
            validate_name("name", name)?;
        }

        // the locked teachers must match the course as read under the locks;
        // a concurrent reassignment moves it and we start over
        let (_guards, mut course, target_teacher) = loop {
            let current = self
                .repo
                .get_course(id)
                .await?
                .ok_or(RejectionReason::CourseNotFound)?
                .course;
            let target_teacher = update.teacher_id.unwrap_or(current.teacher_id);
            let guards = self
                .teacher_locks
                .lock_many(&[current.teacher_id, target_teacher])
                .await;

            let course = self
                .repo
                .get_course(id)
                .await?
                .ok_or(RejectionReason::CourseNotFound)?
                .course;
            if course.teacher_id == current.teacher_id {
                break (guards, course, target_teacher);
            }
            tracing::debug!("Course {} changed teacher while waiting for locks, retrying", id);
        };

        if let Some(name) = update.name {
            if let Some(existing) = self.repo.find_course_by_name(&name).await? {
                if existing.id != id {
                    return Err(RejectionReason::DuplicateCourseName.into());
                }
            }
            course.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            course.description = description.trim().to_string();
        }

        let assignment = if target_teacher == course.teacher_id {
            CourseAssignment::Unchanged
        } else {
            CourseAssignment::Reassignment
        };
        if assignment == CourseAssignment::Reassignment {
            if self.repo.get_teacher(target_teacher).await?.is_none() {
                return Err(RejectionReason::TeacherNotFound.into());
            }
            let count = self.repo.count_courses_for_teacher(target_teacher).await?;
            rules::can_assign_course_to_teacher(count, assignment, &self.policy)?;
            tracing::info!(
                "Reassigning course {} from teacher {} to {}",
                id,
                course.teacher_id,
                target_teacher
            );
            course.teacher_id = target_teacher;
        }

        course.credits = COURSE_CREDITS;
        self.repo
            .update_course(course.clone())
            .await
            .map_err(translate_store_error)?;
        Ok(course)
    }

    /// Deletes a course with no active enrollments, dropping its cancelled history.
    pub async fn remove_course(&self, id: CourseId) -> Result<()> {
        let course = self
            .repo
            .get_course(id)
            .await?
            .ok_or(RejectionReason::CourseNotFound)?;
        let _guard = self.teacher_locks.lock(course.teacher.id).await;

        let has_active = self
            .repo
            .enrollments_for_course(id)
            .await?
            .iter()
            .any(|e| e.is_active());
        if has_active {
            return Err(RejectionReason::CourseHasActiveEnrollments.into());
        }

        self.repo
            .delete_course(id)
            .await
            .map_err(translate_store_error)?;
        tracing::info!("Removed course {} '{}'", id, course.course.name);
        Ok(())
    }

    pub async fn course_summaries(&self) -> Result<Vec<CourseSummary>> {
        let mut summaries = Vec::new();
        for resolved in self.repo.list_courses().await? {
            let active_students = self
                .repo
                .enrollments_for_course(resolved.course.id)
                .await?
                .iter()
                .filter(|e| e.is_active())
                .count();
            summaries.push(CourseSummary {
                id: resolved.course.id,
                name: resolved.course.name,
                description: resolved.course.description,
                credits: resolved.course.credits,
                teacher_id: resolved.teacher.id,
                teacher_name: resolved.teacher.name,
                active_students,
            });
        }
        Ok(summaries)
    }
}
