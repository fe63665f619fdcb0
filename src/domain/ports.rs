use crate::domain::model::{
    Course, CourseId, Enrollment, EnrollmentId, EnrollmentPolicy, NewCourse, NewStudent, NewTeacher,
    ResolvedCourse, ResolvedEnrollment, Student, StudentId, Teacher, TeacherId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn data_dir(&self) -> &str;
    fn state_file(&self) -> &str;
    fn policy(&self) -> EnrollmentPolicy;
}

/// Persistence port for students, teachers, courses and enrollments.
///
/// Each call is atomic on its own. Implementations must reject a second
/// active enrollment for the same (student, course) pair and duplicate
/// course names / emails with `StoreError::UniqueViolation`, even when the
/// caller already checked.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_student(&self, id: StudentId) -> Result<Option<Student>>;
    async fn get_teacher(&self, id: TeacherId) -> Result<Option<Teacher>>;
    async fn get_course(&self, id: CourseId) -> Result<Option<ResolvedCourse>>;
    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Option<Enrollment>>;

    async fn list_students(&self) -> Result<Vec<Student>>;
    async fn list_teachers(&self) -> Result<Vec<Teacher>>;
    async fn list_courses(&self) -> Result<Vec<ResolvedCourse>>;
    async fn list_enrollments(&self) -> Result<Vec<Enrollment>>;

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>>;
    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>>;
    async fn find_course_by_name(&self, name: &str) -> Result<Option<Course>>;

    /// Active enrollments of a student with course and teacher resolved.
    async fn active_enrollments_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ResolvedEnrollment>>;
    async fn enrollments_for_course(&self, course_id: CourseId) -> Result<Vec<Enrollment>>;
    async fn count_courses_for_teacher(&self, teacher_id: TeacherId) -> Result<usize>;

    async fn insert_student(&self, student: NewStudent, now: DateTime<Utc>) -> Result<Student>;
    async fn update_student(&self, student: Student) -> Result<()>;
    /// Removes the student and every enrollment it owns.
    async fn delete_student(&self, id: StudentId) -> Result<()>;

    async fn insert_teacher(&self, teacher: NewTeacher) -> Result<Teacher>;
    async fn update_teacher(&self, teacher: Teacher) -> Result<()>;
    /// Removes the teacher and its courses. Fails if any of them has active enrollments.
    async fn delete_teacher(&self, id: TeacherId) -> Result<()>;

    async fn insert_course(&self, course: NewCourse, credits: u32) -> Result<Course>;
    async fn update_course(&self, course: Course) -> Result<()>;
    /// Removes the course and its cancelled enrollment history.
    async fn delete_course(&self, id: CourseId) -> Result<()>;

    async fn insert_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        now: DateTime<Utc>,
    ) -> Result<Enrollment>;
    async fn update_enrollment(&self, enrollment: Enrollment) -> Result<()>;
}

/// Constraint names reported in `StoreError::UniqueViolation` / `StoreError::Restricted`.
pub mod constraints {
    pub const ACTIVE_ENROLLMENT: &str = "enrollment_active_student_course";
    pub const COURSE_NAME: &str = "course_name";
    pub const STUDENT_EMAIL: &str = "student_email";
    pub const TEACHER_EMAIL: &str = "teacher_email";
    pub const COURSE_ACTIVE_ENROLLMENTS: &str = "course_active_enrollments";
}
