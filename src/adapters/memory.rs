use crate::domain::model::{
    Course, CourseId, Enrollment, EnrollmentId, EnrollmentStatus, NewCourse, NewStudent,
    NewTeacher, ResolvedCourse, ResolvedEnrollment, Student, StudentId, Teacher, TeacherId,
};
use crate::domain::ports::{constraints, CatalogRepository};
use crate::utils::error::{Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Last id handed out per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
    pub student: u64,
    pub teacher: u64,
    pub course: u64,
    pub enrollment: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub(crate) sequences: Sequences,
    pub(crate) students: BTreeMap<StudentId, Student>,
    pub(crate) teachers: BTreeMap<TeacherId, Teacher>,
    pub(crate) courses: BTreeMap<CourseId, Course>,
    pub(crate) enrollments: BTreeMap<EnrollmentId, Enrollment>,
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn first_duplicate<'a>(mut values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = std::collections::HashSet::new();
    values.find(|v| !seen.insert(v.trim().to_lowercase()))
}

impl StoreState {
    /// Checks referential integrity of loaded data and the store's unique
    /// constraints: emails, course names, one active enrollment per pair.
    /// Per-teacher course limits belong to the policy and are not checked here.
    pub fn verify(&self) -> std::result::Result<(), StoreError> {
        let duplicates = [
            (
                first_duplicate(self.students.values().map(|s| s.email.as_str())),
                "student email",
            ),
            (
                first_duplicate(self.teachers.values().map(|t| t.email.as_str())),
                "teacher email",
            ),
            (
                first_duplicate(self.courses.values().map(|c| c.name.as_str())),
                "course name",
            ),
        ];
        for (duplicate, what) in duplicates {
            if let Some(value) = duplicate {
                return Err(StoreError::Corrupted {
                    reason: format!("duplicate {} '{}'", what, value),
                });
            }
        }

        for course in self.courses.values() {
            if !self.teachers.contains_key(&course.teacher_id) {
                return Err(StoreError::Corrupted {
                    reason: format!(
                        "course {} references missing teacher {}",
                        course.id, course.teacher_id
                    ),
                });
            }
        }

        let mut active_pairs = std::collections::HashSet::new();
        for enrollment in self.enrollments.values() {
            if !self.students.contains_key(&enrollment.student_id) {
                return Err(StoreError::Corrupted {
                    reason: format!(
                        "enrollment {} references missing student {}",
                        enrollment.id, enrollment.student_id
                    ),
                });
            }
            if !self.courses.contains_key(&enrollment.course_id) {
                return Err(StoreError::Corrupted {
                    reason: format!(
                        "enrollment {} references missing course {}",
                        enrollment.id, enrollment.course_id
                    ),
                });
            }
            if enrollment.is_active()
                && !active_pairs.insert((enrollment.student_id, enrollment.course_id))
            {
                return Err(StoreError::Corrupted {
                    reason: format!(
                        "student {} holds two active enrollments in course {}",
                        enrollment.student_id, enrollment.course_id
                    ),
                });
            }
        }

        let max_ids = [
            (self.students.keys().last().map(|id| id.0), self.sequences.student, "student"),
            (self.teachers.keys().last().map(|id| id.0), self.sequences.teacher, "teacher"),
            (self.courses.keys().last().map(|id| id.0), self.sequences.course, "course"),
            (
                self.enrollments.keys().last().map(|id| id.0),
                self.sequences.enrollment,
                "enrollment",
            ),
        ];
        for (max_id, sequence, entity) in max_ids {
            if max_id.unwrap_or(0) > sequence {
                return Err(StoreError::Corrupted {
                    reason: format!("{} sequence {} is behind stored ids", entity, sequence),
                });
            }
        }

        Ok(())
    }

    fn teacher_of(&self, course: &Course) -> std::result::Result<Teacher, StoreError> {
        self.teachers
            .get(&course.teacher_id)
            .cloned()
            .ok_or_else(|| StoreError::MissingRelation {
                relation: "teacher",
                id: course.id.to_string(),
            })
    }

    fn resolve_course(&self, course: &Course) -> std::result::Result<ResolvedCourse, StoreError> {
        Ok(ResolvedCourse {
            course: course.clone(),
            teacher: self.teacher_of(course)?,
        })
    }

    fn course_has_active_enrollments(&self, course_id: CourseId) -> bool {
        self.enrollments
            .values()
            .any(|e| e.course_id == course_id && e.is_active())
    }

    fn email_taken_by_student(&self, email: &str, except: Option<StudentId>) -> bool {
        self.students
            .values()
            .any(|s| Some(s.id) != except && same_text(&s.email, email))
    }

    fn email_taken_by_teacher(&self, email: &str, except: Option<TeacherId>) -> bool {
        self.teachers
            .values()
            .any(|t| Some(t.id) != except && same_text(&t.email, email))
    }

    fn course_name_taken(&self, name: &str, except: Option<CourseId>) -> bool {
        self.courses
            .values()
            .any(|c| Some(c.id) != except && same_text(&c.name, name))
    }

    fn remove_course_cascade(&mut self, id: CourseId) {
        self.enrollments.retain(|_, e| e.course_id != id);
        self.courses.remove(&id);
    }
}

/// In-process `CatalogRepository`. Every call takes the state lock once, so
/// each operation is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Result<Self> {
        state.verify()?;
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Copy of the current state, used for snapshots.
    pub async fn state(&self) -> StoreState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn get_student(&self, id: StudentId) -> Result<Option<Student>> {
        Ok(self.state.read().await.students.get(&id).cloned())
    }

    async fn get_teacher(&self, id: TeacherId) -> Result<Option<Teacher>> {
        Ok(self.state.read().await.teachers.get(&id).cloned())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<ResolvedCourse>> {
        let state = self.state.read().await;
        match state.courses.get(&id) {
            Some(course) => Ok(Some(state.resolve_course(course)?)),
            None => Ok(None),
        }
    }

    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Option<Enrollment>> {
        Ok(self.state.read().await.enrollments.get(&id).cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        Ok(self.state.read().await.students.values().cloned().collect())
    }

    async fn list_teachers(&self) -> Result<Vec<Teacher>> {
        Ok(self.state.read().await.teachers.values().cloned().collect())
    }

    async fn list_courses(&self) -> Result<Vec<ResolvedCourse>> {
        let state = self.state.read().await;
        let courses = state
            .courses
            .values()
            .map(|c| state.resolve_course(c))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(courses)
    }

    async fn list_enrollments(&self) -> Result<Vec<Enrollment>> {
        Ok(self.state.read().await.enrollments.values().cloned().collect())
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>> {
        let state = self.state.read().await;
        Ok(state
            .students
            .values()
            .find(|s| same_text(&s.email, email))
            .cloned())
    }

    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>> {
        let state = self.state.read().await;
        Ok(state
            .teachers
            .values()
            .find(|t| same_text(&t.email, email))
            .cloned())
    }

    async fn find_course_by_name(&self, name: &str) -> Result<Option<Course>> {
        let state = self.state.read().await;
        Ok(state
            .courses
            .values()
            .find(|c| same_text(&c.name, name))
            .cloned())
    }

    async fn active_enrollments_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<ResolvedEnrollment>> {
        let state = self.state.read().await;
        let mut resolved = Vec::new();
        for enrollment in state
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id && e.is_active())
        {
            let course = state.courses.get(&enrollment.course_id).ok_or_else(|| {
                StoreError::MissingRelation {
                    relation: "course",
                    id: enrollment.id.to_string(),
                }
            })?;
            resolved.push(ResolvedEnrollment {
                enrollment: enrollment.clone(),
                course: course.clone(),
                teacher: state.teacher_of(course)?,
            });
        }
        Ok(resolved)
    }

    async fn enrollments_for_course(&self, course_id: CourseId) -> Result<Vec<Enrollment>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn count_courses_for_teacher(&self, teacher_id: TeacherId) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .courses
            .values()
            .filter(|c| c.teacher_id == teacher_id)
            .count())
    }

    async fn insert_student(&self, student: NewStudent, now: DateTime<Utc>) -> Result<Student> {
        let mut state = self.state.write().await;
        if state.email_taken_by_student(&student.email, None) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::STUDENT_EMAIL,
            }
            .into());
        }

        state.sequences.student += 1;
        let record = Student {
            id: StudentId(state.sequences.student),
            name: student.name,
            email: student.email,
            active: true,
            registered_at: now,
        };
        state.students.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_student(&self, student: Student) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.students.contains_key(&student.id) {
            return Err(StoreError::NotFound {
                entity: "student",
                id: student.id.to_string(),
            }
            .into());
        }
        if state.email_taken_by_student(&student.email, Some(student.id)) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::STUDENT_EMAIL,
            }
            .into());
        }
        state.students.insert(student.id, student);
        Ok(())
    }

    async fn delete_student(&self, id: StudentId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.students.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                entity: "student",
                id: id.to_string(),
            }
            .into());
        }
        state.enrollments.retain(|_, e| e.student_id != id);
        Ok(())
    }

    async fn insert_teacher(&self, teacher: NewTeacher) -> Result<Teacher> {
        let mut state = self.state.write().await;
        if state.email_taken_by_teacher(&teacher.email, None) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::TEACHER_EMAIL,
            }
            .into());
        }

        state.sequences.teacher += 1;
        let record = Teacher {
            id: TeacherId(state.sequences.teacher),
            name: teacher.name,
            email: teacher.email,
        };
        state.teachers.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_teacher(&self, teacher: Teacher) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.teachers.contains_key(&teacher.id) {
            return Err(StoreError::NotFound {
                entity: "teacher",
                id: teacher.id.to_string(),
            }
            .into());
        }
        if state.email_taken_by_teacher(&teacher.email, Some(teacher.id)) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::TEACHER_EMAIL,
            }
            .into());
        }
        state.teachers.insert(teacher.id, teacher);
        Ok(())
    }

    async fn delete_teacher(&self, id: TeacherId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.teachers.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: "teacher",
                id: id.to_string(),
            }
            .into());
        }

        let owned: Vec<CourseId> = state
            .courses
            .values()
            .filter(|c| c.teacher_id == id)
            .map(|c| c.id)
            .collect();
        if owned.iter().any(|c| state.course_has_active_enrollments(*c)) {
            return Err(StoreError::Restricted {
                constraint: constraints::COURSE_ACTIVE_ENROLLMENTS,
            }
            .into());
        }

        for course_id in owned {
            state.remove_course_cascade(course_id);
        }
        state.teachers.remove(&id);
        Ok(())
    }

    async fn insert_course(&self, course: NewCourse, credits: u32) -> Result<Course> {
        let mut state = self.state.write().await;
        if !state.teachers.contains_key(&course.teacher_id) {
            return Err(StoreError::MissingRelation {
                relation: "teacher",
                id: course.teacher_id.to_string(),
            }
            .into());
        }
        if state.course_name_taken(&course.name, None) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::COURSE_NAME,
            }
            .into());
        }

        state.sequences.course += 1;
        let record = Course {
            id: CourseId(state.sequences.course),
            name: course.name,
            description: course.description,
            credits,
            teacher_id: course.teacher_id,
        };
        state.courses.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_course(&self, course: Course) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.courses.contains_key(&course.id) {
            return Err(StoreError::NotFound {
                entity: "course",
                id: course.id.to_string(),
            }
            .into());
        }
        if !state.teachers.contains_key(&course.teacher_id) {
            return Err(StoreError::MissingRelation {
                relation: "teacher",
                id: course.teacher_id.to_string(),
            }
            .into());
        }
        if state.course_name_taken(&course.name, Some(course.id)) {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::COURSE_NAME,
            }
            .into());
        }
        state.courses.insert(course.id, course);
        Ok(())
    }

    async fn delete_course(&self, id: CourseId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.courses.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: "course",
                id: id.to_string(),
            }
            .into());
        }
        if state.course_has_active_enrollments(id) {
            return Err(StoreError::Restricted {
                constraint: constraints::COURSE_ACTIVE_ENROLLMENTS,
            }
            .into());
        }
        state.remove_course_cascade(id);
        Ok(())
    }

    async fn insert_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
        now: DateTime<Utc>,
    ) -> Result<Enrollment> {
        let mut state = self.state.write().await;
        if !state.students.contains_key(&student_id) {
            return Err(StoreError::MissingRelation {
                relation: "student",
                id: student_id.to_string(),
            }
            .into());
        }
        if !state.courses.contains_key(&course_id) {
            return Err(StoreError::MissingRelation {
                relation: "course",
                id: course_id.to_string(),
            }
            .into());
        }
        if state
            .enrollments
            .values()
            .any(|e| e.student_id == student_id && e.course_id == course_id && e.is_active())
        {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::ACTIVE_ENROLLMENT,
            }
            .into());
        }

        state.sequences.enrollment += 1;
        let record = Enrollment {
            id: EnrollmentId(state.sequences.enrollment),
            student_id,
            course_id,
            enrolled_at: now,
            status: EnrollmentStatus::Active,
            cancelled_at: None,
        };
        state.enrollments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_enrollment(&self, enrollment: Enrollment) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.enrollments.contains_key(&enrollment.id) {
            return Err(StoreError::NotFound {
                entity: "enrollment",
                id: enrollment.id.to_string(),
            }
            .into());
        }
        if enrollment.is_active()
            && state.enrollments.values().any(|e| {
                e.id != enrollment.id
                    && e.student_id == enrollment.student_id
                    && e.course_id == enrollment.course_id
                    && e.is_active()
            })
        {
            return Err(StoreError::UniqueViolation {
                constraint: constraints::ACTIVE_ENROLLMENT,
            }
            .into());
        }
        state.enrollments.insert(enrollment.id, enrollment);
        Ok(())
    }
}
