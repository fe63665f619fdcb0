use crate::adapters::memory::InMemoryStore;
use crate::adapters::snapshot::{load_store, save_store};
use crate::app::services::Services;
use crate::config::cli::{Command, CourseCommand, StudentCommand, TeacherCommand};
use crate::config::SeedCatalog;
use crate::core::report::enrollment_report_csv;
use crate::domain::model::{CourseId, CourseUpdate, EnrollmentId, NewCourse, StudentId, TeacherId};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;

/// Runs one CLI command: load the state snapshot, execute, save when the
/// command changed something. Returns the text to print.
pub struct CommandRunner<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

impl<S: Storage, C: ConfigProvider> CommandRunner<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub async fn run(&self, command: Command) -> Result<String> {
        let state_file = self.config.state_file();
        tracing::debug!(
            "Loading state '{}' from '{}'",
            state_file,
            self.config.data_dir()
        );
        let store = Arc::new(load_store(&self.storage, state_file).await?);
        let services = Services::new(store.clone(), self.config.policy());

        let read_only = command.is_read_only();
        let output = self.execute(&services, command).await?;

        if !read_only {
            save_store(&self.storage, state_file, &store).await?;
            tracing::debug!("State saved to '{}'", state_file);
        }
        Ok(output)
    }

    async fn execute(&self, services: &Services<InMemoryStore>, command: Command) -> Result<String> {
        let catalog = &services.catalog;
        let enrollments = &services.enrollments;

        match command {
            Command::Seed { file } => {
                let seed = SeedCatalog::from_file(&file)?;
                let summary = services.apply_seed(&seed).await?;
                pretty(&summary)
            }

            Command::Student(StudentCommand::Add(person)) => {
                let student = catalog.register_student(&person.name, &person.email).await?;
                Ok(format!("Student {} registered", student.id))
            }
            Command::Student(StudentCommand::Update { id, person }) => {
                let student = catalog
                    .update_student(StudentId(id), &person.name, &person.email)
                    .await?;
                pretty(&student)
            }
            Command::Student(StudentCommand::Activate { id }) => {
                catalog.set_student_active(StudentId(id), true).await?;
                Ok(format!("Student {} activated", id))
            }
            Command::Student(StudentCommand::Deactivate { id }) => {
                catalog.set_student_active(StudentId(id), false).await?;
                Ok(format!("Student {} deactivated", id))
            }
            Command::Student(StudentCommand::Remove { id }) => {
                catalog.remove_student(StudentId(id)).await?;
                Ok(format!("Student {} removed", id))
            }
            Command::Student(StudentCommand::List) => pretty(&catalog.students().await?),

            Command::Teacher(TeacherCommand::Add(person)) => {
                let teacher = catalog.register_teacher(&person.name, &person.email).await?;
                Ok(format!("Teacher {} registered", teacher.id))
            }
            Command::Teacher(TeacherCommand::Update { id, person }) => {
                let teacher = catalog
                    .update_teacher(TeacherId(id), &person.name, &person.email)
                    .await?;
                pretty(&teacher)
            }
            Command::Teacher(TeacherCommand::Remove { id }) => {
                catalog.remove_teacher(TeacherId(id)).await?;
                Ok(format!("Teacher {} removed", id))
            }
            Command::Teacher(TeacherCommand::List { with_capacity }) => {
                let teachers = if with_capacity {
                    catalog.teachers_with_capacity().await?
                } else {
                    catalog.teachers().await?
                };
                pretty(&teachers)
            }

            Command::Course(CourseCommand::Add {
                name,
                description,
                teacher,
            }) => {
                let course = catalog
                    .create_course(NewCourse {
                        name,
                        description,
                        teacher_id: TeacherId(teacher),
                    })
                    .await?;
                Ok(format!("Course {} created", course.id))
            }
            Command::Course(CourseCommand::Update {
                id,
                name,
                description,
                teacher,
            }) => {
                let course = catalog
                    .update_course(
                        CourseId(id),
                        CourseUpdate {
                            name,
                            description,
                            teacher_id: teacher.map(TeacherId),
                        },
                    )
                    .await?;
                pretty(&course)
            }
            Command::Course(CourseCommand::Remove { id }) => {
                catalog.remove_course(CourseId(id)).await?;
                Ok(format!("Course {} removed", id))
            }
            Command::Course(CourseCommand::List) => pretty(&catalog.course_summaries().await?),

            Command::Enroll(args) => {
                let id = enrollments
                    .enroll(StudentId(args.student), CourseId(args.course))
                    .await?;
                Ok(format!("Enrollment {} created", id))
            }
            Command::Check(args) => {
                enrollments
                    .check(StudentId(args.student), CourseId(args.course))
                    .await?;
                Ok(format!(
                    "Student {} may enroll in course {}",
                    args.student, args.course
                ))
            }
            Command::Cancel { enrollment } => {
                enrollments.cancel(EnrollmentId(enrollment)).await?;
                Ok(format!("Enrollment {} cancelled", enrollment))
            }
            Command::Unenroll(args) => {
                enrollments
                    .cancel_for_course(StudentId(args.student), CourseId(args.course))
                    .await?;
                Ok(format!(
                    "Student {} unenrolled from course {}",
                    args.student, args.course
                ))
            }
            Command::Available { student } => {
                pretty(&enrollments.list_available_courses(StudentId(student)).await?)
            }
            Command::Enrollments { student } => {
                pretty(&enrollments.student_enrollments(StudentId(student)).await?)
            }
            Command::Roster { course } => {
                pretty(&enrollments.course_roster(CourseId(course)).await?)
            }
            Command::Classmates(args) => pretty(
                &enrollments
                    .classmates(StudentId(args.student), CourseId(args.course))
                    .await?,
            ),
            Command::Report { output } => {
                let csv = enrollment_report_csv(services.repository().as_ref()).await?;
                match output {
                    Some(path) => {
                        self.storage.write_file(&path, csv.as_bytes()).await?;
                        Ok(format!("Report written to {}", path))
                    }
                    None => Ok(csv),
                }
            }
        }
    }
}
