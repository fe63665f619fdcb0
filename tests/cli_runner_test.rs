#![cfg(feature = "cli")]

use gestor_materias::config::cli::{Command, CourseCommand, StudentCommand, StudentCourseArgs};
use gestor_materias::{AppConfig, CommandRunner, LocalStorage, RejectionReason};
use std::path::Path;
use tempfile::TempDir;
use tokio_test::assert_err;

const SEED: &str = r#"
[[teachers]]
name = "Prof. Ruiz"
email = "ruiz@uni.edu"

[[teachers]]
name = "Prof. Paz"
email = "paz@uni.edu"

[[students]]
name = "Ana"
email = "ana@alumnos.uni.edu"

[[students]]
name = "Beto"
email = "beto@alumnos.uni.edu"

[[courses]]
name = "Álgebra"
teacher = "ruiz@uni.edu"

[[courses]]
name = "Geometría"
teacher = "ruiz@uni.edu"

[[courses]]
name = "Física"
teacher = "paz@uni.edu"

[[enrollments]]
student = "ana@alumnos.uni.edu"
course = "Álgebra"
"#;

fn runner(dir: &Path) -> CommandRunner<LocalStorage, AppConfig> {
    let mut config = AppConfig::default();
    config.storage.data_dir = dir.to_string_lossy().to_string();
    CommandRunner::new(LocalStorage::new(dir), config)
}

fn pair(student: u64, course: u64) -> StudentCourseArgs {
    StudentCourseArgs { student, course }
}

async fn seeded() -> TempDir {
    let dir = TempDir::new().unwrap();
    let seed_path = dir.path().join("seed.toml");
    std::fs::write(&seed_path, SEED).unwrap();

    let output = runner(dir.path())
        .run(Command::Seed {
            file: seed_path.to_string_lossy().to_string(),
        })
        .await
        .unwrap();
    let summary: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(summary["courses_created"], 3);
    assert_eq!(summary["enrollments_created"], 1);
    dir
}

#[tokio::test]
async fn test_state_survives_between_invocations() {
    let dir = seeded().await;
    assert!(dir.path().join("state.json").exists());

    // Ana already has Álgebra with Prof. Ruiz
    let err = assert_err!(runner(dir.path()).run(Command::Enroll(pair(1, 2))).await);
    assert_eq!(err.rejection(), Some(RejectionReason::TeacherConflict));

    let output = runner(dir.path())
        .run(Command::Enroll(pair(1, 3)))
        .await
        .unwrap();
    assert_eq!(output, "Enrollment 2 created");

    let listed = runner(dir.path())
        .run(Command::Enrollments { student: 1 })
        .await
        .unwrap();
    let listed: serde_json::Value = serde_json::from_str(&listed).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_seed_twice_skips_existing_entries() {
    let dir = seeded().await;
    let seed_path = dir.path().join("seed.toml");

    let output = runner(dir.path())
        .run(Command::Seed {
            file: seed_path.to_string_lossy().to_string(),
        })
        .await
        .unwrap();
    let summary: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(summary["teachers_created"], 0);
    assert_eq!(summary["courses_created"], 0);
    assert_eq!(summary["enrollments_created"], 0);
    assert_eq!(summary["skipped"], 8);
}

#[tokio::test]
async fn test_read_only_commands_leave_state_untouched() {
    let dir = seeded().await;
    let state_path = dir.path().join("state.json");
    let before = std::fs::read(&state_path).unwrap();

    let output = runner(dir.path())
        .run(Command::Check(pair(2, 1)))
        .await
        .unwrap();
    assert!(output.contains("may enroll"));

    let available = runner(dir.path())
        .run(Command::Available { student: 2 })
        .await
        .unwrap();
    let available: serde_json::Value = serde_json::from_str(&available).unwrap();
    assert_eq!(available.as_array().unwrap().len(), 3);

    runner(dir.path())
        .run(Command::Course(CourseCommand::List))
        .await
        .unwrap();

    assert_eq!(std::fs::read(&state_path).unwrap(), before);
}

#[tokio::test]
async fn test_report_written_through_storage() {
    let dir = seeded().await;
    runner(dir.path())
        .run(Command::Enroll(pair(2, 3)))
        .await
        .unwrap();
    runner(dir.path())
        .run(Command::Unenroll(pair(2, 3)))
        .await
        .unwrap();

    let output = runner(dir.path())
        .run(Command::Report {
            output: Some("reports/enrollments.csv".to_string()),
        })
        .await
        .unwrap();
    assert!(output.contains("reports/enrollments.csv"));

    let csv = std::fs::read_to_string(dir.path().join("reports/enrollments.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("enrollment_id,student_id"));
    assert!(lines[2].contains("cancelled"));
}

#[tokio::test]
async fn test_deactivated_student_cannot_enroll() {
    let dir = seeded().await;
    runner(dir.path())
        .run(Command::Student(StudentCommand::Deactivate { id: 2 }))
        .await
        .unwrap();

    let err = assert_err!(runner(dir.path()).run(Command::Enroll(pair(2, 1))).await);
    assert_eq!(err.rejection(), Some(RejectionReason::StudentNotFound));
}
