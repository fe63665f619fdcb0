use crate::adapters::memory::{InMemoryStore, Sequences, StoreState};
use crate::domain::model::{Course, Enrollment, Student, Teacher};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk JSON form of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub sequences: Sequences,
    pub students: Vec<Student>,
    pub teachers: Vec<Teacher>,
    pub courses: Vec<Course>,
    pub enrollments: Vec<Enrollment>,
}

impl Snapshot {
    pub fn from_state(state: StoreState, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at,
            sequences: state.sequences,
            students: state.students.into_values().collect(),
            teachers: state.teachers.into_values().collect(),
            courses: state.courses.into_values().collect(),
            enrollments: state.enrollments.into_values().collect(),
        }
    }

    pub fn into_state(self) -> StoreState {
        StoreState {
            sequences: self.sequences,
            students: self.students.into_iter().map(|s| (s.id, s)).collect(),
            teachers: self.teachers.into_iter().map(|t| (t.id, t)).collect(),
            courses: self.courses.into_iter().map(|c| (c.id, c)).collect(),
            enrollments: self.enrollments.into_iter().map(|e| (e.id, e)).collect(),
        }
    }
}

/// Loads the store from `path`, or returns an empty store when the file does not exist yet.
pub async fn load_store<S: Storage>(storage: &S, path: &str) -> Result<InMemoryStore> {
    if !storage.exists(path).await? {
        tracing::info!("No state file at '{}', starting with an empty catalog", path);
        return Ok(InMemoryStore::new());
    }

    let bytes = storage.read_file(path).await?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    tracing::debug!(
        "Loaded snapshot v{} saved at {} ({} students, {} courses, {} enrollments)",
        snapshot.version,
        snapshot.saved_at,
        snapshot.students.len(),
        snapshot.courses.len(),
        snapshot.enrollments.len()
    );
    InMemoryStore::from_state(snapshot.into_state())
}

pub async fn save_store<S: Storage>(storage: &S, path: &str, store: &InMemoryStore) -> Result<()> {
    let snapshot = Snapshot::from_state(store.state().await, Utc::now());
    let json = serde_json::to_vec_pretty(&snapshot)?;
    tracing::debug!("Writing snapshot ({} bytes) to '{}'", json.len(), path);
    storage.write_file(path, &json).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use crate::domain::model::{NewCourse, NewStudent, NewTeacher, COURSE_CREDITS};
    use crate::domain::ports::CatalogRepository;
    use crate::utils::error::{GestorError, StoreError};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gives_empty_store() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let store = load_store(&storage, "state.json").await.unwrap();
        assert!(store.list_students().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_saved_store_keeps_sequences() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let store = InMemoryStore::new();
        let teacher = store
            .insert_teacher(NewTeacher {
                name: "Prof. Díaz".to_string(),
                email: "diaz@uni.edu".to_string(),
            })
            .await
            .unwrap();
        let course = store
            .insert_course(
                NewCourse {
                    name: "Química".to_string(),
                    description: String::new(),
                    teacher_id: teacher.id,
                },
                COURSE_CREDITS,
            )
            .await
            .unwrap();
        store.delete_course(course.id).await.unwrap();
        save_store(&storage, "state.json", &store).await.unwrap();

        let reloaded = load_store(&storage, "state.json").await.unwrap();
        let student = reloaded
            .insert_student(
                NewStudent {
                    name: "Luis".to_string(),
                    email: "luis@uni.edu".to_string(),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(student.id.0, 1);

        // deleted ids are never handed out again
        let next = reloaded
            .insert_course(
                NewCourse {
                    name: "Química II".to_string(),
                    description: String::new(),
                    teacher_id: teacher.id,
                },
                COURSE_CREDITS,
            )
            .await
            .unwrap();
        assert_eq!(next.id.0, 2);
    }

    #[tokio::test]
    async fn test_corrupted_snapshot_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let json = serde_json::json!({
            "version": 1,
            "saved_at": "2025-04-23T23:34:27Z",
            "sequences": {"student": 0, "teacher": 0, "course": 1, "enrollment": 0},
            "students": [],
            "teachers": [],
            "courses": [{"id": 1, "name": "Física", "credits": 3, "teacher_id": 4}],
            "enrollments": []
        });
        storage
            .write_file("state.json", json.to_string().as_bytes())
            .await
            .unwrap();

        let err = load_store(&storage, "state.json").await.unwrap_err();
        assert!(matches!(
            err,
            GestorError::StoreError(StoreError::Corrupted { .. })
        ));
    }
}
