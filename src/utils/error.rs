use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 業務規則拒絕原因，每一種都對應明確的使用者訊息
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("Student does not exist or is not active")]
    StudentNotFound,

    #[error("Course does not exist")]
    CourseNotFound,

    #[error("Teacher does not exist")]
    TeacherNotFound,

    #[error("Enrollment does not exist or is already cancelled")]
    EnrollmentNotFound,

    #[error("Student already holds the maximum number of active enrollments")]
    EnrollmentCapExceeded,

    #[error("Student is already enrolled in this course")]
    DuplicateEnrollment,

    #[error("Student is already enrolled in another course taught by the same teacher")]
    TeacherConflict,

    #[error("Teacher already teaches the maximum number of courses")]
    TeacherCapacityExceeded,

    #[error("A course with this name already exists")]
    DuplicateCourseName,

    #[error("This email address is already registered")]
    DuplicateEmail,

    #[error("Course still has active enrollments")]
    CourseHasActiveEnrollments,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::StudentNotFound => "STUDENT_NOT_FOUND",
            Self::CourseNotFound => "COURSE_NOT_FOUND",
            Self::TeacherNotFound => "TEACHER_NOT_FOUND",
            Self::EnrollmentNotFound => "ENROLLMENT_NOT_FOUND",
            Self::EnrollmentCapExceeded => "ENROLLMENT_CAP_EXCEEDED",
            Self::DuplicateEnrollment => "DUPLICATE_ENROLLMENT",
            Self::TeacherConflict => "TEACHER_CONFLICT",
            Self::TeacherCapacityExceeded => "TEACHER_CAPACITY_EXCEEDED",
            Self::DuplicateCourseName => "DUPLICATE_COURSE_NAME",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::CourseHasActiveEnrollments => "COURSE_HAS_ACTIVE_ENROLLMENTS",
        }
    }

    /// 對應 HTTP 狀態碼，供 API 層使用
    pub fn http_status(&self) -> u16 {
        match self {
            Self::StudentNotFound
            | Self::CourseNotFound
            | Self::TeacherNotFound
            | Self::EnrollmentNotFound => 404,
            Self::DuplicateEnrollment
            | Self::TeacherConflict
            | Self::DuplicateCourseName
            | Self::DuplicateEmail
            | Self::CourseHasActiveEnrollments => 409,
            Self::EnrollmentCapExceeded | Self::TeacherCapacityExceeded => 422,
        }
    }
}

/// Errors raised by a `CatalogRepository` implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: &'static str },

    #[error("Delete restricted by {constraint}")]
    Restricted { constraint: &'static str },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Missing required relation {relation} for {id}")]
    MissingRelation { relation: &'static str, id: String },

    #[error("Store data is corrupted: {reason}")]
    Corrupted { reason: String },
}

#[derive(Error, Debug)]
pub enum GestorError {
    #[error("Request rejected: {0}")]
    Rejected(#[from] RejectionReason),

    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error on '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BusinessRule,
    Input,
    Configuration,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl GestorError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// 若為業務規則拒絕，取得原因
    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Self::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Rejected(_) => ErrorCategory::BusinessRule,
            Self::ValidationError { .. } => ErrorCategory::Input,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::StoreError(_)
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::CsvError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Rejected(_) | Self::ValidationError { .. } => ErrorSeverity::Medium,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::High,
            Self::StoreError(StoreError::UniqueViolation { .. })
            | Self::StoreError(StoreError::Restricted { .. }) => ErrorSeverity::Medium,
            Self::StoreError(_)
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::CsvError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Rejected(reason) => format!("{} ({})", reason, reason.code()),
            Self::ValidationError { field, message } => {
                format!("Invalid value for {}: {}", field, message)
            }
            Self::StoreError(_) | Self::SerializationError(_) => {
                "The enrollment data could not be read or written".to_string()
            }
            Self::IoError(e) => format!("File access failed: {}", e),
            Self::CsvError(_) => "The report could not be generated".to_string(),
            Self::ConfigValidationError { field, message } => {
                format!("Configuration problem in {}: {}", field, message)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration problem in {}: {}", field, reason)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Rejected(RejectionReason::EnrollmentCapExceeded) => {
                "Cancel one of the active enrollments before enrolling in another course"
            }
            Self::Rejected(RejectionReason::TeacherConflict) => {
                "Pick a course from the available-courses listing"
            }
            Self::Rejected(RejectionReason::TeacherCapacityExceeded) => {
                "Assign the course to a teacher listed by 'teachers --with-capacity'"
            }
            Self::Rejected(RejectionReason::CourseHasActiveEnrollments) => {
                "Cancel the active enrollments of the course first"
            }
            Self::Rejected(_) => "Check the ids and names passed to the command",
            Self::ValidationError { .. } => "Correct the input value and try again",
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. } => "Review the TOML configuration file",
            Self::StoreError(_) | Self::SerializationError(_) => {
                "Restore the state file from a backup or remove it to start empty"
            }
            Self::IoError(_) => "Check that the data directory exists and is writable",
            Self::CsvError(_) => "Retry the report; check disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, GestorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(RejectionReason::StudentNotFound.http_status(), 404);
        assert_eq!(RejectionReason::EnrollmentNotFound.http_status(), 404);
        assert_eq!(RejectionReason::DuplicateEnrollment.http_status(), 409);
        assert_eq!(RejectionReason::TeacherConflict.http_status(), 409);
        assert_eq!(RejectionReason::EnrollmentCapExceeded.http_status(), 422);
    }

    #[test]
    fn test_rejection_is_recoverable_from_error() {
        let err: GestorError = RejectionReason::TeacherConflict.into();
        assert_eq!(err.rejection(), Some(RejectionReason::TeacherConflict));
        assert_eq!(err.category(), ErrorCategory::BusinessRule);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("TEACHER_CONFLICT"));
    }

    #[test]
    fn test_storage_errors_are_critical() {
        let err = GestorError::from(StoreError::Corrupted {
            reason: "dangling course".to_string(),
        });
        assert_eq!(err.rejection(), None);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_reason_serializes_as_snake_case() {
        let json = serde_json::to_string(&RejectionReason::DuplicateCourseName).unwrap();
        assert_eq!(json, "\"duplicate_course_name\"");
    }
}
