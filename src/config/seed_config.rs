use crate::config::toml_config::substitute_env_vars;
use crate::utils::error::{GestorError, Result};
use crate::utils::validation::{validate_email, validate_name, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// 初始資料檔：教師、學生、課程與選課
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub teachers: Vec<SeedPerson>,
    #[serde(default)]
    pub students: Vec<SeedPerson>,
    #[serde(default)]
    pub courses: Vec<SeedCourse>,
    #[serde(default)]
    pub enrollments: Vec<SeedEnrollment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPerson {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCourse {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 授課教師的 email
    pub teacher: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedEnrollment {
    /// 學生 email
    pub student: String,
    /// 課程名稱
    pub course: String,
}

impl SeedCatalog {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GestorError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| GestorError::ConfigValidationError {
            field: "seed".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }
}

impl Validate for SeedCatalog {
    /// Structural checks only; business rules run when the seed is applied.
    fn validate(&self) -> Result<()> {
        for (index, person) in self.teachers.iter().enumerate() {
            validate_name(&format!("teachers[{}].name", index), &person.name)?;
            validate_email(&format!("teachers[{}].email", index), &person.email)?;
        }
        for (index, person) in self.students.iter().enumerate() {
            validate_name(&format!("students[{}].name", index), &person.name)?;
            validate_email(&format!("students[{}].email", index), &person.email)?;
        }

        let teacher_emails: HashSet<String> = self
            .teachers
            .iter()
            .map(|t| t.email.trim().to_lowercase())
            .collect();
        for (index, course) in self.courses.iter().enumerate() {
            validate_name(&format!("courses[{}].name", index), &course.name)?;
            if !teacher_emails.contains(&course.teacher.trim().to_lowercase()) {
                return Err(GestorError::ConfigValidationError {
                    field: format!("courses[{}].teacher", index),
                    message: format!("'{}' is not listed under [[teachers]]", course.teacher),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"
[[teachers]]
name = "Prof. Ruiz"
email = "ruiz@uni.edu"

[[students]]
name = "Ana"
email = "ana@uni.edu"

[[courses]]
name = "Álgebra"
description = "Álgebra lineal"
teacher = "ruiz@uni.edu"

[[enrollments]]
student = "ana@uni.edu"
course = "Álgebra"
"#;

    #[test]
    fn test_parse_seed() {
        let seed = SeedCatalog::from_toml_str(SEED).unwrap();
        assert_eq!(seed.teachers.len(), 1);
        assert_eq!(seed.students.len(), 1);
        assert_eq!(seed.courses[0].teacher, "ruiz@uni.edu");
        assert_eq!(seed.enrollments[0].course, "Álgebra");
        assert!(seed.validate().is_ok());
    }

    #[test]
    fn test_empty_seed_is_valid() {
        let seed = SeedCatalog::from_toml_str("").unwrap();
        assert!(seed.courses.is_empty());
        assert!(seed.validate().is_ok());
    }

    #[test]
    fn test_course_with_unknown_teacher() {
        let seed = SeedCatalog::from_toml_str(
            r#"
[[courses]]
name = "Física"
teacher = "nadie@uni.edu"
"#,
        )
        .unwrap();
        assert!(matches!(
            seed.validate(),
            Err(GestorError::ConfigValidationError { .. })
        ));
    }
}
